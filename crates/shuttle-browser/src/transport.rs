//! WebSocket link to the external editor process.
//!
//! Frames are JSON `TransportMessage`s. Messages sent before the socket opens
//! are queued and flushed on `open`. A `keepalive` goes out every
//! `keepaliveIntervalMs` while the socket is open. Socket closure is turned
//! into an inbound `TransportMessage::Closed` so the orchestrator sees it in
//! the same stream as remote edits.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::EventListener;
use gloo_timers::callback::Interval;
use tokio::sync::mpsc;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

use shuttle_core::{CloseInfo, Result, Settings, TransportMessage};

use crate::dom::js_err;

struct Shared {
    socket: WebSocket,
    queue: RefCell<Vec<String>>,
    keepalive: RefCell<Option<Interval>>,
}

impl Shared {
    fn send_raw(&self, frame: String) -> Result<()> {
        match self.socket.ready_state() {
            WebSocket::CONNECTING => {
                self.queue.borrow_mut().push(frame);
                Ok(())
            }
            WebSocket::OPEN => self.socket.send_with_str(&frame).map_err(js_err),
            state => {
                tracing::debug!(state, "dropping frame on closed socket");
                Ok(())
            }
        }
    }
}

pub struct SocketTransport {
    shared: Rc<Shared>,
    _listeners: Vec<EventListener>,
}

impl SocketTransport {
    /// Open a socket to `settings.server_url`. Inbound messages, including a
    /// final `Closed`, arrive on the returned receiver.
    pub fn connect(
        settings: &Settings,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportMessage>)> {
        let socket = WebSocket::new(&settings.server_url).map_err(js_err)?;
        let shared = Rc::new(Shared {
            socket,
            queue: RefCell::default(),
            keepalive: RefCell::default(),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let keepalive_ms = settings.keepalive_interval_ms;

        let on_open = {
            let this = shared.clone();
            EventListener::new(&shared.socket, "open", move |_| {
                tracing::debug!("transport open");
                let queued: Vec<_> = this.queue.borrow_mut().drain(..).collect();
                for frame in queued {
                    if let Err(e) = this.socket.send_with_str(&frame) {
                        tracing::error!("flushing queued frame failed: {e:?}");
                    }
                }
                let beat = {
                    let shared = Rc::downgrade(&this);
                    Interval::new(keepalive_ms, move || {
                        let Some(shared) = shared.upgrade() else {
                            return;
                        };
                        if let Ok(frame) = TransportMessage::Keepalive.to_json() {
                            let _ = shared.send_raw(frame);
                        }
                    })
                };
                *this.keepalive.borrow_mut() = Some(beat);
            })
        };

        let on_message = {
            let tx = tx.clone();
            EventListener::new(&shared.socket, "message", move |event| {
                let Some(data) = event
                    .dyn_ref::<MessageEvent>()
                    .and_then(|e| e.data().as_string())
                else {
                    tracing::warn!("ignoring non-text frame");
                    return;
                };
                match TransportMessage::from_json(&data) {
                    Ok(message) => {
                        let _ = tx.send(message);
                    }
                    Err(e) => tracing::warn!("bad frame from editor process: {e}"),
                }
            })
        };

        let on_close = {
            let this = shared.clone();
            EventListener::new(&shared.socket, "close", move |event| {
                this.keepalive.borrow_mut().take();
                let info = event
                    .dyn_ref::<CloseEvent>()
                    .map(|e| CloseInfo::new(e.code(), e.reason(), e.was_clean()))
                    .unwrap_or_else(|| CloseInfo::new(1006, "", false));
                if info.was_clean {
                    tracing::info!(code = info.code, "transport closed");
                } else {
                    tracing::error!(code = info.code, reason = %info.reason, "transport closed abnormally");
                }
                let _ = tx.send(TransportMessage::Closed(info));
            })
        };

        Ok((
            Self {
                shared,
                _listeners: vec![on_open, on_message, on_close],
            },
            rx,
        ))
    }

    pub fn send(&self, message: &TransportMessage) -> Result<()> {
        self.shared.send_raw(message.to_json()?)
    }

    pub fn close(&self) {
        self.shared.keepalive.borrow_mut().take();
        if let Err(e) = self.shared.socket.close() {
            tracing::warn!("closing transport failed: {e:?}");
        }
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}
