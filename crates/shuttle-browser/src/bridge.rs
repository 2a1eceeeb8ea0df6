//! Isolated-context end of the injection bridge.
//!
//! The page script is injected at most once per document (`ScriptInjector`,
//! owned by the orchestrator's handler context rather than a global flag).
//! Each injected handler then owns a `PageBridge`: a window `message`
//! listener filtered by session uuid and source window, plus the pending
//! reply slots for the `ready` handshake and `getValue` requests. Replies
//! carry no request id; the single in-page adapter answers in order, so
//! pending `getValue` requests are completed FIFO.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::pin;
use std::rc::Rc;

use futures_util::FutureExt;
use futures_util::future::{Either, LocalBoxFuture, Shared, select};
use gloo_events::EventListener;
use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use tokio::sync::oneshot;
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, MessageEvent, Node, Window};

use shuttle_core::{
    BridgeMessage, Direction, InjectionSession, ReadyPayload, Result, SetValueOptions,
    SetValuePayload, SyncError, TextState,
};

use crate::dom::{self, js_err};

type LoadFuture = Shared<LocalBoxFuture<'static, std::result::Result<(), String>>>;

/// Injects the page script once and lets every caller await its load.
pub struct ScriptInjector {
    url: String,
    loaded: RefCell<Option<LoadFuture>>,
}

impl ScriptInjector {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            loaded: RefCell::new(None),
        }
    }

    pub fn is_injected(&self) -> bool {
        self.loaded.borrow().is_some()
    }

    /// Resolve once the page script has run.
    pub async fn ensure(&self) -> Result<()> {
        let load = {
            let mut slot = self.loaded.borrow_mut();
            match &*slot {
                Some(load) => load.clone(),
                None => {
                    tracing::debug!(url = %self.url, "injecting page script");
                    let load = inject(&self.url)?.boxed_local().shared();
                    *slot = Some(load.clone());
                    load
                }
            }
        };
        load.await.map_err(SyncError::BridgeUnavailable)
    }
}

fn inject(url: &str) -> Result<impl Future<Output = std::result::Result<(), String>> + 'static> {
    let document = dom::document()?;
    let script: HtmlScriptElement = document
        .create_element("script")
        .map_err(js_err)?
        .dyn_into()
        .map_err(|_| SyncError::Js("created element is not a script".into()))?;
    script.set_src(url);

    let (tx, rx) = oneshot::channel();
    let tx = Rc::new(RefCell::new(Some(tx)));
    let on_load = {
        let tx = tx.clone();
        EventListener::once(&script, "load", move |_| {
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(Ok(()));
            }
        })
    };
    let on_error = {
        let url = url.to_string();
        EventListener::once(&script, "error", move |_| {
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(Err(format!("failed to load {url}")));
            }
        })
    };

    let parent: Node = match document.head() {
        Some(head) => head.into(),
        None => document
            .document_element()
            .ok_or(SyncError::Js("document has no root element".into()))?
            .into(),
    };
    parent.append_child(&script).map_err(js_err)?;

    Ok(async move {
        let result = rx
            .await
            .unwrap_or_else(|_| Err("script load listener dropped".to_string()));
        drop((on_load, on_error));
        script.remove();
        result
    })
}

#[derive(Default)]
struct Inbox {
    ready: Option<oneshot::Sender<ReadyPayload>>,
    values: VecDeque<oneshot::Sender<TextState>>,
    on_change: Option<Rc<dyn Fn()>>,
}

fn deliver(inbox: &RefCell<Inbox>, message: BridgeMessage) {
    match message {
        BridgeMessage::Ready(ready) => match inbox.borrow_mut().ready.take() {
            Some(tx) => {
                let _ = tx.send(ready);
            }
            None => tracing::debug!(target: "shuttle::bridge", "unexpected ready"),
        },
        BridgeMessage::Value(state) => match inbox.borrow_mut().values.pop_front() {
            Some(tx) => {
                let _ = tx.send(state);
            }
            None => tracing::debug!(target: "shuttle::bridge", "value with no pending request"),
        },
        BridgeMessage::Change => {
            let on_change = inbox.borrow().on_change.clone();
            if let Some(cb) = on_change {
                cb();
            }
        }
        other => tracing::trace!(target: "shuttle::bridge", kind = ?other.kind(), "ignored"),
    }
}

/// One isolated handler's connection to its in-page adapter.
pub struct PageBridge {
    session: InjectionSession,
    window: Window,
    target_origin: String,
    inbox: Rc<RefCell<Inbox>>,
    unloaded: Cell<bool>,
    _listener: EventListener,
}

impl PageBridge {
    pub fn new(session: InjectionSession) -> Result<Self> {
        let window = dom::window()?;
        let origin = window.location().origin().map_err(js_err)?;
        // Opaque origins cannot be named as a postMessage target.
        let target_origin = if origin == "null" { "*".to_string() } else { origin };

        let inbox = Rc::new(RefCell::new(Inbox::default()));
        let filter = session.filter(Direction::ToIsolated);
        let listener = {
            let inbox = inbox.clone();
            let own = window.clone();
            EventListener::new(&window, "message", move |event| {
                let Some(event) = event.dyn_ref::<MessageEvent>() else {
                    return;
                };
                let data = event.data();
                let uuid = js_sys::Reflect::get(&data, &"uuid".into())
                    .ok()
                    .and_then(|u| u.as_string());
                if uuid.as_deref() != Some(filter.uuid()) {
                    return;
                }
                let same_source = event
                    .source()
                    .is_some_and(|source| js_sys::Object::is(&source, &own));
                let raw: serde_json::Value = match serde_wasm_bindgen::from_value(data) {
                    Ok(raw) => raw,
                    Err(e) => {
                        tracing::debug!(target: "shuttle::bridge", "undecodable message: {e}");
                        return;
                    }
                };
                if let Some(message) = filter.accept(&raw, same_source) {
                    deliver(&inbox, message);
                }
            })
        };

        Ok(Self {
            session,
            window,
            target_origin,
            inbox,
            unloaded: Cell::new(false),
            _listener: listener,
        })
    }

    pub fn session(&self) -> &InjectionSession {
        &self.session
    }

    fn post(&self, message: BridgeMessage) -> Result<()> {
        let kind = message.kind();
        let envelope = message.into_envelope(&self.session.uuid)?;
        let value = envelope
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| SyncError::Protocol(e.to_string()))?;
        tracing::trace!(target: "shuttle::bridge", uuid = %self.session.uuid, ?kind, "post");
        self.window
            .post_message(&value, &self.target_origin)
            .map_err(js_err)
    }

    /// Inject the page script if needed, send `initialize` and wait for `ready`.
    pub async fn connect(&self, injector: &ScriptInjector, timeout_ms: u32) -> Result<ReadyPayload> {
        injector.ensure().await?;

        let (tx, rx) = oneshot::channel();
        self.inbox.borrow_mut().ready = Some(tx);
        self.post(self.session.initialize())?;

        let timeout = pin!(TimeoutFuture::new(timeout_ms));
        match select(rx, timeout).await {
            Either::Left((Ok(ready), _)) => Ok(ready),
            Either::Left((Err(_), _)) => Err(SyncError::BridgeClosed),
            Either::Right(_) => {
                self.inbox.borrow_mut().ready = None;
                tracing::warn!(
                    target: "shuttle::bridge",
                    name = self.session.kind.name(),
                    timeout_ms,
                    "page script never answered initialize"
                );
                Err(SyncError::HandshakeTimeout {
                    name: self.session.kind.name().to_string(),
                    timeout_ms,
                })
            }
        }
    }

    pub async fn request_value(&self) -> Result<TextState> {
        let (tx, rx) = oneshot::channel();
        self.inbox.borrow_mut().values.push_back(tx);
        if let Err(e) = self.post(BridgeMessage::GetValue) {
            self.inbox.borrow_mut().values.pop_back();
            return Err(e);
        }
        rx.await.map_err(|_| SyncError::BridgeClosed)
    }

    /// Fire-and-forget write; resulting edits report themselves.
    pub fn set_value(&self, text: &str, opts: &SetValueOptions) -> Result<()> {
        self.post(BridgeMessage::SetValue(SetValuePayload {
            text: text.to_string(),
            line_number: opts.position.map(|p| p.line_number),
            column: opts.position.map(|p| p.column),
            selections: opts.selections.clone(),
        }))
    }

    pub fn on_change(&self, callback: Option<Rc<dyn Fn()>>) {
        self.inbox.borrow_mut().on_change = callback;
    }

    /// Tell the page side to release its hooks and fail pending requests.
    pub fn unload(&self) {
        if self.unloaded.replace(true) {
            return;
        }
        if let Err(e) = self.post(BridgeMessage::Unload) {
            tracing::warn!(target: "shuttle::bridge", "unload not delivered: {e}");
        }
        let mut inbox = self.inbox.borrow_mut();
        inbox.ready = None;
        inbox.values.clear();
        inbox.on_change = None;
    }
}
