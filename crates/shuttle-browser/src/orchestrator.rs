//! One sync session: pick an element, attach a handler, register with the
//! external process and relay edits both ways until either side stops.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::Element;

use shuttle_core::{
    ClickRequest, CloseInfo, RegisterPayload, Result, SetValueOptions, Settings, SyncError,
    TransportMessage, close_message, select_handler,
};

use crate::discovery;
use crate::dom::{self, DomElement};
use crate::handlers::{ChangeCallback, Handler, HandlerContext};
use crate::hints::{HintSlot, read_hint};
use crate::transport::SocketTransport;
use crate::{banner, click, logging};

struct Session {
    handler: Rc<Handler>,
    transport: Rc<SocketTransport>,
    on_change: ChangeCallback,
}

/// Owns the handler context and the single active session of this frame.
pub struct Orchestrator {
    ctx: HandlerContext,
    hints: HintSlot,
    session: RefCell<Option<Session>>,
}

impl Orchestrator {
    pub fn new(settings: Settings) -> Rc<Self> {
        Rc::new(Self {
            ctx: HandlerContext::new(Rc::new(settings)),
            hints: HintSlot::new(),
            session: RefCell::new(None),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.ctx.settings
    }

    pub fn is_running(&self) -> bool {
        self.session.borrow().is_some()
    }

    /// The requested or focused element if a handler claims it, else one
    /// picked through discovery.
    async fn choose(&self, target: Option<Element>) -> Result<Option<Element>> {
        let document = dom::document()?;
        if let Some(elem) = target.or_else(|| document.active_element()) {
            match select_handler(&DomElement(elem.clone())) {
                Ok(_) => return Ok(Some(elem)),
                Err(e) => tracing::debug!("{e}, falling back to discovery"),
            }
        }

        let found = discovery::candidates(&document);
        match found.as_slice() {
            [] => {
                tracing::info!("no editable element on this page");
                Ok(None)
            }
            [only] => Ok(Some(only.elem.clone())),
            many => read_hint(&self.hints, &document, many, &self.ctx.settings).await,
        }
    }

    /// Start a session on `target` (or the focused element). Resolves to
    /// false when nothing was chosen.
    pub async fn start(self: &Rc<Self>, target: Option<Element>) -> Result<bool> {
        self.stop();
        let Some(elem) = self.choose(target).await? else {
            return Ok(false);
        };

        let handler = Rc::new(Handler::make(elem, &self.ctx)?);
        let loaded = handler.load().await?;
        tracing::info!(handler = handler.name(), "attached");

        let (transport, mut inbound) = SocketTransport::connect(&self.ctx.settings)?;
        let transport = Rc::new(transport);
        let window = dom::window()?;
        let document = dom::document()?;
        transport.send(&TransportMessage::Register(RegisterPayload {
            state: loaded.state,
            url: window.location().href().unwrap_or_default(),
            title: document.title(),
            extension: loaded.extension,
            rect: loaded.rect,
        }))?;

        let on_change: ChangeCallback = {
            let handler = Rc::downgrade(&handler);
            let transport = Rc::downgrade(&transport);
            Rc::new(move || {
                let (Some(handler), Some(transport)) = (handler.upgrade(), transport.upgrade())
                else {
                    return;
                };
                spawn_local(async move {
                    let sent = match handler.get_value().await {
                        Ok(state) => transport.send(&TransportMessage::UpdateText(state)),
                        Err(e) => Err(e),
                    };
                    if let Err(e) = sent {
                        tracing::warn!("local change not forwarded: {e}");
                    }
                });
            })
        };
        handler.bind_change(on_change.clone());

        {
            let this = Rc::downgrade(self);
            let handler = Rc::downgrade(&handler);
            spawn_local(async move {
                while let Some(message) = inbound.recv().await {
                    match message {
                        TransportMessage::UpdateText(state) => {
                            let Some(handler) = handler.upgrade() else {
                                break;
                            };
                            let opts = SetValueOptions::from_state(&state);
                            if let Err(e) = handler.set_value(&state.text, &opts) {
                                tracing::warn!("remote edit not applied: {e}");
                            }
                        }
                        TransportMessage::Closed(info) => {
                            if let Some(this) = this.upgrade() {
                                this.closed(&info);
                            }
                            break;
                        }
                        TransportMessage::Keepalive => tracing::trace!("keepalive"),
                        TransportMessage::Register(_) => {
                            tracing::warn!("unexpected register from editor process")
                        }
                    }
                }
            });
        }

        *self.session.borrow_mut() = Some(Session {
            handler,
            transport,
            on_change,
        });
        Ok(true)
    }

    fn closed(&self, info: &CloseInfo) {
        if let Some(text) = close_message(info, &self.ctx.settings.server_url) {
            let shown = dom::document().and_then(|doc| banner::show(&doc, &text));
            if let Err(e) = shown {
                tracing::warn!("could not show banner: {e}");
            }
        }
        self.teardown();
    }

    fn teardown(&self) -> Option<Rc<SocketTransport>> {
        let session = self.session.borrow_mut().take()?;
        session.handler.unbind_change(&session.on_change);
        tracing::debug!(handler = session.handler.name(), "session ended");
        Some(session.transport)
    }

    /// End the current session, if any.
    pub fn stop(&self) {
        if let Some(transport) = self.teardown() {
            transport.close();
        }
    }

    pub fn click(&self, request: &ClickRequest) -> Result<bool> {
        click::simulate_click(&dom::document()?, request)
    }
}

fn to_js(e: SyncError) -> JsValue {
    JsError::new(&e.to_string()).into()
}

/// JS entry point for the content script.
#[wasm_bindgen]
pub struct ShuttleApp {
    inner: Rc<Orchestrator>,
}

#[wasm_bindgen]
impl ShuttleApp {
    /// Create from the stored settings JSON, or defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(settings_json: Option<String>) -> Result<ShuttleApp, JsError> {
        logging::init();
        let settings = match settings_json {
            Some(raw) => Settings::from_json(&raw)?,
            None => Settings::default(),
        };
        Ok(Self {
            inner: Orchestrator::new(settings),
        })
    }

    /// Start on the focused element; resolves to whether a session began.
    pub fn start(&self) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            inner
                .start(None)
                .await
                .map(JsValue::from_bool)
                .map_err(to_js)
        })
    }

    /// Start on a specific element.
    #[wasm_bindgen(js_name = startOn)]
    pub fn start_on(&self, elem: Element) -> js_sys::Promise {
        let inner = self.inner.clone();
        future_to_promise(async move {
            inner
                .start(Some(elem))
                .await
                .map(JsValue::from_bool)
                .map_err(to_js)
        })
    }

    pub fn stop(&self) {
        self.inner.stop();
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    /// Click the element best matching `{ selector?, innerText? }`.
    pub fn click(&self, request: JsValue) -> Result<bool, JsError> {
        let request: ClickRequest = serde_wasm_bindgen::from_value(request)
            .map_err(|e| JsError::new(&format!("invalid click request: {e}")))?;
        Ok(self.inner.click(&request)?)
    }
}
