//! Page-side end of the bridge.
//!
//! One window `message` listener serves every session. `initialize` attaches
//! an adapter under the session's uuid and answers `ready`; the remaining
//! page-bound messages are routed to that adapter. A failed attach is logged
//! and left unanswered, so the isolated side reports a handshake timeout.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use gloo_events::EventListener;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, MessageEvent, Node, ShadowRoot, Window};

use shuttle_core::{
    BridgeFilter, BridgeMessage, Direction, HandlerKind, InitializePayload, ReadyPayload, Result,
    SyncError,
};

use crate::adapters::Adapter;
use crate::js::{js_err, to_js};

type Sessions = Rc<RefCell<HashMap<String, Rc<Adapter>>>>;

/// Where replies go; cloned into every adapter callback.
#[derive(Clone)]
struct Outbox {
    window: Window,
    target_origin: String,
}

impl Outbox {
    fn post(&self, uuid: &str, message: BridgeMessage) -> Result<()> {
        let kind = message.kind();
        let value = to_js(&message.into_envelope(uuid)?)?;
        tracing::trace!(target: "shuttle::page", %uuid, ?kind, "post");
        self.window
            .post_message(&value, &self.target_origin)
            .map_err(js_err)
    }

    fn post_or_log(&self, uuid: &str, message: BridgeMessage) {
        if let Err(e) = self.post(uuid, message) {
            tracing::warn!(target: "shuttle::page", %uuid, "reply failed: {e}");
        }
    }
}

/// First match of `selector` in `scope` sitting exactly as deep below the
/// scope as the selector's child chain is long. A relative `a > b` path
/// would otherwise also match look-alikes nested further down.
fn query_anchored(scope: &Node, selector: &str) -> Option<Element> {
    let list = if let Some(document) = scope.dyn_ref::<Document>() {
        document.query_selector_all(selector)
    } else {
        scope.dyn_ref::<ShadowRoot>()?.query_selector_all(selector)
    }
    .ok()?;
    let depth = (!selector.starts_with("[id=")).then(|| selector.split(" > ").count());
    (0..list.length())
        .filter_map(|i| list.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .find(|elem| {
            let Some(depth) = depth else {
                return true;
            };
            let mut node: Node = elem.clone().into();
            for _ in 0..depth {
                match node.parent_node() {
                    Some(parent) => node = parent,
                    None => return false,
                }
            }
            node.is_same_node(Some(scope))
        })
}

/// Deepest focused element, following open shadow roots.
fn deep_active_element(document: &Document) -> Option<Element> {
    let mut active = document.active_element()?;
    while let Some(inner) = active.shadow_root().and_then(|root| root.active_element()) {
        active = inner;
    }
    Some(active)
}

fn target_element(window: &Window, init: &InitializePayload) -> Result<Element> {
    let document = window
        .document()
        .ok_or_else(|| SyncError::Js("window has no document".into()))?;
    let mut scope: Node = document.clone().into();
    for host in &init.hosts {
        let root = query_anchored(&scope, host)
            .ok_or_else(|| SyncError::BridgeUnavailable(format!("shadow host {host} not found")))?
            .shadow_root()
            .ok_or_else(|| SyncError::BridgeUnavailable(format!("shadow root of {host} is closed")))?;
        scope = root.into();
    }
    if let Some(elem) = query_anchored(&scope, &init.selector) {
        return Ok(elem);
    }
    tracing::debug!(target: "shuttle::page", selector = %init.selector, "selector missed, using active element");
    deep_active_element(&document)
        .ok_or_else(|| SyncError::BridgeUnavailable(format!("nothing matches {}", init.selector)))
}

fn initialize(sessions: &Sessions, outbox: &Outbox, uuid: String, init: InitializePayload) -> Result<()> {
    let kind = HandlerKind::from_name(&init.name)
        .ok_or_else(|| SyncError::Protocol(format!("unknown handler {:?}", init.name)))?;
    let elem = target_element(&outbox.window, &init)?;
    let adapter = Rc::new(Adapter::attach(kind, &elem)?);

    let notify = {
        let outbox = outbox.clone();
        let uuid = uuid.clone();
        Rc::new(move || outbox.post_or_log(&uuid, BridgeMessage::Change))
    };
    adapter.bind_change(notify)?;

    if let Some(previous) = sessions.borrow_mut().insert(uuid.clone(), adapter.clone()) {
        previous.unbind();
    }
    tracing::info!(target: "shuttle::page", %uuid, handler = kind.name(), "attached");

    let outbox = outbox.clone();
    spawn_local(async move {
        let position = adapter
            .get_value()
            .ok()
            .and_then(|state| state.position())
            .unwrap_or_default();
        let ready = ReadyPayload {
            line_number: position.line_number,
            column: position.column,
            extension: adapter.extension().await,
            rect: Some(adapter.rect()),
        };
        outbox.post_or_log(&uuid, BridgeMessage::Ready(ready));
    });
    Ok(())
}

fn dispatch(sessions: &Sessions, outbox: &Outbox, uuid: String, message: BridgeMessage) -> Result<()> {
    if let BridgeMessage::Initialize(init) = message {
        return initialize(sessions, outbox, uuid, init);
    }
    let Some(adapter) = sessions.borrow().get(&uuid).cloned() else {
        tracing::debug!(target: "shuttle::page", %uuid, kind = ?message.kind(), "no session");
        return Ok(());
    };
    match message {
        BridgeMessage::GetValue => outbox.post(&uuid, BridgeMessage::Value(adapter.get_value()?)),
        BridgeMessage::SetValue(payload) => adapter.set_value(&payload),
        BridgeMessage::Unload => {
            adapter.unbind();
            sessions.borrow_mut().remove(&uuid);
            tracing::info!(target: "shuttle::page", %uuid, "unloaded");
            Ok(())
        }
        other => {
            tracing::trace!(target: "shuttle::page", kind = ?other.kind(), "ignored");
            Ok(())
        }
    }
}

/// Start serving bridge messages for the lifetime of the page.
pub fn install() -> Result<()> {
    let window = web_sys::window().ok_or_else(|| SyncError::Js("no window".into()))?;
    let origin = window.location().origin().map_err(js_err)?;
    let outbox = Outbox {
        window: window.clone(),
        target_origin: if origin == "null" { "*".to_string() } else { origin },
    };
    let sessions: Sessions = Rc::default();

    let own = window.clone();
    EventListener::new(&window, "message", move |event| {
        let Some(event) = event.dyn_ref::<MessageEvent>() else {
            return;
        };
        let data = event.data();
        let Some(uuid) = js_sys::Reflect::get(&data, &"uuid".into())
            .ok()
            .and_then(|u| u.as_string())
        else {
            return;
        };
        let same_source = event
            .source()
            .is_some_and(|source| js_sys::Object::is(&source, &own));
        let raw: serde_json::Value = match serde_wasm_bindgen::from_value(data) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(target: "shuttle::page", "undecodable message: {e}");
                return;
            }
        };
        let Some(message) = BridgeFilter::new(uuid.clone(), Direction::ToPage).accept(&raw, same_source) else {
            return;
        };
        let kind = message.kind();
        if let Err(e) = dispatch(&sessions, &outbox, uuid.clone(), message) {
            tracing::error!(target: "shuttle::page", %uuid, ?kind, "{e}");
        }
    })
    .forget();

    tracing::debug!(target: "shuttle::page", "bridge listener installed");
    Ok(())
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use wasm_bindgen_test::*;
    use web_sys::{HtmlElement, ShadowRootInit, ShadowRootMode};

    use super::*;

    wasm_bindgen_test_configure!(run_in_browser);

    const EDITOR: &str = "<div class=\"cm-editor\"><div class=\"cm-content\"></div></div>";

    fn init(selector: &str, hosts: Vec<String>) -> InitializePayload {
        InitializePayload {
            name: HandlerKind::CodeMirror6.name().to_string(),
            selector: selector.to_string(),
            hosts,
        }
    }

    #[wasm_bindgen_test]
    fn test_target_resolves_inside_shadow_host() {
        let window = web_sys::window().unwrap();
        let document = window.document().unwrap();
        let body = document.body().unwrap();

        let decoy = document.create_element("div").unwrap();
        decoy.set_inner_html(EDITOR);
        body.prepend_with_node_1(&decoy).unwrap();

        let host: HtmlElement = document.create_element("div").unwrap().dyn_into().unwrap();
        host.set_id("shadow-editor-host");
        body.append_child(&host).unwrap();
        let root = host
            .attach_shadow(&ShadowRootInit::new(ShadowRootMode::Open))
            .unwrap();
        root.set_inner_html(EDITOR);
        let inner = root.query_selector(".cm-content").unwrap().unwrap();

        let found = target_element(
            &window,
            &init(
                "div:nth-child(1) > div:nth-child(1)",
                vec!["[id=\"shadow-editor-host\"]".to_string()],
            ),
        )
        .unwrap();
        assert_eq!(found, inner);

        let missing = target_element(&window, &init("div", vec!["[id=\"no-such-host\"]".to_string()]));
        assert!(matches!(missing, Err(SyncError::BridgeUnavailable(_))));

        decoy.remove();
        host.remove();
    }

    #[wasm_bindgen_test]
    fn test_relative_selector_skips_deeper_look_alike() {
        let document = web_sys::window().unwrap().document().unwrap();
        let host: HtmlElement = document.create_element("div").unwrap().dyn_into().unwrap();
        document.body().unwrap().append_child(&host).unwrap();
        let root = host
            .attach_shadow(&ShadowRootInit::new(ShadowRootMode::Open))
            .unwrap();
        root.set_inner_html("<div><span></span><p class=\"deep\"></p></div><p class=\"top\"></p>");

        let found = query_anchored(&root.into(), "p:nth-child(2)").unwrap();
        assert_eq!(found.class_name(), "top");
        host.remove();
    }
}
