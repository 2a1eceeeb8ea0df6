//! WASM browser tests for shuttle-browser.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

use std::cell::{Cell, RefCell};
use std::pin::pin;
use std::rc::Rc;

use futures_util::future::{Either, select};
use futures_util::poll;
use gloo_timers::future::TimeoutFuture;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{
    Document, Element, HtmlElement, HtmlTextAreaElement, KeyboardEvent, KeyboardEventInit,
    MessageEvent, MessageEventInit, ShadowRoot,
};

wasm_bindgen_test_configure!(run_in_browser);

use shuttle_browser::discovery::{Candidate, candidates};
use shuttle_browser::dom::{shadow_hosts, unique_selector};
use shuttle_browser::handlers::{ChangeCallback, Handler, HandlerContext};
use shuttle_browser::hints::{HintSlot, read_hint};
use shuttle_browser::{
    BridgeMessage, HandlerKind, InjectionSession, Orchestrator, PageBridge, Position,
    ScriptInjector, SetValueOptions, Settings, SyncError, TextState,
};

fn document() -> Document {
    web_sys::window().unwrap().document().unwrap()
}

fn mount(html: &str) -> Element {
    let doc = document();
    let host = doc.create_element("div").unwrap();
    host.set_inner_html(html);
    doc.body().unwrap().append_child(&host).unwrap();
    host
}

fn ctx() -> HandlerContext {
    HandlerContext::new(Rc::new(Settings::default()))
}

fn attach_shadow(host: &Element, html: &str) -> ShadowRoot {
    let host: &HtmlElement = host.dyn_ref().unwrap();
    let root = host
        .attach_shadow(&web_sys::ShadowRootInit::new(web_sys::ShadowRootMode::Open))
        .unwrap();
    root.set_inner_html(html);
    root
}

fn press(doc: &Document, key: &str) {
    let init = KeyboardEventInit::new();
    init.set_key(key);
    let event = KeyboardEvent::new_with_keyboard_event_init_dict("keydown", &init).unwrap();
    doc.dispatch_event(&event).unwrap();
}

/// Deliver `message` for `uuid` to this window's listeners, as if posted by `source`.
fn deliver(uuid: &str, message: BridgeMessage, source: Option<&js_sys::Object>) {
    let envelope = serde_json::to_string(&message.into_envelope(uuid).unwrap()).unwrap();
    let init = MessageEventInit::new();
    init.set_data(&js_sys::JSON::parse(&envelope).unwrap());
    init.set_source(source);
    let event = MessageEvent::new_with_event_init_dict("message", &init).unwrap();
    web_sys::window().unwrap().dispatch_event(&event).unwrap();
}

fn textarea_candidates(host: &Element) -> Vec<Candidate> {
    let list = host.query_selector_all("textarea").unwrap();
    (0..list.length())
        .map(|i| {
            let elem: Element = list.get(i).unwrap().dyn_into().unwrap();
            Candidate {
                elem: elem.clone(),
                kind: HandlerKind::Textarea,
                area: elem,
            }
        })
        .collect()
}

// === Plain field ===

#[wasm_bindgen_test]
async fn test_textarea_get_value_reports_caret() {
    let host = mount("<textarea></textarea>");
    let area: HtmlTextAreaElement = host.first_element_child().unwrap().dyn_into().unwrap();
    area.set_value("line1\nline2");
    area.set_selection_range(5, 5).unwrap();

    let handler = Handler::make(area.clone().into(), &ctx()).unwrap();
    assert_eq!(handler.kind(), HandlerKind::Textarea);

    let state = handler.get_value().await.unwrap();
    assert_eq!(
        state,
        TextState::new("line1\nline2").with_position(Position::new(1, 6))
    );
    host.remove();
}

#[wasm_bindgen_test]
async fn test_textarea_set_then_get() {
    let host = mount("<textarea></textarea>");
    let area = host.first_element_child().unwrap();
    let handler = Handler::make(area, &ctx()).unwrap();

    let opts = SetValueOptions {
        position: Some(Position::new(2, 2)),
        ..Default::default()
    };
    handler.set_value("ab\ncd", &opts).unwrap();
    let state = handler.get_value().await.unwrap();
    assert_eq!(state.text, "ab\ncd");
    assert_eq!(state.position(), Some(Position::new(2, 2)));
    host.remove();
}

#[wasm_bindgen_test]
async fn test_set_value_does_not_echo() {
    let host = mount("<textarea></textarea>");
    let area = host.first_element_child().unwrap();
    let handler = Handler::make(area.clone(), &ctx()).unwrap();

    let fired = Rc::new(Cell::new(0));
    let callback: ChangeCallback = {
        let fired = fired.clone();
        Rc::new(move || fired.set(fired.get() + 1))
    };
    handler.bind_change(callback.clone());

    // The write itself, and anything it dispatches, is ours.
    handler.set_value("remote", &SetValueOptions::default()).unwrap();
    assert_eq!(fired.get(), 0);

    let keyup = web_sys::Event::new("keyup").unwrap();
    area.dispatch_event(&keyup).unwrap();
    assert_eq!(fired.get(), 1);

    handler.unbind_change(&callback);
    area.dispatch_event(&keyup).unwrap();
    assert_eq!(fired.get(), 1);
    host.remove();
}

// === Content-editable ===

#[wasm_bindgen_test]
async fn test_content_editable_round_trip() {
    let host = mount("<div contenteditable=\"true\"><div>a</div><div><br></div><div>b &amp; c</div></div>");
    let editable = host.first_element_child().unwrap();
    let handler = Handler::make(editable.clone(), &ctx()).unwrap();
    assert_eq!(handler.kind(), HandlerKind::ContentEditable);

    let state = handler.get_value().await.unwrap();
    assert_eq!(state.text, "a\n\nb & c");

    handler
        .set_value(&state.text, &SetValueOptions::default())
        .unwrap();
    assert_eq!(
        editable.inner_html(),
        "<div>a</div><div><br></div><div>b &amp; c</div>"
    );
    assert_eq!(handler.get_value().await.unwrap().text, "a\n\nb & c");
    host.remove();
}

// === Selection priority ===

#[wasm_bindgen_test]
fn test_codemirror5_textarea_selects_rich_handler() {
    let host = mount("<div class=\"CodeMirror\"><div><textarea></textarea></div></div>");
    let hidden = host.query_selector("textarea").unwrap().unwrap();
    assert!(Handler::can_handle(&hidden));

    let area = Handler::hint_area(&hidden).unwrap();
    assert!(area.class_list().contains("CodeMirror"));
    host.remove();
}

#[wasm_bindgen_test]
fn test_no_handler_for_plain_div() {
    let host = mount("<div>static</div>");
    let plain = host.first_element_child().unwrap();
    assert!(!Handler::can_handle(&plain));
    assert!(Handler::make(plain, &ctx()).is_err());
    host.remove();
}

// === Discovery ===

#[wasm_bindgen_test]
fn test_discovery_skips_disabled_and_hidden() {
    let host = mount(
        "<textarea id=\"shown\"></textarea>\
         <textarea disabled></textarea>\
         <textarea hidden></textarea>\
         <input type=\"checkbox\">",
    );
    let found = candidates(&document());
    let ids: Vec<String> = found
        .iter()
        .filter(|c| host.contains(Some(c.elem.as_ref())))
        .map(|c| c.elem.id())
        .collect();
    assert_eq!(ids, vec!["shown".to_string()]);
    host.remove();
}

#[wasm_bindgen_test]
fn test_discovery_enters_shadow_roots() {
    let host = mount("<div id=\"shadow-host\"></div>");
    let shadow_host: HtmlElement = host.first_element_child().unwrap().dyn_into().unwrap();
    let root = shadow_host
        .attach_shadow(&web_sys::ShadowRootInit::new(web_sys::ShadowRootMode::Open))
        .unwrap();
    root.set_inner_html("<textarea id=\"inner\"></textarea>");

    let found = candidates(&document());
    assert!(found.iter().any(|c| c.elem.id() == "inner"));
    host.remove();
}

#[wasm_bindgen_test]
async fn test_value_set_hook_sees_options() {
    let host = mount("<textarea></textarea>");
    let area = host.first_element_child().unwrap();
    let handler = Handler::make(area.clone(), &ctx()).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    {
        let seen = seen.clone();
        handler
            .base()
            .on_value_set(Rc::new(move |opts| seen.borrow_mut().push(opts.trigger_dom_event)));
    }
    let inputs = Rc::new(Cell::new(0));
    let _input = {
        let inputs = inputs.clone();
        gloo_events::EventListener::new(&area, "input", move |_| inputs.set(inputs.get() + 1))
    };

    handler.set_value("a", &SetValueOptions::default()).unwrap();
    let quiet = SetValueOptions {
        trigger_dom_event: false,
        ..Default::default()
    };
    handler.set_value("b", &quiet).unwrap();

    assert_eq!(*seen.borrow(), vec![true, false]);
    assert_eq!(inputs.get(), 1);
    host.remove();
}

#[wasm_bindgen_test]
async fn test_content_editable_caret_after_line_break() {
    let host = mount("<div contenteditable=\"true\">x<br>y</div>");
    let editable = host.first_element_child().unwrap();
    let handler = Handler::make(editable.clone(), &ctx()).unwrap();

    let doc = document();
    let range = doc.create_range().unwrap();
    range.set_start(&editable, 2).unwrap();
    range.collapse_with_to_start(true);
    let selection = web_sys::window().unwrap().get_selection().unwrap().unwrap();
    selection.remove_all_ranges().unwrap();
    selection.add_range(&range).unwrap();

    let state = handler.get_value().await.unwrap();
    assert_eq!(state.text, "x\ny");
    assert_eq!(state.position(), Some(Position::new(2, 1)));
    selection.remove_all_ranges().unwrap();
    host.remove();
}

// === Shadow DOM targeting ===

#[wasm_bindgen_test]
fn test_shadow_editor_selector_is_scoped_to_its_root() {
    let host = mount("<div class=\"widget\"></div>");
    let shadow_host = host.first_element_child().unwrap();
    let root = attach_shadow(
        &shadow_host,
        "<div class=\"cm-editor\"><div class=\"cm-content\" contenteditable=\"true\"></div></div>",
    );
    let inner = root.query_selector(".cm-content").unwrap().unwrap();

    let hosts = shadow_hosts(&inner);
    assert_eq!(hosts.len(), 1);
    let found_host = document().query_selector(&hosts[0]).unwrap().unwrap();
    assert_eq!(found_host, shadow_host);
    let found = root.query_selector(&unique_selector(&inner)).unwrap().unwrap();
    assert_eq!(found, inner);

    let handler = Handler::make(inner.clone(), &ctx()).unwrap();
    assert!(handler.kind().is_injected());
    let Handler::Injected(injected) = &handler else {
        panic!("expected an injected handler");
    };
    assert_eq!(injected.bridge().session().hosts, hosts);
    host.remove();
}

#[wasm_bindgen_test]
fn test_light_dom_element_has_no_shadow_hosts() {
    let host = mount("<textarea></textarea>");
    let area = host.first_element_child().unwrap();
    assert!(shadow_hosts(&area).is_empty());
    host.remove();
}

// === Page bridge ===

#[wasm_bindgen_test]
fn test_page_bridge_filters_uuid_and_source() {
    let window = web_sys::window().unwrap();
    let own: js_sys::Object = window.clone().into();
    let bridge = PageBridge::new(InjectionSession::new(
        "session-a",
        HandlerKind::Ace,
        "[id=\"editor\"]",
    ))
    .unwrap();
    let changes = Rc::new(Cell::new(0));
    {
        let changes = changes.clone();
        bridge.on_change(Some(Rc::new(move || changes.set(changes.get() + 1))));
    }

    deliver("session-b", BridgeMessage::Change, Some(&own));
    assert_eq!(changes.get(), 0, "other session");
    deliver("session-a", BridgeMessage::Change, None);
    assert_eq!(changes.get(), 0, "no source window");
    let stranger = js_sys::Object::new();
    deliver("session-a", BridgeMessage::Change, Some(&stranger));
    assert_eq!(changes.get(), 0, "foreign source");
    deliver("session-a", BridgeMessage::GetValue, Some(&own));
    assert_eq!(changes.get(), 0, "page-bound kind");

    deliver("session-a", BridgeMessage::Change, Some(&own));
    assert_eq!(changes.get(), 1);

    bridge.unload();
    deliver("session-a", BridgeMessage::Change, Some(&own));
    assert_eq!(changes.get(), 1, "after unload");
}

#[wasm_bindgen_test]
async fn test_silent_page_script_times_out() {
    let injector = ScriptInjector::new("data:text/javascript,void%200");
    let bridge = PageBridge::new(InjectionSession::new(
        "session-silent",
        HandlerKind::Monaco,
        "[id=\"editor\"]",
    ))
    .unwrap();

    let err = bridge.connect(&injector, 50).await.unwrap_err();
    match err {
        SyncError::HandshakeTimeout { name, timeout_ms } => {
            assert_eq!(name, HandlerKind::Monaco.name());
            assert_eq!(timeout_ms, 50);
        }
        other => panic!("expected a handshake timeout, got {other}"),
    }
    assert!(injector.is_injected());
}

// === Hints ===

#[wasm_bindgen_test]
async fn test_second_hint_read_is_busy() {
    let host = mount("<textarea></textarea><textarea></textarea>");
    let picks = textarea_candidates(&host);
    let doc = document();
    let settings = Settings::default();
    let slot = HintSlot::new();

    let mut first = pin!(read_hint(&slot, &doc, &picks, &settings));
    assert!(poll!(first.as_mut()).is_pending());
    assert!(slot.is_active());

    let second = read_hint(&slot, &doc, &picks, &settings).await;
    assert!(matches!(second, Err(SyncError::HintBusy)));

    press(&doc, "Escape");
    assert_eq!(first.await.unwrap(), None);
    assert!(!slot.is_active());
    host.remove();
}

#[wasm_bindgen_test]
async fn test_hint_typed_label_selects() {
    let host = mount("<textarea></textarea><textarea></textarea>");
    let picks = textarea_candidates(&host);
    let doc = document();
    let slot = HintSlot::new();
    let settings = Settings::default();

    let mut read = pin!(read_hint(&slot, &doc, &picks, &settings));
    assert!(poll!(read.as_mut()).is_pending());
    press(&doc, "s");
    assert_eq!(read.await.unwrap(), Some(picks[1].elem.clone()));
    host.remove();
}

#[wasm_bindgen_test]
async fn test_scrolling_restarts_up_to_retry_bound() {
    let host = mount("<textarea></textarea><textarea></textarea>");
    let picks = textarea_candidates(&host);
    let doc = document();
    let slot = HintSlot::new();
    let settings = Settings {
        max_hint_retries: 1,
        scroll_debounce_ms: 10,
        ..Settings::default()
    };
    let scroll = || doc.dispatch_event(&web_sys::Event::new("scroll").unwrap()).unwrap();

    let mut read = pin!(read_hint(&slot, &doc, &picks, &settings));
    assert!(poll!(read.as_mut()).is_pending());

    // One restart is allowed: the read settles and shows labels again.
    scroll();
    match select(read.as_mut(), pin!(TimeoutFuture::new(100))).await {
        Either::Left((result, _)) => panic!("read ended after one scroll: {result:?}"),
        Either::Right(_) => {}
    }

    // The second scroll exceeds the bound.
    scroll();
    assert_eq!(read.await.unwrap(), None);
    assert!(!slot.is_active());
    host.remove();
}

// === Orchestrator ===

async fn wait_until_stopped(orchestrator: &Orchestrator) {
    for _ in 0..100 {
        if !orchestrator.is_running() {
            return;
        }
        TimeoutFuture::new(50).await;
    }
    panic!("session did not end");
}

#[wasm_bindgen_test]
async fn test_refused_connection_shows_one_banner() {
    let host = mount("<textarea></textarea>");
    let area = host.first_element_child().unwrap();
    let settings = Settings {
        server_url: "ws://127.0.0.1:59999".to_string(),
        ..Settings::default()
    };
    let orchestrator = Orchestrator::new(settings);

    // Two failed sessions still leave a single banner.
    for _ in 0..2 {
        assert!(orchestrator.start(Some(area.clone())).await.unwrap());
        assert!(orchestrator.is_running());
        wait_until_stopped(&orchestrator).await;
    }

    let shown = document().query_selector_all("#shuttle-banner").unwrap();
    assert_eq!(shown.length(), 1);
    let banner: Element = shown.get(0).unwrap().dyn_into().unwrap();
    assert!(banner.text_content().unwrap().contains("ws://127.0.0.1:59999"));
    banner.remove();
    host.remove();
}
