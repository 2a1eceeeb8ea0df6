//! Monaco adapter.
//!
//! Monaco is reached one of three ways, probed in order:
//!
//! 1. **Native**: the page exposes the global `monaco` API and one of
//!    `monaco.editor.getEditors()` owns the target container.
//! 2. **Discovered**: no global API, but an object that quacks like a code
//!    editor (`getModel`, `executeEdits`, `onDidChangeModelContent`) hangs
//!    off the container, one of its ancestors, or `window`.
//! 3. **Simulated**: neither is reachable. The hidden input textarea is driven
//!    with synthetic select-all, paste and arrow-key events, and text is read
//!    back from the rendered lines. This mode only sees lines Monaco has
//!    rendered and cannot report a cursor.
//!
//! The editor is never destroyed or recreated to gain access to it.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::EventListener;
use js_sys::{Array, Object, Reflect};
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    ClipboardEvent, ClipboardEventInit, DataTransfer, Element, HtmlElement, KeyboardEvent,
    KeyboardEventInit,
};

use shuttle_core::{
    DiffOptions, EchoSuppressor, Extension, OneOrMany, Position, Result, SetValuePayload,
    SyncError, TextState, compute_changes, extension_for, position_at,
};

use super::{closest, target_selection};
use crate::js::{call, from_js, get, global, has_method, js_err, path, to_js};

const EDIT_SOURCE: &str = "shuttle";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonacoStrategy {
    Native,
    Discovered,
    Simulated,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonacoPosition {
    line_number: u32,
    column: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MonacoRange {
    start_line_number: u32,
    start_column: u32,
    end_line_number: u32,
    end_column: u32,
}

impl MonacoRange {
    fn between(start: &MonacoPosition, end: &MonacoPosition) -> Self {
        Self {
            start_line_number: start.line_number,
            start_column: start.column,
            end_line_number: end.line_number,
            end_column: end.column,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EditOperation {
    range: MonacoRange,
    text: String,
    force_move_markers: bool,
}

enum Backend {
    Api {
        editor: JsValue,
        disposable: RefCell<Option<(JsValue, Closure<dyn FnMut(JsValue)>)>>,
    },
    Dom {
        input: HtmlElement,
        listeners: RefCell<Vec<EventListener>>,
    },
}

pub struct Monaco {
    container: Element,
    strategy: MonacoStrategy,
    backend: Backend,
    echo: EchoSuppressor,
}

fn is_code_editor(value: &JsValue) -> bool {
    value.is_object()
        && has_method(value, "getModel")
        && has_method(value, "executeEdits")
        && has_method(value, "onDidChangeModelContent")
}

/// Whether `editor` renders into `container`.
fn owns(editor: &JsValue, container: &Element) -> bool {
    call(editor, "getContainerDomNode", &[])
        .ok()
        .and_then(|node| node.dyn_into::<web_sys::Node>().ok())
        .is_some_and(|node| node.contains(Some(container.as_ref())) || container.contains(Some(&node)))
}

fn native_editor(container: &Element) -> Option<JsValue> {
    let editors = path(&global("monaco")?, &["editor"])
        .and_then(|ns| call(&ns, "getEditors", &[]).ok())?;
    Array::from(&editors)
        .iter()
        .find(|editor| owns(editor, container))
}

/// Scan the own properties of `holder` for something shaped like an editor.
fn scan(holder: &JsValue, container: &Element) -> Option<JsValue> {
    let holder: &Object = holder.dyn_ref()?;
    Object::keys(holder).iter().find_map(|key| {
        let value = Reflect::get(holder, &key).ok()?;
        (is_code_editor(&value) && owns(&value, container)).then_some(value)
    })
}

fn discovered_editor(container: &Element) -> Option<JsValue> {
    let mut node = Some(container.clone());
    while let Some(elem) = node {
        if let Some(editor) = scan(&elem, container) {
            return Some(editor);
        }
        node = elem.parent_element();
    }
    scan(&js_sys::global(), container)
}

fn key_event(kind: &str, key: &str, code: &str, ctrl: bool) -> Result<KeyboardEvent> {
    let init = KeyboardEventInit::new();
    init.set_key(key);
    init.set_code(code);
    init.set_ctrl_key(ctrl);
    init.set_bubbles(true);
    init.set_cancelable(true);
    KeyboardEvent::new_with_keyboard_event_init_dict(kind, &init).map_err(js_err)
}

fn press(target: &HtmlElement, key: &str, code: &str, ctrl: bool) -> Result<()> {
    for kind in ["keydown", "keyup"] {
        let event = key_event(kind, key, code, ctrl)?;
        target.dispatch_event(&event).map_err(js_err)?;
    }
    Ok(())
}

impl Monaco {
    pub fn attach(elem: &Element) -> Result<Self> {
        let container = closest(elem, ".monaco-editor")?;
        let (strategy, backend) = if let Some(editor) = native_editor(&container) {
            (MonacoStrategy::Native, Self::api(editor))
        } else if let Some(editor) = discovered_editor(&container) {
            (MonacoStrategy::Discovered, Self::api(editor))
        } else {
            let input = container
                .query_selector("textarea")
                .ok()
                .flatten()
                .and_then(|t| t.dyn_into::<HtmlElement>().ok())
                .ok_or_else(|| SyncError::BridgeUnavailable("monaco input area missing".into()))?;
            let backend = Backend::Dom {
                input,
                listeners: RefCell::new(Vec::new()),
            };
            (MonacoStrategy::Simulated, backend)
        };
        tracing::debug!(?strategy, "monaco: attached");
        Ok(Self {
            container,
            strategy,
            backend,
            echo: EchoSuppressor::new(),
        })
    }

    fn api(editor: JsValue) -> Backend {
        Backend::Api {
            editor,
            disposable: RefCell::new(None),
        }
    }

    pub fn strategy(&self) -> MonacoStrategy {
        self.strategy
    }

    pub fn container(&self) -> &Element {
        &self.container
    }

    pub fn get_value(&self) -> Result<TextState> {
        match &self.backend {
            Backend::Api { editor, .. } => {
                let model = call(editor, "getModel", &[])?;
                let text = call(&model, "getValue", &[])?.as_string().unwrap_or_default();
                let pos: MonacoPosition = from_js(call(editor, "getPosition", &[])?)?;
                Ok(TextState::new(text).with_position(Position::new(pos.line_number, pos.column)))
            }
            Backend::Dom { .. } => {
                let lines = self
                    .container
                    .query_selector_all(".view-lines .view-line")
                    .map_err(js_err)?;
                let text = (0..lines.length())
                    .filter_map(|i| lines.item(i))
                    .map(|line| line.text_content().unwrap_or_default().replace('\u{a0}', " "))
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(TextState::new(text).with_position(Position::default()))
            }
        }
    }

    pub fn set_value(&self, payload: &SetValuePayload) -> Result<()> {
        let _token = self.echo.begin();
        match &self.backend {
            Backend::Api { editor, .. } => self.apply_edits(editor, payload),
            Backend::Dom { input, .. } => self.simulate(input, payload),
        }
    }

    fn apply_edits(&self, editor: &JsValue, payload: &SetValuePayload) -> Result<()> {
        let model = call(editor, "getModel", &[])?;
        let current = call(&model, "getValue", &[])?.as_string().unwrap_or_default();
        let model_pos = |offset: usize| -> Result<MonacoPosition> {
            from_js(call(&model, "getPositionAt", &[offset.into()])?)
        };

        // Ranges are resolved against the model before any edit lands.
        let edits = compute_changes(&current, &payload.text, &DiffOptions::default())
            .into_iter()
            .map(|change| {
                Ok(EditOperation {
                    range: MonacoRange::between(&model_pos(change.from)?, &model_pos(change.to)?),
                    text: change.insert,
                    force_move_markers: true,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if !edits.is_empty() {
            call(editor, "executeEdits", &[EDIT_SOURCE.into(), to_js(&edits)?])?;
        }

        if let Some(sel) = target_selection(&payload.text, payload) {
            let start = model_pos(sel.start)?;
            if sel.is_caret() {
                call(editor, "setPosition", &[to_js(&start)?])?;
            } else {
                let range = MonacoRange::between(&start, &model_pos(sel.end)?);
                call(editor, "setSelection", &[to_js(&range)?])?;
            }
        }
        Ok(())
    }

    fn simulate(&self, input: &HtmlElement, payload: &SetValuePayload) -> Result<()> {
        input.focus().map_err(js_err)?;
        press(input, "a", "KeyA", true)?;

        let data = DataTransfer::new().map_err(js_err)?;
        data.set_data("text/plain", &payload.text).map_err(js_err)?;
        let init = ClipboardEventInit::new();
        init.set_clipboard_data(Some(&data));
        init.set_bubbles(true);
        init.set_cancelable(true);
        let paste = ClipboardEvent::new_with_event_init_dict("paste", &init).map_err(js_err)?;
        input.dispatch_event(&paste).map_err(js_err)?;

        if let Some(sel) = target_selection(&payload.text, payload) {
            let pos = position_at(&payload.text, sel.start);
            press(input, "Home", "Home", true)?;
            for _ in 1..pos.line_number {
                press(input, "ArrowDown", "ArrowDown", false)?;
            }
            press(input, "Home", "Home", false)?;
            for _ in 1..pos.column {
                press(input, "ArrowRight", "ArrowRight", false)?;
            }
        }
        Ok(())
    }

    pub fn bind_change(&self, notify: Rc<dyn Fn()>) -> Result<()> {
        self.unbind();
        let echo = self.echo.clone();
        match &self.backend {
            Backend::Api { editor, disposable } => {
                let closure = Closure::<dyn FnMut(JsValue)>::new(move |_event: JsValue| {
                    if !echo.is_suppressed() {
                        notify();
                    }
                });
                let handle = call(
                    editor,
                    "onDidChangeModelContent",
                    &[closure.as_ref().clone()],
                )?;
                *disposable.borrow_mut() = Some((handle, closure));
            }
            Backend::Dom { input, listeners } => {
                let mut listeners = listeners.borrow_mut();
                for event in ["input", "keyup"] {
                    let echo = echo.clone();
                    let notify = notify.clone();
                    listeners.push(EventListener::new(input, event, move |_| {
                        if !echo.is_suppressed() {
                            notify();
                        }
                    }));
                }
            }
        }
        Ok(())
    }

    pub fn unbind(&self) {
        match &self.backend {
            Backend::Api { disposable, .. } => {
                if let Some((handle, _closure)) = disposable.borrow_mut().take()
                    && let Err(e) = call(&handle, "dispose", &[])
                {
                    tracing::warn!("monaco: disposing change listener failed: {e}");
                }
            }
            Backend::Dom { listeners, .. } => listeners.borrow_mut().clear(),
        }
    }

    fn language(&self) -> Option<String> {
        match &self.backend {
            Backend::Api { editor, .. } => {
                let model = call(editor, "getModel", &[]).ok()?;
                ["getLanguageId", "getModeId"]
                    .into_iter()
                    .find_map(|method| call(&model, method, &[]).ok()?.as_string())
            }
            Backend::Dom { .. } => self.container.get_attribute("data-mode-id"),
        }
    }

    /// Extensions registered for `language` in the page's Monaco registry.
    fn registered_extensions(language: &str) -> Option<Vec<String>> {
        let languages = path(&global("monaco")?, &["languages"])?;
        let list = Array::from(&call(&languages, "getLanguages", &[]).ok()?);
        let entry = list
            .iter()
            .find(|l| get(l, "id").and_then(|id| id.as_string()).as_deref() == Some(language))?;
        let exts: Vec<String> = Array::from(&get(&entry, "extensions")?)
            .iter()
            .filter_map(|e| e.as_string())
            .map(|e| e.trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .collect();
        (!exts.is_empty()).then_some(exts)
    }

    pub fn extension(&self) -> Option<Extension> {
        let language = self.language()?;
        if let Some(exts) = Self::registered_extensions(&language) {
            return Some(OneOrMany::Many(exts));
        }
        extension_for(&language).map(|e| OneOrMany::One(e.to_string()))
    }
}
