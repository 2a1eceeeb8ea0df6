use std::cell::RefCell;
use std::rc::Rc;

use futures_util::future::{Either, select};
use gloo_timers::future::TimeoutFuture;
use js_sys::{Object, Reflect};
use tokio::sync::oneshot;
use wasm_bindgen::prelude::*;
use web_sys::Element;

use shuttle_core::{
    EchoSuppressor, Extension, OneOrMany, Position, Result, SetValuePayload, SyncError, TextState,
    extension_for, position_at,
};

use super::{closest, target_selection};
use crate::js::{call, get, global, has_method, js_err, path};

/// Budget for fetching the modelist module on demand.
const MODELIST_TIMEOUT_MS: u32 = 3000;

pub struct Ace {
    container: Element,
    editor: JsValue,
    echo: EchoSuppressor,
    listener: RefCell<Option<Closure<dyn FnMut(JsValue)>>>,
}

/// Ace `{row, column}`, both 0-based.
fn ace_point(pos: Position) -> Result<JsValue> {
    let point = Object::new();
    Reflect::set(&point, &"row".into(), &(pos.line_number - 1).into()).map_err(js_err)?;
    Reflect::set(&point, &"column".into(), &(pos.column - 1).into()).map_err(js_err)?;
    Ok(point.into())
}

fn number(value: &JsValue, key: &str) -> u32 {
    get(value, key).and_then(|v| v.as_f64()).unwrap_or(0.0) as u32
}

impl Ace {
    pub fn attach(elem: &Element) -> Result<Self> {
        let container = closest(elem, ".ace_editor")?;
        let editor = match path(&container, &["env", "editor"]) {
            Some(editor) => editor,
            None => {
                let ace = global("ace")
                    .ok_or_else(|| SyncError::BridgeUnavailable("window.ace is missing".into()))?;
                call(&ace, "edit", &[container.clone().into()])?
            }
        };
        Ok(Self {
            container,
            editor,
            echo: EchoSuppressor::new(),
            listener: RefCell::new(None),
        })
    }

    pub fn container(&self) -> &Element {
        &self.container
    }

    fn session(&self) -> Result<JsValue> {
        call(&self.editor, "getSession", &[])
    }

    pub fn get_value(&self) -> Result<TextState> {
        let text = call(&self.editor, "getValue", &[])?
            .as_string()
            .unwrap_or_default();
        let cursor = call(&self.editor, "getCursorPosition", &[])?;
        let pos = Position::new(number(&cursor, "row") + 1, number(&cursor, "column") + 1);
        Ok(TextState::new(text).with_position(pos))
    }

    pub fn set_value(&self, payload: &SetValuePayload) -> Result<()> {
        let _token = self.echo.begin();
        // 1 moves the cursor to the end; the requested cursor is placed next.
        call(
            &self.editor,
            "setValue",
            &[JsValue::from_str(&payload.text), JsValue::from(1)],
        )?;
        let Some(sel) = target_selection(&payload.text, payload) else {
            return Ok(());
        };
        let start = position_at(&payload.text, sel.start);
        if sel.is_caret() {
            call(
                &self.editor,
                "gotoLine",
                &[start.line_number.into(), (start.column - 1).into()],
            )?;
        } else {
            let range = Object::new();
            let end = position_at(&payload.text, sel.end);
            Reflect::set(&range, &"start".into(), &ace_point(start)?).map_err(js_err)?;
            Reflect::set(&range, &"end".into(), &ace_point(end)?).map_err(js_err)?;
            if let Some(selection) = get(&self.editor, "selection") {
                call(&selection, "setSelectionRange", &[range.into()])?;
            }
        }
        Ok(())
    }

    pub fn bind_change(&self, notify: Rc<dyn Fn()>) -> Result<()> {
        self.unbind();
        let echo = self.echo.clone();
        let closure = Closure::<dyn FnMut(JsValue)>::new(move |_delta: JsValue| {
            if !echo.is_suppressed() {
                notify();
            }
        });
        call(
            &self.session()?,
            "on",
            &[JsValue::from_str("change"), closure.as_ref().clone()],
        )?;
        *self.listener.borrow_mut() = Some(closure);
        Ok(())
    }

    pub fn unbind(&self) {
        let Some(closure) = self.listener.borrow_mut().take() else {
            return;
        };
        if let Ok(session) = self.session() {
            let off = closure.as_ref().clone();
            if let Err(e) = call(&session, "off", &[JsValue::from_str("change"), off]) {
                tracing::warn!("ace: detaching change listener failed: {e}");
            }
        }
    }

    fn mode_id(&self) -> Option<String> {
        let session = self.session().ok()?;
        get(&session, "$modeId")
            .and_then(|m| m.as_string())
            .or_else(|| {
                call(&session, "getMode", &[])
                    .ok()
                    .and_then(|m| get(&m, "$id"))
                    .and_then(|m| m.as_string())
            })
    }

    /// Resolve the modelist module, loading it through Ace's module loader
    /// when the page has not required it yet.
    async fn modelist() -> Option<JsValue> {
        let ace = global("ace")?;
        if let Some(list) = call(&ace, "require", &["ace/ext/modelist".into()])
            .ok()
            .filter(|l| has_method(l, "getModeForPath") || get(l, "modesByName").is_some())
        {
            return Some(list);
        }
        let config = get(&ace, "config")?;
        let (tx, rx) = oneshot::channel::<JsValue>();
        let done = Closure::once_into_js(move |module: JsValue| {
            let _ = tx.send(module);
        });
        call(&config, "loadModule", &["ace/ext/modelist".into(), done]).ok()?;
        match select(rx, TimeoutFuture::new(MODELIST_TIMEOUT_MS)).await {
            Either::Left((Ok(module), _)) => Some(module),
            _ => {
                tracing::debug!("ace: modelist did not load");
                None
            }
        }
    }

    pub async fn extension(&self) -> Option<Extension> {
        let mode = self.mode_id()?;
        let short = mode.rsplit('/').next().unwrap_or(&mode).to_string();
        if let Some(list) = Self::modelist().await
            && let Some(info) = get(&list, "modesByName").and_then(|m| get(&m, &short))
            && let Some(exts) = get(&info, "extensions").and_then(|e| e.as_string())
        {
            let exts: Vec<String> = exts
                .split('|')
                .filter(|e| !e.is_empty() && !e.starts_with('^'))
                .map(str::to_string)
                .collect();
            if !exts.is_empty() {
                return Some(OneOrMany::Many(exts));
            }
        }
        extension_for(&mode).map(|e| OneOrMany::One(e.to_string()))
    }
}
