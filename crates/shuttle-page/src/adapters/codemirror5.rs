use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Object, Reflect};
use wasm_bindgen::prelude::*;
use web_sys::Element;

use shuttle_core::{
    EchoSuppressor, Extension, OneOrMany, Position, Result, SetValuePayload, SyncError, TextState,
    extension_for, position_at,
};

use super::{closest, target_selection};
use crate::js::{call, get, js_err};

pub struct CodeMirror5 {
    container: Element,
    cm: JsValue,
    echo: EchoSuppressor,
    listener: RefCell<Option<Closure<dyn FnMut(JsValue, JsValue)>>>,
}

/// CodeMirror 5 `{line, ch}`, both 0-based.
fn cm_pos(pos: Position) -> Result<JsValue> {
    let obj = Object::new();
    Reflect::set(&obj, &"line".into(), &(pos.line_number - 1).into()).map_err(js_err)?;
    Reflect::set(&obj, &"ch".into(), &(pos.column - 1).into()).map_err(js_err)?;
    Ok(obj.into())
}

impl CodeMirror5 {
    pub fn attach(elem: &Element) -> Result<Self> {
        let container = closest(elem, ".CodeMirror")?;
        let cm = get(&container, "CodeMirror")
            .ok_or_else(|| SyncError::BridgeUnavailable("CodeMirror instance missing".into()))?;
        Ok(Self {
            container,
            cm,
            echo: EchoSuppressor::new(),
            listener: RefCell::new(None),
        })
    }

    pub fn container(&self) -> &Element {
        &self.container
    }

    pub fn get_value(&self) -> Result<TextState> {
        let text = call(&self.cm, "getValue", &[])?.as_string().unwrap_or_default();
        let cursor = call(&self.cm, "getCursor", &[])?;
        let field = |key| get(&cursor, key).and_then(|v| v.as_f64()).unwrap_or(0.0) as u32;
        Ok(TextState::new(text).with_position(Position::new(field("line") + 1, field("ch") + 1)))
    }

    pub fn set_value(&self, payload: &SetValuePayload) -> Result<()> {
        let _token = self.echo.begin();
        call(&self.cm, "setValue", &[JsValue::from_str(&payload.text)])?;
        if let Some(sel) = target_selection(&payload.text, payload) {
            let anchor = cm_pos(position_at(&payload.text, sel.start))?;
            if sel.is_caret() {
                call(&self.cm, "setCursor", &[anchor])?;
            } else {
                let head = cm_pos(position_at(&payload.text, sel.end))?;
                call(&self.cm, "setSelection", &[anchor, head])?;
            }
        }
        Ok(())
    }

    pub fn bind_change(&self, notify: Rc<dyn Fn()>) -> Result<()> {
        self.unbind();
        let echo = self.echo.clone();
        let closure = Closure::<dyn FnMut(JsValue, JsValue)>::new(move |_cm: JsValue, _change: JsValue| {
            if !echo.is_suppressed() {
                notify();
            }
        });
        call(
            &self.cm,
            "on",
            &[JsValue::from_str("change"), closure.as_ref().clone()],
        )?;
        *self.listener.borrow_mut() = Some(closure);
        Ok(())
    }

    pub fn unbind(&self) {
        if let Some(closure) = self.listener.borrow_mut().take()
            && let Err(e) = call(
                &self.cm,
                "off",
                &[JsValue::from_str("change"), closure.as_ref().clone()],
            )
        {
            tracing::warn!("codemirror5: detaching change listener failed: {e}");
        }
    }

    /// Mode name, from the live mode object or the configured option.
    fn mode(&self) -> Option<String> {
        let live = call(&self.cm, "getMode", &[])
            .ok()
            .and_then(|m| get(&m, "name"))
            .and_then(|n| n.as_string());
        live.or_else(|| {
            let opt = call(&self.cm, "getOption", &[JsValue::from_str("mode")]).ok()?;
            opt.as_string()
                .or_else(|| get(&opt, "name").and_then(|n| n.as_string()))
        })
    }

    pub fn extension(&self) -> Option<Extension> {
        let mode = self.mode()?;
        extension_for(&mode).map(|e| OneOrMany::One(e.to_string()))
    }
}
