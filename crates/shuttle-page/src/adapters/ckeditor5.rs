use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use web_sys::Element;

use shuttle_core::{
    EchoSuppressor, Extension, OneOrMany, Position, Result, SetValuePayload, SyncError, TextState,
};

use super::closest;
use crate::js::{call, get, path};

const DATA_EVENT: &str = "change:data";

pub struct CkEditor5 {
    container: Element,
    editor: JsValue,
    echo: EchoSuppressor,
    listener: RefCell<Option<Closure<dyn FnMut(JsValue)>>>,
}

impl CkEditor5 {
    pub fn attach(elem: &Element) -> Result<Self> {
        let editable = closest(elem, ".ck-editor__editable")?;
        let editor = get(&editable, "ckeditorInstance")
            .ok_or_else(|| SyncError::BridgeUnavailable("ckeditorInstance is missing".into()))?;
        let container = editable
            .closest(".ck-editor")
            .ok()
            .flatten()
            .unwrap_or(editable);
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

    fn document(&self) -> Result<JsValue> {
        path(&self.editor, &["model", "document"])
            .ok_or_else(|| SyncError::BridgeUnavailable("editor.model.document is missing".into()))
    }

    pub fn get_value(&self) -> Result<TextState> {
        let text = call(&self.editor, "getData", &[])?.as_string().unwrap_or_default();
        Ok(TextState::new(text).with_position(Position::default()))
    }

    pub fn set_value(&self, payload: &SetValuePayload) -> Result<()> {
        let _token = self.echo.begin();
        call(&self.editor, "setData", &[JsValue::from_str(&payload.text)])?;
        Ok(())
    }

    pub fn bind_change(&self, notify: Rc<dyn Fn()>) -> Result<()> {
        self.unbind();
        let echo = self.echo.clone();
        let closure = Closure::<dyn FnMut(JsValue)>::new(move |_event: JsValue| {
            if !echo.is_suppressed() {
                notify();
            }
        });
        call(
            &self.document()?,
            "on",
            &[JsValue::from_str(DATA_EVENT), closure.as_ref().clone()],
        )?;
        *self.listener.borrow_mut() = Some(closure);
        Ok(())
    }

    pub fn unbind(&self) {
        let Some(closure) = self.listener.borrow_mut().take() else {
            return;
        };
        let detached = self.document().and_then(|doc| {
            call(&doc, "off", &[JsValue::from_str(DATA_EVENT), closure.as_ref().clone()])
        });
        if let Err(e) = detached {
            tracing::warn!("ckeditor5: detaching change listener failed: {e}");
        }
    }

    pub fn extension(&self) -> Option<Extension> {
        let markdown = get(&self.editor, "plugins")
            .and_then(|p| call(&p, "has", &[JsValue::from_str("Markdown")]).ok())
            .is_some_and(|has| has.is_truthy());
        let ext = if markdown { "md" } else { "html" };
        Some(OneOrMany::One(ext.to_string()))
    }
}
