use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Object;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Element;

use shuttle_core::{
    EchoSuppressor, Extension, OneOrMany, Position, Result, SetValuePayload, SyncError, TextState,
};

use crate::js::{call, get, global, path};

pub struct CkEditor4 {
    container: Element,
    editor: JsValue,
    echo: EchoSuppressor,
    listener: RefCell<Option<(JsValue, Closure<dyn FnMut(JsValue)>)>>,
}

/// DOM node behind one of CKEditor 4's `CKEDITOR.dom.element` wrappers.
fn dom(editor: &JsValue, key: &str) -> Option<Element> {
    path(editor, &[key, "$"]).and_then(|n| n.dyn_into().ok())
}

fn claims(editor: &JsValue, elem: &Element) -> bool {
    if dom(editor, "element").is_some_and(|e| &e == elem) {
        return true;
    }
    if dom(editor, "container").is_some_and(|c| c.contains(Some(elem.as_ref()))) {
        return true;
    }
    let name = get(editor, "name").and_then(|n| n.as_string());
    name.is_some_and(|name| Some(&name) == elem.get_attribute("name").as_ref() || name == elem.id())
}

impl CkEditor4 {
    pub fn attach(elem: &Element) -> Result<Self> {
        let instances = global("CKEDITOR")
            .and_then(|ck| get(&ck, "instances"))
            .and_then(|i| i.dyn_into::<Object>().ok())
            .ok_or_else(|| SyncError::BridgeUnavailable("CKEDITOR.instances is missing".into()))?;
        let editor = Object::values(&instances)
            .iter()
            .find(|editor| claims(editor, elem))
            .ok_or_else(|| SyncError::BridgeUnavailable("no CKEditor 4 instance owns the target".into()))?;
        let container = dom(&editor, "container").unwrap_or_else(|| elem.clone());
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

    /// CKEditor 4 exposes no usable caret in source terms; the position is
    /// always the start of the document.
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
        let handle = call(
            &self.editor,
            "on",
            &[JsValue::from_str("change"), closure.as_ref().clone()],
        )?;
        *self.listener.borrow_mut() = Some((handle, closure));
        Ok(())
    }

    pub fn unbind(&self) {
        if let Some((handle, _closure)) = self.listener.borrow_mut().take()
            && let Err(e) = call(&handle, "removeListener", &[])
        {
            tracing::warn!("ckeditor4: removing change listener failed: {e}");
        }
    }

    pub fn extension(&self) -> Option<Extension> {
        let markdown = get(&self.editor, "plugins").and_then(|p| get(&p, "markdown"));
        let ext = if markdown.is_some() { "md" } else { "html" };
        Some(OneOrMany::One(ext.to_string()))
    }
}
