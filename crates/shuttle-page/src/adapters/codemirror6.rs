//! CodeMirror 6 has no change event. Its view exposes `dispatch`, which every
//! transaction passes through, so change notification wraps that method on
//! the view instance and compares the document before and after.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function, Object, Reflect};
use serde::Serialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Element;

use shuttle_core::{
    DiffChange, DiffOptions, EchoSuppressor, Extension, OneOrMany, Result, SetValuePayload,
    SyncError, TextState, compute_changes, extension_for,
};

use super::{closest, target_selection};
use crate::js::{call, get, js_err, path, to_js};

type DispatchWrapper = Closure<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>;

struct Patch {
    wrapper: DispatchWrapper,
    /// Own `dispatch` property present before wrapping, if any.
    previous: Option<JsValue>,
}

pub struct CodeMirror6 {
    container: Element,
    content: Element,
    view: JsValue,
    echo: EchoSuppressor,
    patch: RefCell<Option<Patch>>,
}

#[derive(Serialize)]
struct Anchor {
    anchor: usize,
    head: usize,
}

#[derive(Serialize)]
struct Transaction {
    changes: Vec<DiffChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selection: Option<Anchor>,
}

fn doc_of(view: &JsValue) -> Option<JsValue> {
    path(view, &["state", "doc"])
}

impl CodeMirror6 {
    pub fn attach(elem: &Element) -> Result<Self> {
        let container = closest(elem, ".cm-editor")?;
        let content = match container.query_selector(".cm-content") {
            Ok(Some(content)) => content,
            _ => elem.clone(),
        };
        let view = path(&content, &["cmView", "view"])
            .or_else(|| path(&content, &["cmView", "rootView", "view"]))
            .ok_or_else(|| SyncError::BridgeUnavailable("no EditorView on .cm-content".into()))?;
        Ok(Self {
            container,
            content,
            view,
            echo: EchoSuppressor::new(),
            patch: RefCell::new(None),
        })
    }

    pub fn container(&self) -> &Element {
        &self.container
    }

    fn text(&self) -> Result<String> {
        let doc = doc_of(&self.view)
            .ok_or_else(|| SyncError::BridgeUnavailable("view has no state".into()))?;
        Ok(call(&doc, "toString", &[])?.as_string().unwrap_or_default())
    }

    pub fn get_value(&self) -> Result<TextState> {
        let text = self.text()?;
        let head = path(&self.view, &["state", "selection", "main", "head"])
            .and_then(|h| h.as_f64())
            .unwrap_or(0.0) as usize;
        Ok(TextState::new(text).with_caret(head))
    }

    pub fn set_value(&self, payload: &SetValuePayload) -> Result<()> {
        let current = self.text()?;
        let tx = Transaction {
            changes: compute_changes(&current, &payload.text, &DiffOptions::default()),
            selection: target_selection(&payload.text, payload).map(|sel| Anchor {
                anchor: sel.start,
                head: sel.end,
            }),
        };
        if tx.changes.is_empty() && tx.selection.is_none() {
            return Ok(());
        }
        let _token = self.echo.begin();
        call(&self.view, "dispatch", &[to_js(&tx)?])?;
        Ok(())
    }

    pub fn bind_change(&self, notify: Rc<dyn Fn()>) -> Result<()> {
        self.unbind();
        let original: Function = get(&self.view, "dispatch")
            .and_then(|f| f.dyn_into().ok())
            .ok_or_else(|| SyncError::BridgeUnavailable("view.dispatch is missing".into()))?;
        let descriptor =
            Object::get_own_property_descriptor(self.view.unchecked_ref::<Object>(), &"dispatch".into());
        let previous = get(&descriptor, "value");

        let view = self.view.clone();
        let echo = self.echo.clone();
        let wrapper: DispatchWrapper = Closure::new(move |a: JsValue, b: JsValue, c: JsValue| {
            let args: Array = [a, b, c].into_iter().filter(|v| !v.is_undefined()).collect();
            let before = doc_of(&view);
            let result = match Reflect::apply(&original, &view, &args) {
                Ok(result) => result,
                Err(e) => wasm_bindgen::throw_val(e),
            };
            let changed = match (before, doc_of(&view)) {
                (Some(before), Some(after)) => !Object::is(&before, &after),
                _ => false,
            };
            if changed && !echo.is_suppressed() {
                notify();
            }
            result
        });
        Reflect::set(&self.view, &"dispatch".into(), wrapper.as_ref()).map_err(js_err)?;
        *self.patch.borrow_mut() = Some(Patch { wrapper, previous });
        Ok(())
    }

    pub fn unbind(&self) {
        let Some(patch) = self.patch.borrow_mut().take() else {
            return;
        };
        let key = JsValue::from_str("dispatch");
        let restored = match &patch.previous {
            Some(previous) => Reflect::set(&self.view, &key, previous),
            None => Reflect::delete_property(self.view.unchecked_ref::<Object>(), &key),
        };
        if let Err(e) = restored {
            tracing::warn!("codemirror6: restoring dispatch failed: {}", js_err(e));
        }
        drop(patch.wrapper);
    }

    pub fn extension(&self) -> Option<Extension> {
        let lang = self.content.get_attribute("data-language")?;
        extension_for(&lang).map(|e| OneOrMany::One(e.to_string()))
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use std::cell::Cell;

    use wasm_bindgen_test::*;

    use super::*;

    wasm_bindgen_test_configure!(run_in_browser);

    /// An object shaped like an `EditorView`: `state.doc` is replaced by
    /// every transaction that carries changes.
    fn fake_view(text: &str) -> JsValue {
        let make = Function::new_with_args(
            "text",
            r#"
            const doc = (t) => ({ text: t, toString() { return this.text; } });
            return {
                state: { doc: doc(text), selection: { main: { head: 0 } } },
                dispatch(tx) {
                    const changes = [].concat(tx.changes || []);
                    if (changes.length > 0) {
                        let t = this.state.doc.text;
                        for (const c of changes.slice().reverse()) {
                            const to = c.to === undefined ? c.from : c.to;
                            t = t.slice(0, c.from) + (c.insert || "") + t.slice(to);
                        }
                        this.state = { ...this.state, doc: doc(t) };
                    }
                    if (tx.selection) {
                        this.state = { ...this.state, selection: { main: { head: tx.selection.head } } };
                    }
                },
            };
            "#,
        );
        make.call1(&JsValue::NULL, &JsValue::from_str(text)).unwrap()
    }

    fn mount(view: &JsValue) -> Element {
        let document = web_sys::window().unwrap().document().unwrap();
        let container = document.create_element("div").unwrap();
        container.set_class_name("cm-editor");
        container.set_inner_html("<div class=\"cm-content\"></div>");
        document.body().unwrap().append_child(&container).unwrap();
        let content = container.query_selector(".cm-content").unwrap().unwrap();
        let cm_view = Object::new();
        Reflect::set(&cm_view, &"view".into(), view).unwrap();
        Reflect::set(&content, &"cmView".into(), &cm_view).unwrap();
        content
    }

    fn external_edit(view: &JsValue, from: u32, insert: &str) {
        let tx = Object::new();
        let change = Object::new();
        Reflect::set(&change, &"from".into(), &from.into()).unwrap();
        Reflect::set(&change, &"insert".into(), &insert.into()).unwrap();
        Reflect::set(&tx, &"changes".into(), &change).unwrap();
        call(view, "dispatch", &[tx.into()]).unwrap();
    }

    #[wasm_bindgen_test]
    fn test_wrapped_dispatch_reports_edits_but_not_own_writes() {
        let view = fake_view("hello");
        let content = mount(&view);
        let original = get(&view, "dispatch").unwrap();
        let editor = CodeMirror6::attach(&content).unwrap();

        let fired = Rc::new(Cell::new(0));
        {
            let fired = fired.clone();
            editor
                .bind_change(Rc::new(move || fired.set(fired.get() + 1)))
                .unwrap();
        }
        assert!(!Object::is(&get(&view, "dispatch").unwrap(), &original));

        external_edit(&view, 5, "!");
        assert_eq!(fired.get(), 1);
        assert_eq!(editor.get_value().unwrap().text, "hello!");

        // A selection-only transaction leaves the document alone.
        let tx = Object::new();
        let selection = Object::new();
        Reflect::set(&selection, &"anchor".into(), &1.into()).unwrap();
        Reflect::set(&selection, &"head".into(), &1.into()).unwrap();
        Reflect::set(&tx, &"selection".into(), &selection).unwrap();
        call(&view, "dispatch", &[tx.into()]).unwrap();
        assert_eq!(fired.get(), 1);

        editor
            .set_value(&SetValuePayload {
                text: "hello world".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(fired.get(), 1);
        assert_eq!(editor.get_value().unwrap().text, "hello world");

        editor.unbind();
        assert!(Object::is(&get(&view, "dispatch").unwrap(), &original));
        external_edit(&view, 0, ">");
        assert_eq!(fired.get(), 1);
        editor.container().remove();
    }

    #[wasm_bindgen_test]
    fn test_attach_requires_editor_view() {
        let document = web_sys::window().unwrap().document().unwrap();
        let container = document.create_element("div").unwrap();
        container.set_class_name("cm-editor");
        container.set_inner_html("<div class=\"cm-content\"></div>");
        document.body().unwrap().append_child(&container).unwrap();
        let content = container.query_selector(".cm-content").unwrap().unwrap();

        assert!(matches!(
            CodeMirror6::attach(&content),
            Err(SyncError::BridgeUnavailable(_))
        ));
        container.remove();
    }
}
