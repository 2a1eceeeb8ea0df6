//! Enumerate visible, editable elements, including inside open shadow roots.

use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, HtmlInputElement, HtmlTextAreaElement, Node};

use shuttle_core::{HandlerKind, select_handler};

use crate::dom::{DomElement, client_rect, viewport};

/// Anything some handler might claim.
const CANDIDATE_SELECTOR: &str = "textarea, input, [contenteditable], [role=textbox], \
     .ace_editor, .CodeMirror, .cm-content, .monaco-editor, .cke_editable, .ck-editor__editable";

/// An element offered to the user, with the widget outline to highlight.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub elem: Element,
    pub kind: HandlerKind,
    pub area: Element,
}

fn query_deep(root: &Node, out: &mut Vec<Element>) {
    let list = if let Some(doc) = root.dyn_ref::<Document>() {
        doc.query_selector_all("*")
    } else if let Some(fragment) = root.dyn_ref::<web_sys::DocumentFragment>() {
        fragment.query_selector_all("*")
    } else {
        return;
    };
    let Ok(list) = list else {
        return;
    };
    for i in 0..list.length() {
        let Some(elem) = list.get(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
            continue;
        };
        if elem.matches(CANDIDATE_SELECTOR).unwrap_or(false) {
            out.push(elem.clone());
        }
        if let Some(shadow) = elem.shadow_root() {
            query_deep(&shadow.into(), out);
        }
    }
}

fn is_usable(elem: &Element) -> bool {
    if elem.has_attribute("hidden") {
        return false;
    }
    if let Some(area) = elem.dyn_ref::<HtmlTextAreaElement>() {
        return !area.disabled() && !area.read_only();
    }
    if let Some(input) = elem.dyn_ref::<HtmlInputElement>() {
        return !input.disabled() && !input.read_only();
    }
    elem.dyn_ref::<HtmlElement>().is_none_or(|e| !e.hidden())
}

/// Visible candidates in document order, one per widget.
pub fn candidates(document: &Document) -> Vec<Candidate> {
    let Some(window) = document.default_view() else {
        return Vec::new();
    };
    let (width, height) = viewport(&window);

    let mut found = Vec::new();
    query_deep(&document.clone().into(), &mut found);

    let mut out: Vec<Candidate> = Vec::new();
    for elem in found {
        if !is_usable(&elem) {
            continue;
        }
        let probe = DomElement(elem.clone());
        let Ok(kind) = select_handler(&probe) else {
            continue;
        };
        let area = kind.hint_area(&probe).map_or_else(|| elem.clone(), |DomElement(e)| e);
        if !client_rect(&area).intersects_viewport(width, height) {
            continue;
        }
        // Several inner nodes of one widget collapse to its first match.
        if out.iter().any(|c| c.area == area) {
            continue;
        }
        out.push(Candidate { elem, kind, area });
    }
    tracing::debug!(count = out.len(), "discovered candidates");
    out
}
