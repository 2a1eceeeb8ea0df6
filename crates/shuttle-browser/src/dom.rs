//! DOM plumbing: `web_sys` implementations of the core probes, geometry,
//! selectors and JS error conversion.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, Node, ShadowRoot, Window};

use shuttle_core::{ContentNode, ElementProbe, NodeKind, PageRect, Result, SyncError};

/// Convert a thrown JS value into a `SyncError`.
pub fn js_err(err: JsValue) -> SyncError {
    if let Some(e) = err.dyn_ref::<js_sys::Error>() {
        return SyncError::Js(String::from(e.message()));
    }
    SyncError::Js(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

pub fn window() -> Result<Window> {
    web_sys::window().ok_or(SyncError::Js("no window".into()))
}

pub fn document() -> Result<Document> {
    window()?
        .document()
        .ok_or(SyncError::Js("no document".into()))
}

pub fn random_uuid() -> Result<String> {
    Ok(window()?.crypto().map_err(js_err)?.random_uuid())
}

/// Viewport size of the window owning `elem`.
pub fn viewport(window: &Window) -> (f64, f64) {
    let width = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    let height = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    (width, height)
}

/// Bounding box of `elem` relative to the viewport.
pub fn client_rect(elem: &Element) -> PageRect {
    let r = elem.get_bounding_client_rect();
    PageRect::new(r.x(), r.y(), r.width(), r.height())
}

/// Bounding box of `elem` in top-level page coordinates.
///
/// Offsets of enclosing frames are added while they are reachable; a
/// cross-origin parent stops the walk.
pub fn page_rect(elem: &Element) -> PageRect {
    let mut rect = client_rect(elem);
    let mut win = elem.owner_document().and_then(|d| d.default_view());
    while let Some(w) = win {
        let Ok(Some(frame)) = w.frame_element() else {
            break;
        };
        let outer = frame.get_bounding_client_rect();
        rect = rect.translate(outer.x(), outer.y());
        win = frame.owner_document().and_then(|d| d.default_view());
    }
    rect
}

/// A CSS selector resolving `elem` from its tree scope.
///
/// Inside a shadow tree the path stops at the shadow root; pair it with
/// `shadow_hosts` to reach the element from the document.
pub fn unique_selector(elem: &Element) -> String {
    let id = elem.id();
    if !id.is_empty() {
        return format!("[id=\"{}\"]", id.replace('\\', "\\\\").replace('"', "\\\""));
    }

    let mut parts = Vec::new();
    let mut current = Some(elem.clone());
    while let Some(node) = current {
        let tag = node.tag_name().to_lowercase();
        if tag == "html" {
            parts.push(tag);
            break;
        }
        let mut index = 1;
        let mut sibling = node.previous_element_sibling();
        while let Some(prev) = sibling {
            index += 1;
            sibling = prev.previous_element_sibling();
        }
        parts.push(format!("{tag}:nth-child({index})"));
        current = node.parent_element();
    }
    parts.reverse();
    parts.join(" > ")
}

/// Selectors of the shadow hosts enclosing `elem`, outermost first.
pub fn shadow_hosts(elem: &Element) -> Vec<String> {
    let mut hosts = Vec::new();
    let mut node = elem.clone();
    while let Ok(root) = node.get_root_node().dyn_into::<ShadowRoot>() {
        let host = root.host();
        hosts.push(unique_selector(&host));
        node = host;
    }
    hosts.reverse();
    hosts
}

/// Parent element, crossing out of a shadow root to its host.
pub fn parent_or_host(elem: &Element) -> Option<Element> {
    elem.parent_element().or_else(|| {
        elem.parent_node()
            .and_then(|n| n.dyn_into::<ShadowRoot>().ok())
            .map(|root| root.host())
    })
}

/// `ElementProbe` over a live element.
#[derive(Clone, Debug, PartialEq)]
pub struct DomElement(pub Element);

impl ElementProbe for DomElement {
    fn tag_name(&self) -> String {
        self.0.tag_name().to_uppercase()
    }

    fn has_class(&self, class: &str) -> bool {
        self.0.class_list().contains(class)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.0.get_attribute(name)
    }

    fn is_content_editable(&self) -> bool {
        self.0
            .dyn_ref::<HtmlElement>()
            .is_some_and(|e| e.is_content_editable())
    }

    fn parent(&self) -> Option<Self> {
        parent_or_host(&self.0).map(DomElement)
    }
}

/// `ContentNode` over a live node.
#[derive(Clone, Debug)]
pub struct DomNode(pub Node);

impl ContentNode for DomNode {
    fn kind(&self) -> NodeKind {
        match self.0.node_type() {
            Node::TEXT_NODE => NodeKind::Text(self.0.text_content().unwrap_or_default()),
            Node::ELEMENT_NODE => match self.0.dyn_ref::<Element>() {
                Some(e) => NodeKind::Element(e.tag_name().to_uppercase()),
                None => NodeKind::Other,
            },
            _ => NodeKind::Other,
        }
    }

    fn children(&self) -> Vec<Self> {
        let list = self.0.child_nodes();
        (0..list.length())
            .filter_map(|i| list.get(i))
            .map(DomNode)
            .collect()
    }

    fn outer_html(&self) -> String {
        self.0
            .dyn_ref::<Element>()
            .map(|e| e.outer_html())
            .unwrap_or_default()
    }
}
