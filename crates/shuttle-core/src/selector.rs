//! Handler selection.
//!
//! Each editor family is identified by CSS class (or attribute) markers on
//! the element or one of its ancestors. Kinds are tried in a fixed priority
//! order so a specific adapter beats a generic one: a CodeMirror 5 hidden
//! `<textarea>` is claimed by CodeMirror 5, not by the plain-field handler.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Read-only view of a DOM element, enough to decide which handler fits.
pub trait ElementProbe: Sized {
    /// Uppercase tag name.
    fn tag_name(&self) -> String;
    fn has_class(&self, class: &str) -> bool;
    fn attribute(&self, name: &str) -> Option<String>;
    fn is_content_editable(&self) -> bool;
    fn parent(&self) -> Option<Self>;
}

/// Nearest of `elem` and its ancestors satisfying `pred`.
pub fn closest<P: ElementProbe + Clone>(elem: &P, pred: impl Fn(&P) -> bool) -> Option<P> {
    let mut current = Some(elem.clone());
    while let Some(node) = current {
        if pred(&node) {
            return Some(node);
        }
        current = node.parent();
    }
    None
}

const TEXT_INPUT_TYPES: &[&str] = &["", "text", "search", "url", "email", "tel"];

/// Editor families with a dedicated handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlerKind {
    Ace,
    CodeMirror5,
    CodeMirror6,
    Monaco,
    CkEditor4,
    CkEditor5,
    ContentEditable,
    Textarea,
}

impl HandlerKind {
    /// Selection order, most specific first.
    pub const PRIORITY: [HandlerKind; 8] = [
        HandlerKind::Ace,
        HandlerKind::CodeMirror5,
        HandlerKind::CodeMirror6,
        HandlerKind::Monaco,
        HandlerKind::CkEditor4,
        HandlerKind::CkEditor5,
        HandlerKind::ContentEditable,
        HandlerKind::Textarea,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HandlerKind::Ace => "AceEditor",
            HandlerKind::CodeMirror5 => "CodeMirror5",
            HandlerKind::CodeMirror6 => "CodeMirror6",
            HandlerKind::Monaco => "MonacoEditor",
            HandlerKind::CkEditor4 => "CKEditor4",
            HandlerKind::CkEditor5 => "CKEditor5",
            HandlerKind::ContentEditable => "ContentEditable",
            HandlerKind::Textarea => "Textarea",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|k| k.name() == name)
    }

    /// Whether the handler must talk to an injected page script.
    pub fn is_injected(self) -> bool {
        !matches!(self, HandlerKind::ContentEditable | HandlerKind::Textarea)
    }

    /// Class marking an element that belongs to this editor.
    fn marker_class(self) -> &'static [&'static str] {
        match self {
            HandlerKind::Ace => &["ace_editor"],
            HandlerKind::CodeMirror5 => &["CodeMirror"],
            HandlerKind::CodeMirror6 => &["cm-editor", "cm-content"],
            HandlerKind::Monaco => &["monaco-editor"],
            HandlerKind::CkEditor4 => &["cke", "cke_editable"],
            HandlerKind::CkEditor5 => &["ck-editor__editable", "ck-editor"],
            HandlerKind::ContentEditable | HandlerKind::Textarea => &[],
        }
    }

    /// Class of the visual container highlighted by the hint overlay.
    fn container_class(self) -> Option<&'static str> {
        match self {
            HandlerKind::Ace => Some("ace_editor"),
            HandlerKind::CodeMirror5 => Some("CodeMirror"),
            HandlerKind::CodeMirror6 => Some("cm-editor"),
            HandlerKind::Monaco => Some("monaco-editor"),
            HandlerKind::CkEditor4 => Some("cke"),
            HandlerKind::CkEditor5 => Some("ck-editor"),
            HandlerKind::ContentEditable | HandlerKind::Textarea => None,
        }
    }

    fn matches_self<P: ElementProbe>(self, elem: &P) -> bool {
        match self {
            HandlerKind::Textarea => {
                let tag = elem.tag_name();
                tag == "TEXTAREA"
                    || (tag == "INPUT"
                        && TEXT_INPUT_TYPES.contains(
                            &elem
                                .attribute("type")
                                .unwrap_or_default()
                                .to_ascii_lowercase()
                                .as_str(),
                        ))
            }
            HandlerKind::ContentEditable => {
                elem.is_content_editable() || elem.attribute("role").as_deref() == Some("textbox")
            }
            HandlerKind::Monaco => {
                self.marker_class().iter().any(|c| elem.has_class(c))
                    || elem.attribute("data-mode-id").is_some()
            }
            _ => self.marker_class().iter().any(|c| elem.has_class(c)),
        }
    }

    /// Whether this handler can drive `elem`.
    pub fn can_handle<P: ElementProbe + Clone>(self, elem: &P) -> bool {
        match self {
            HandlerKind::ContentEditable | HandlerKind::Textarea => self.matches_self(elem),
            _ => closest(elem, |e| self.matches_self(e)).is_some(),
        }
    }

    /// The element to highlight when offering `elem` in the hint overlay.
    pub fn hint_area<P: ElementProbe + Clone>(self, elem: &P) -> Option<P> {
        match self.container_class() {
            Some(class) => {
                closest(elem, |e| e.has_class(class)).or_else(|| closest(elem, |e| self.matches_self(e)))
            }
            None => Some(elem.clone()),
        }
    }
}

impl std::fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// First handler in priority order that claims `elem`.
pub fn select_handler<P: ElementProbe + Clone>(elem: &P) -> Result<HandlerKind> {
    HandlerKind::PRIORITY
        .into_iter()
        .find(|kind| kind.can_handle(elem))
        .ok_or_else(|| SyncError::NoHandler {
            tag: elem.tag_name().to_lowercase(),
        })
}

/// Hint area of `elem` under whichever handler claims it.
pub fn hint_area<P: ElementProbe + Clone>(elem: &P) -> Option<P> {
    select_handler(elem).ok()?.hint_area(elem)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::rc::Rc;

    use super::*;

    #[derive(Debug, Default)]
    struct Node {
        tag: String,
        classes: Vec<String>,
        attrs: HashMap<String, String>,
        editable: bool,
        parent: Option<FakeElement>,
    }

    #[derive(Clone, Debug)]
    struct FakeElement(Rc<Node>);

    impl FakeElement {
        fn new(tag: &str, classes: &[&str], parent: Option<&FakeElement>) -> Self {
            Self(Rc::new(Node {
                tag: tag.to_uppercase(),
                classes: classes.iter().map(|c| c.to_string()).collect(),
                parent: parent.cloned(),
                ..Default::default()
            }))
        }

        fn with(tag: &str, attrs: &[(&str, &str)], editable: bool) -> Self {
            Self(Rc::new(Node {
                tag: tag.to_uppercase(),
                attrs: attrs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                editable,
                ..Default::default()
            }))
        }
    }

    impl ElementProbe for FakeElement {
        fn tag_name(&self) -> String {
            self.0.tag.clone()
        }
        fn has_class(&self, class: &str) -> bool {
            self.0.classes.iter().any(|c| c == class)
        }
        fn attribute(&self, name: &str) -> Option<String> {
            self.0.attrs.get(name).cloned()
        }
        fn is_content_editable(&self) -> bool {
            self.0.editable
        }
        fn parent(&self) -> Option<Self> {
            self.0.parent.clone()
        }
    }

    #[test]
    fn test_plain_textarea() {
        let elem = FakeElement::new("textarea", &[], None);
        assert_eq!(select_handler(&elem).unwrap(), HandlerKind::Textarea);
    }

    #[test]
    fn test_codemirror5_textarea_prefers_rich_editor() {
        let root = FakeElement::new("div", &["CodeMirror", "cm-s-default"], None);
        let wrapper = FakeElement::new("div", &[], Some(&root));
        let hidden = FakeElement::new("textarea", &[], Some(&wrapper));
        assert!(HandlerKind::Textarea.can_handle(&hidden));
        assert_eq!(select_handler(&hidden).unwrap(), HandlerKind::CodeMirror5);

        let area = HandlerKind::CodeMirror5.hint_area(&hidden).unwrap();
        assert!(area.has_class("CodeMirror"));
    }

    #[test]
    fn test_ckeditor5_beats_content_editable() {
        let editable = Rc::new(Node {
            tag: "DIV".into(),
            classes: vec!["ck-editor__editable".into()],
            editable: true,
            ..Default::default()
        });
        let elem = FakeElement(editable);
        assert_eq!(select_handler(&elem).unwrap(), HandlerKind::CkEditor5);
        // No outer `.ck-editor` container: the editable itself is highlighted.
        assert!(HandlerKind::CkEditor5.hint_area(&elem).is_some());
    }

    #[test]
    fn test_monaco_attribute_marker() {
        let container = FakeElement::with("div", &[("data-mode-id", "rust")], false);
        assert_eq!(select_handler(&container).unwrap(), HandlerKind::Monaco);
    }

    #[test]
    fn test_content_editable_and_role() {
        let editable = FakeElement::with("div", &[], true);
        assert_eq!(select_handler(&editable).unwrap(), HandlerKind::ContentEditable);
        let textbox = FakeElement::with("div", &[("role", "textbox")], false);
        assert_eq!(select_handler(&textbox).unwrap(), HandlerKind::ContentEditable);
    }

    #[test]
    fn test_input_types() {
        let text = FakeElement::with("input", &[("type", "TEXT")], false);
        assert_eq!(select_handler(&text).unwrap(), HandlerKind::Textarea);
        let untyped = FakeElement::with("input", &[], false);
        assert_eq!(select_handler(&untyped).unwrap(), HandlerKind::Textarea);
        let checkbox = FakeElement::with("input", &[("type", "checkbox")], false);
        assert!(matches!(
            select_handler(&checkbox),
            Err(SyncError::NoHandler { tag }) if tag == "input"
        ));
    }

    #[test]
    fn test_names_roundtrip() {
        for kind in HandlerKind::PRIORITY {
            assert_eq!(HandlerKind::from_name(kind.name()), Some(kind));
        }
        assert!(!HandlerKind::Textarea.is_injected());
        assert!(HandlerKind::Monaco.is_injected());
    }
}
