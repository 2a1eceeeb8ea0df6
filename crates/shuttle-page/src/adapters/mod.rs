//! In-page adapters, one per editor family.
//!
//! Each adapter holds a live reference to the native editor object and
//! translates between its API and the uniform text model. Writes run under
//! an `OriginToken` so the native change event they trigger is not reported
//! back as a user edit.

mod ace;
mod ckeditor4;
mod ckeditor5;
mod codemirror5;
mod codemirror6;
mod monaco;

use std::rc::Rc;

use web_sys::Element;

use shuttle_core::{
    Extension, HandlerKind, PageRect, Result, SelectionRange, SetValuePayload, SyncError,
    TextState, clamp_selection, offset_at, utf16_len,
};

pub use ace::Ace;
pub use ckeditor4::CkEditor4;
pub use ckeditor5::CkEditor5;
pub use codemirror5::CodeMirror5;
pub use codemirror6::CodeMirror6;
pub use monaco::{Monaco, MonacoStrategy};

use crate::js::page_rect;

/// Selection a `setValue` asks for, clamped to the new text.
pub(crate) fn target_selection(text: &str, payload: &SetValuePayload) -> Option<SelectionRange> {
    if let Some(sel) = payload.selections.as_ref().and_then(|s| s.first()) {
        return Some(clamp_selection(*sel, utf16_len(text)));
    }
    payload
        .position()
        .map(|pos| SelectionRange::caret(offset_at(text, pos)))
}

/// Nearest ancestor-or-self of `elem` matching `selector`.
pub(crate) fn closest(elem: &Element, selector: &str) -> Result<Element> {
    elem.closest(selector)
        .ok()
        .flatten()
        .ok_or_else(|| SyncError::BridgeUnavailable(format!("no {selector} around target")))
}

pub enum Adapter {
    Ace(Ace),
    CodeMirror5(CodeMirror5),
    CodeMirror6(CodeMirror6),
    Monaco(Monaco),
    CkEditor4(CkEditor4),
    CkEditor5(CkEditor5),
}

impl Adapter {
    pub fn attach(kind: HandlerKind, elem: &Element) -> Result<Self> {
        Ok(match kind {
            HandlerKind::Ace => Adapter::Ace(Ace::attach(elem)?),
            HandlerKind::CodeMirror5 => Adapter::CodeMirror5(CodeMirror5::attach(elem)?),
            HandlerKind::CodeMirror6 => Adapter::CodeMirror6(CodeMirror6::attach(elem)?),
            HandlerKind::Monaco => Adapter::Monaco(Monaco::attach(elem)?),
            HandlerKind::CkEditor4 => Adapter::CkEditor4(CkEditor4::attach(elem)?),
            HandlerKind::CkEditor5 => Adapter::CkEditor5(CkEditor5::attach(elem)?),
            HandlerKind::ContentEditable | HandlerKind::Textarea => {
                return Err(SyncError::Protocol(format!("{kind} is not an injected handler")));
            }
        })
    }

    pub fn get_value(&self) -> Result<TextState> {
        match self {
            Adapter::Ace(a) => a.get_value(),
            Adapter::CodeMirror5(a) => a.get_value(),
            Adapter::CodeMirror6(a) => a.get_value(),
            Adapter::Monaco(a) => a.get_value(),
            Adapter::CkEditor4(a) => a.get_value(),
            Adapter::CkEditor5(a) => a.get_value(),
        }
    }

    pub fn set_value(&self, payload: &SetValuePayload) -> Result<()> {
        match self {
            Adapter::Ace(a) => a.set_value(payload),
            Adapter::CodeMirror5(a) => a.set_value(payload),
            Adapter::CodeMirror6(a) => a.set_value(payload),
            Adapter::Monaco(a) => a.set_value(payload),
            Adapter::CkEditor4(a) => a.set_value(payload),
            Adapter::CkEditor5(a) => a.set_value(payload),
        }
    }

    pub fn bind_change(&self, notify: Rc<dyn Fn()>) -> Result<()> {
        match self {
            Adapter::Ace(a) => a.bind_change(notify),
            Adapter::CodeMirror5(a) => a.bind_change(notify),
            Adapter::CodeMirror6(a) => a.bind_change(notify),
            Adapter::Monaco(a) => a.bind_change(notify),
            Adapter::CkEditor4(a) => a.bind_change(notify),
            Adapter::CkEditor5(a) => a.bind_change(notify),
        }
    }

    /// Release every native hook installed by `bind_change`.
    pub fn unbind(&self) {
        match self {
            Adapter::Ace(a) => a.unbind(),
            Adapter::CodeMirror5(a) => a.unbind(),
            Adapter::CodeMirror6(a) => a.unbind(),
            Adapter::Monaco(a) => a.unbind(),
            Adapter::CkEditor4(a) => a.unbind(),
            Adapter::CkEditor5(a) => a.unbind(),
        }
    }

    pub async fn extension(&self) -> Option<Extension> {
        match self {
            Adapter::Ace(a) => a.extension().await,
            Adapter::CodeMirror5(a) => a.extension(),
            Adapter::CodeMirror6(a) => a.extension(),
            Adapter::Monaco(a) => a.extension(),
            Adapter::CkEditor4(a) => a.extension(),
            Adapter::CkEditor5(a) => a.extension(),
        }
    }

    fn container(&self) -> &Element {
        match self {
            Adapter::Ace(a) => a.container(),
            Adapter::CodeMirror5(a) => a.container(),
            Adapter::CodeMirror6(a) => a.container(),
            Adapter::Monaco(a) => a.container(),
            Adapter::CkEditor4(a) => a.container(),
            Adapter::CkEditor5(a) => a.container(),
        }
    }

    pub fn rect(&self) -> PageRect {
        page_rect(self.container())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shuttle_core::Position;

    #[test]
    fn test_selection_wins_over_position() {
        let payload = SetValuePayload {
            text: "hello".into(),
            line_number: Some(1),
            column: Some(2),
            selections: Some(vec![SelectionRange::new(4, 99)]),
        };
        assert_eq!(
            target_selection("hello", &payload),
            Some(SelectionRange::new(4, 5))
        );
    }

    #[test]
    fn test_position_becomes_caret() {
        let payload = SetValuePayload {
            text: "a\nbc".into(),
            line_number: Some(2),
            column: Some(2),
            selections: None,
        };
        assert_eq!(
            target_selection("a\nbc", &payload),
            Some(SelectionRange::caret(3))
        );
        assert_eq!(payload.position(), Some(Position::new(2, 2)));
        assert_eq!(target_selection("a", &SetValuePayload::default()), None);
    }
}
