//! Plain `<textarea>` / `<input>` fields.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlInputElement, HtmlTextAreaElement};

use shuttle_core::{
    LoadedState, Result, SelectionRange, SetValueOptions, SyncError, TextState, clamp_selection,
    offset_at, utf16_len,
};

use super::base::{ChangeCallback, HandlerBase};
use crate::dom::page_rect;

enum Field {
    Area(HtmlTextAreaElement),
    Input(HtmlInputElement),
}

impl Field {
    fn value(&self) -> String {
        match self {
            Field::Area(e) => e.value(),
            Field::Input(e) => e.value(),
        }
    }

    fn set_value(&self, value: &str) {
        match self {
            Field::Area(e) => e.set_value(value),
            Field::Input(e) => e.set_value(value),
        }
    }

    fn selection(&self) -> Option<(u32, u32)> {
        let (start, end) = match self {
            Field::Area(e) => (e.selection_start(), e.selection_end()),
            Field::Input(e) => (e.selection_start(), e.selection_end()),
        };
        Some((start.ok()??, end.ok()??))
    }

    fn set_selection(&self, start: u32, end: u32) -> std::result::Result<(), JsValue> {
        match self {
            Field::Area(e) => e.set_selection_range(start, end),
            Field::Input(e) => e.set_selection_range(start, end),
        }
    }
}

pub struct TextareaHandler {
    base: HandlerBase,
    field: Field,
}

impl TextareaHandler {
    pub fn new(elem: Element) -> Result<Self> {
        let field = match elem.clone().dyn_into::<HtmlTextAreaElement>() {
            Ok(area) => Field::Area(area),
            Err(elem) => match elem.dyn_into::<HtmlInputElement>() {
                Ok(input) => Field::Input(input),
                Err(elem) => {
                    return Err(SyncError::NoHandler {
                        tag: elem.tag_name().to_lowercase(),
                    });
                }
            },
        };
        Ok(Self {
            base: HandlerBase::new(elem),
            field,
        })
    }

    pub fn base(&self) -> &HandlerBase {
        &self.base
    }

    pub fn load(&self) -> Result<LoadedState> {
        Ok(LoadedState {
            state: self.get_value(),
            extension: None,
            rect: Some(page_rect(self.base.elem())),
        })
    }

    /// Current text with the caret at the start of the selection.
    pub fn get_value(&self) -> TextState {
        let text = self.field.value();
        let len = utf16_len(&text);
        let selection = self
            .field
            .selection()
            .map(|(start, end)| clamp_selection(SelectionRange::new(start as usize, end as usize), len));
        let mut state = TextState::new(text);
        match selection {
            Some(sel) if sel.is_caret() => state = state.with_caret(sel.start),
            Some(sel) => state = state.with_caret(sel.start).with_selections(vec![sel]),
            None => state = state.with_caret(0),
        }
        state
    }

    pub fn set_value(&self, text: &str, opts: &SetValueOptions) -> Result<()> {
        let _origin = self.base.echo().begin();
        self.field.set_value(text);

        let len = utf16_len(text);
        let target = match (&opts.selections, opts.position) {
            (Some(selections), _) if !selections.is_empty() => {
                Some(clamp_selection(selections[0], len))
            }
            (_, Some(pos)) => Some(SelectionRange::caret(offset_at(text, pos))),
            _ => None,
        };
        if let Some(sel) = target {
            if let Err(e) = self.field.set_selection(sel.start as u32, sel.end as u32) {
                tracing::warn!("could not place caret: {e:?}");
            }
        }

        self.base.emit_value_set(opts);
        self.base.dispatch_input(opts)
    }

    pub fn bind_change(&self, callback: ChangeCallback) {
        self.base.bind_native(callback, &["keyup", "change"]);
    }

    pub fn unbind_change(&self, callback: &ChangeCallback) {
        self.base.unbind_native(callback);
    }
}
