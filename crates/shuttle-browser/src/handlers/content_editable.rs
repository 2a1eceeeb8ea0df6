//! `contenteditable` regions.
//!
//! Text is serialized with `shuttle_core::extract_text`; writing re-renders
//! the region as one `<div>` per line. The caret is measured by serializing
//! everything between the region start and the selection focus, so it uses
//! the same line structure as the text itself.

use wasm_bindgen::JsCast;
use web_sys::{Element, Text};

use shuttle_core::{
    LoadedState, Position, Result, SetValueOptions, TextState, extract_text, render_html,
    utf16_len,
};

use super::base::{ChangeCallback, HandlerBase};
use crate::dom::{self, DomNode, js_err, page_rect};

pub struct ContentEditableHandler {
    base: HandlerBase,
}

impl ContentEditableHandler {
    pub fn new(elem: Element) -> Self {
        Self {
            base: HandlerBase::new(elem),
        }
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

    pub fn get_value(&self) -> TextState {
        let elem = self.base.elem();
        let text = extract_text(&DomNode(elem.clone().into()));
        let caret = self.caret_offset().unwrap_or(0).min(utf16_len(&text));
        TextState::new(text).with_caret(caret)
    }

    /// UTF-16 offset of the selection focus within the serialized text.
    fn caret_offset(&self) -> Option<usize> {
        let elem = self.base.elem();
        let window = dom::window().ok()?;
        let document = window.document()?;
        let selection = window.get_selection().ok()??;
        if selection.range_count() == 0 {
            return None;
        }
        let focus = selection.focus_node()?;
        if !elem.contains(Some(&focus)) {
            return None;
        }
        let range = document.create_range().ok()?;
        range.select_node_contents(elem).ok()?;
        range.set_end(&focus, selection.focus_offset()).ok()?;
        let fragment = range.clone_contents().ok()?;
        // A `<br>` the range cut off before its line is a line break, not
        // the trailing placeholder `extract_text` drops.
        let cut_break = fragment.last_child().is_some_and(|n| n.node_name() == "BR");
        let before = utf16_len(&extract_text(&DomNode(fragment.into())));
        Some(before + usize::from(cut_break))
    }

    pub fn set_value(&self, text: &str, opts: &SetValueOptions) -> Result<()> {
        let _origin = self.base.echo().begin();
        self.base.elem().set_inner_html(&render_html(text));
        if let Some(pos) = opts.position {
            if let Err(e) = self.place_caret(pos) {
                tracing::warn!("could not place caret: {e}");
            }
        }
        self.base.emit_value_set(opts);
        self.base.dispatch_input(opts)
    }

    /// Put a collapsed selection at `pos`, clamped to the rendered lines.
    fn place_caret(&self, pos: Position) -> Result<()> {
        let elem = self.base.elem();
        let lines = elem.children();
        if lines.length() == 0 {
            return Ok(());
        }
        let index = (pos.line_number - 1).min(lines.length() - 1);
        let Some(line) = lines.item(index) else {
            return Ok(());
        };

        let window = dom::window()?;
        let document = dom::document()?;
        let range = document.create_range().map_err(js_err)?;
        match line.first_child().and_then(|n| n.dyn_into::<Text>().ok()) {
            Some(text) => {
                // Columns count UTF-16 units, as does the DOM.
                let offset = (pos.column - 1).min(text.length());
                range.set_start(&text, offset).map_err(js_err)?;
            }
            None => range.set_start(&line, 0).map_err(js_err)?,
        }
        range.collapse_with_to_start(true);

        if let Some(selection) = window.get_selection().map_err(js_err)? {
            selection.remove_all_ranges().map_err(js_err)?;
            selection.add_range(&range).map_err(js_err)?;
        }
        Ok(())
    }

    pub fn bind_change(&self, callback: ChangeCallback) {
        self.base.bind_native(callback, &["keyup", "change"]);
    }

    pub fn unbind_change(&self, callback: &ChangeCallback) {
        self.base.unbind_native(callback);
    }
}
