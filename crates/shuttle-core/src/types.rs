//! Core sync types: text state, positions, selections, and page geometry.
//!
//! These mirror the JSON shapes exchanged with the injected script and the
//! external process, so every struct serializes with camelCase field names.

use serde::{Deserialize, Serialize};

use crate::text::position_at;

/// A value that may be sent as a single item or a list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Iterate over every item regardless of shape.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
            OneOrMany::Many(items) => items.iter(),
        }
    }

    pub fn first(&self) -> Option<&T> {
        self.iter().next()
    }
}

/// File-type hint for the external editor (`"js"` or `["md", "markdown"]`).
pub type Extension = OneOrMany<String>;

/// 1-based line and column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub line_number: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line_number: u32, column: u32) -> Self {
        Self {
            line_number: line_number.max(1),
            column: column.max(1),
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Selected range as 0-based UTF-16 offsets, `start <= end`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionRange {
    pub start: usize,
    pub end: usize,
}

impl SelectionRange {
    /// Create a range, ordering the bounds.
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn caret(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn is_caret(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.is_caret()
    }
}

/// Full text plus cursor, as reported by `getValue`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextState {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selections: Option<Vec<SelectionRange>>,
}

impl TextState {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Attach a cursor computed from a UTF-16 caret offset into `text`.
    pub fn with_caret(mut self, offset: usize) -> Self {
        let pos = position_at(&self.text, offset);
        self.line_number = Some(pos.line_number);
        self.column = Some(pos.column);
        self
    }

    pub fn with_position(mut self, pos: Position) -> Self {
        self.line_number = Some(pos.line_number);
        self.column = Some(pos.column);
        self
    }

    pub fn with_selections(mut self, selections: Vec<SelectionRange>) -> Self {
        self.selections = Some(selections);
        self
    }

    /// Cursor position, if both halves are known.
    pub fn position(&self) -> Option<Position> {
        match (self.line_number, self.column) {
            (Some(line), Some(column)) => Some(Position::new(line, column)),
            _ => None,
        }
    }
}

/// Bounding box in page coordinates, adjusted for the containing frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl PageRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            top: y,
            right: x + width,
            bottom: y + height,
            left: x,
        }
    }

    /// Shift by a frame offset.
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Whether any part of the rect overlaps a `width` x `height` viewport.
    pub fn intersects_viewport(&self, width: f64, height: f64) -> bool {
        self.width > 0.0
            && self.height > 0.0
            && self.right > 0.0
            && self.bottom > 0.0
            && self.left < width
            && self.top < height
    }
}

/// Initial state reported by `load()`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedState {
    #[serde(flatten)]
    pub state: TextState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<Extension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<PageRect>,
}

/// Options accepted by `setValue`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetValueOptions {
    pub position: Option<Position>,
    pub selections: Option<Vec<SelectionRange>>,
    /// Whether to dispatch a synthetic `input` event after writing.
    pub trigger_dom_event: bool,
}

impl Default for SetValueOptions {
    fn default() -> Self {
        Self {
            position: None,
            selections: None,
            trigger_dom_event: true,
        }
    }
}

impl SetValueOptions {
    /// Options carried by an incoming text state.
    pub fn from_state(state: &TextState) -> Self {
        Self {
            position: state.position(),
            selections: state.selections.clone(),
            trigger_dom_event: true,
        }
    }
}
