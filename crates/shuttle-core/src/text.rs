//! Offset and position helpers.
//!
//! All offsets are UTF-16 code units, matching JavaScript string indices.
//! Positions are 1-based line/column, where the column is also counted in
//! UTF-16 units.

use crate::types::{Position, SelectionRange};

/// Length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Byte index of a UTF-16 offset, clamped to the end of `text`.
///
/// An offset that falls inside a surrogate pair resolves to the start of that
/// character.
pub fn utf16_to_byte(text: &str, offset: usize) -> usize {
    let mut units = 0;
    for (byte, ch) in text.char_indices() {
        if units >= offset {
            return byte;
        }
        units += ch.len_utf16();
        if units > offset {
            return byte;
        }
    }
    text.len()
}

/// Line/column of a caret offset.
///
/// The line is one more than the number of newlines before the caret; the
/// column is the distance from the last newline before the caret.
pub fn position_at(text: &str, offset: usize) -> Position {
    let before = &text[..utf16_to_byte(text, offset)];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(nl) => utf16_len(&before[nl + 1..]) + 1,
        None => utf16_len(before) + 1,
    };
    Position::new(line as u32, column as u32)
}

/// UTF-16 offset of a position.
///
/// Lines past the end clamp to the last line; columns past the end of a line
/// clamp to the line end.
pub fn offset_at(text: &str, pos: Position) -> usize {
    let target_line = pos.line_number.max(1) as usize;
    let mut offset = 0;
    let mut lines = text.split('\n').peekable();
    let mut line_no = 1;
    while let Some(line) = lines.next() {
        let len = utf16_len(line);
        if line_no == target_line || lines.peek().is_none() {
            let column = (pos.column.max(1) as usize - 1).min(len);
            return offset + column;
        }
        offset += len + 1;
        line_no += 1;
    }
    offset
}

/// Clamp a selection into `0..=len`.
pub fn clamp_selection(sel: SelectionRange, len: usize) -> SelectionRange {
    SelectionRange::new(sel.start.min(len), sel.end.min(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_after_first_line() {
        let pos = position_at("line1\nline2", 5);
        assert_eq!(pos, Position::new(1, 6));
    }

    #[test]
    fn test_position_start_of_second_line() {
        assert_eq!(position_at("line1\nline2", 6), Position::new(2, 1));
        assert_eq!(position_at("line1\nline2", 8), Position::new(2, 3));
    }

    #[test]
    fn test_position_counts_utf16_units() {
        // U+1F600 is two UTF-16 units.
        assert_eq!(position_at("😀x", 2), Position::new(1, 3));
        assert_eq!(utf16_len("😀x"), 3);
    }

    #[test]
    fn test_position_clamps_past_end() {
        assert_eq!(position_at("ab", 99), Position::new(1, 3));
    }

    #[test]
    fn test_offset_roundtrip() {
        let text = "alpha\nbeta\n\ngamma";
        for offset in 0..=utf16_len(text) {
            assert_eq!(offset_at(text, position_at(text, offset)), offset);
        }
    }

    #[test]
    fn test_offset_clamps() {
        let text = "ab\ncd";
        assert_eq!(offset_at(text, Position::new(1, 10)), 2);
        assert_eq!(offset_at(text, Position::new(9, 1)), 3);
        assert_eq!(offset_at(text, Position::new(9, 9)), 5);
    }

    #[test]
    fn test_clamp_selection() {
        let sel = clamp_selection(SelectionRange::new(3, 40), 10);
        assert_eq!(sel, SelectionRange::new(3, 10));
    }
}
