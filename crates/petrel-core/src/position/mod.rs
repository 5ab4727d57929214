//! Position conversion between rope char indices and LSP positions.
//!
//! LSP positions are `(line, character)` pairs where the character offset is
//! counted in UTF-16 code units (the protocol default, and the only encoding
//! this stack speaks). The rope indexes Unicode codepoints, so columns on
//! lines containing characters outside the BMP widen by surrogate pairs.

use lsp_types::{Position, Range};
use ropey::{Rope, RopeSlice};

/// Convert an LSP position to a char index in the rope.
///
/// Returns `None` if the position is out of bounds.
pub fn position_to_char(text: &Rope, pos: Position) -> Option<usize> {
	let line = pos.line as usize;
	if line >= text.len_lines() {
		return None;
	}
	let line_start = text.line_to_char(line);
	let offset = utf16_col_to_char_offset(text.line(line), pos.character)?;
	Some(line_start + offset)
}

/// Convert a char index in the rope to an LSP position.
///
/// Returns `None` if the index is out of bounds.
pub fn char_to_position(text: &Rope, char_idx: usize) -> Option<Position> {
	if char_idx > text.len_chars() {
		return None;
	}
	let line = text.char_to_line(char_idx);
	let line_start = text.line_to_char(line);
	let character = char_offset_to_utf16_col(text.line(line), char_idx - line_start);
	Some(Position {
		line: line as u32,
		character,
	})
}

/// Convert an LSP range to a `(start, end)` char range.
pub fn range_to_char_range(text: &Rope, range: Range) -> Option<(usize, usize)> {
	let start = position_to_char(text, range.start)?;
	let end = position_to_char(text, range.end)?;
	Some((start, end))
}

/// Convert a `(start, end)` char range to an LSP range.
pub fn char_range_to_range(text: &Rope, start: usize, end: usize) -> Option<Range> {
	let start = char_to_position(text, start)?;
	let end = char_to_position(text, end)?;
	Some(Range { start, end })
}

/// Convert a UTF-16 column to a char offset within a line.
///
/// A column landing between the two units of a surrogate pair rounds up to
/// the next full character.
fn utf16_col_to_char_offset(line: RopeSlice, col: u32) -> Option<usize> {
	let col = col as usize;
	let mut units = 0usize;
	for (idx, ch) in line.chars().enumerate() {
		if units >= col {
			return Some(idx);
		}
		units += ch.len_utf16();
	}
	if units >= col { Some(line.len_chars()) } else { None }
}

/// Convert a char offset within a line to a UTF-16 column.
fn char_offset_to_utf16_col(line: RopeSlice, offset: usize) -> u32 {
	line.chars().take(offset).map(char::len_utf16).sum::<usize>() as u32
}
