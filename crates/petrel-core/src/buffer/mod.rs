//! Mutable document text with versioned batch edits.
//!
//! [`TextBuffer`] is the authoritative copy of an open document: a rope plus
//! the client's version counter. Edits arrive as batches of ranged content
//! changes and are applied in reverse document order so that the offsets of
//! earlier changes stay valid while the batch lands; the version moves
//! atomically with the batch.

use lsp_types::{Position, Range};
use ropey::{Rope, RopeSlice};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::position::{char_to_position, position_to_char, range_to_char_range};
use crate::range::cmp_positions;

/// A single ranged content change, LSP `didChange` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentChange {
	/// The replaced range; empty for a pure insertion.
	pub range: Range,
	/// Replacement text; empty for a pure deletion.
	pub text: String,
}

/// Errors raised by [`TextBuffer`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferError {
	/// An edit batch arrived with a non-monotone version.
	#[error("stale edit: version {proposed} is not newer than {current}")]
	StaleEdit {
		/// Version the buffer currently holds.
		current: i32,
		/// Version the rejected batch carried.
		proposed: i32,
	},
	/// A change addressed a range outside the document.
	#[error("change range out of bounds")]
	OutOfBounds,
}

/// Authoritative mutable document text.
#[derive(Debug, Clone)]
pub struct TextBuffer {
	text: Rope,
	version: i32,
}

impl TextBuffer {
	/// Create a buffer holding `text` at `version`.
	pub fn new(text: &str, version: i32) -> Self {
		Self {
			text: Rope::from_str(text),
			version,
		}
	}

	/// The client's version counter for the current content.
	pub fn version(&self) -> i32 {
		self.version
	}

	/// The whole document.
	pub fn text(&self) -> &Rope {
		&self.text
	}

	/// Document length in chars.
	pub fn len_chars(&self) -> usize {
		self.text.len_chars()
	}

	/// Position just past the last character.
	pub fn end_position(&self) -> Position {
		char_to_position(&self.text, self.text.len_chars()).unwrap_or_default()
	}

	/// Reject a version that would not move the counter forward.
	pub fn check_version(&self, new_version: i32) -> Result<(), BufferError> {
		if new_version <= self.version {
			return Err(BufferError::StaleEdit {
				current: self.version,
				proposed: new_version,
			});
		}
		Ok(())
	}

	/// Apply a batch of content changes, moving to `new_version`.
	///
	/// Changes are validated against the pre-batch text, then applied in
	/// reverse document order. On error nothing is modified.
	pub fn apply(&mut self, changes: &[ContentChange], new_version: i32) -> Result<(), BufferError> {
		self.check_version(new_version)?;

		let mut resolved = Vec::with_capacity(changes.len());
		for change in changes {
			let (start, end) = range_to_char_range(&self.text, change.range).ok_or(BufferError::OutOfBounds)?;
			resolved.push((start, end, change));
		}
		resolved.sort_by(|a, b| cmp_positions(b.2.range.start, a.2.range.start));

		for (start, end, change) in resolved {
			self.text.remove(start..end);
			self.text.insert(start, &change.text);
		}
		self.version = new_version;
		Ok(())
	}

	/// Char index of a position.
	pub fn offset_at(&self, pos: Position) -> Option<usize> {
		position_to_char(&self.text, pos)
	}

	/// Position of a char index.
	pub fn position_at(&self, offset: usize) -> Option<Position> {
		char_to_position(&self.text, offset)
	}

	/// Borrow the text within `range`.
	pub fn slice(&self, range: Range) -> Option<RopeSlice<'_>> {
		let (start, end) = range_to_char_range(&self.text, range)?;
		Some(self.text.slice(start..end))
	}

	/// Borrow `len` chars starting at `offset`.
	pub fn substr(&self, offset: usize, len: usize) -> Option<RopeSlice<'_>> {
		if offset + len > self.text.len_chars() {
			return None;
		}
		Some(self.text.slice(offset..offset + len))
	}

	/// Borrow everything from `offset` to the end of the document.
	pub fn tail(&self, offset: usize) -> Option<RopeSlice<'_>> {
		if offset > self.text.len_chars() {
			return None;
		}
		Some(self.text.slice(offset..))
	}
}
