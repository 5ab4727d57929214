//! Document primitives for the petrel proof-document stack.
//!
//! This crate is the synchronous foundation under the document coordinator:
//! the versioned text buffer, LSP position conversion, range arithmetic, and
//! the sentence delimiter for proof scripts. Nothing in here does I/O or
//! touches the prover; the async coordination layer lives in
//! `petrel-document`.
#![warn(missing_docs)]

pub mod buffer;
pub mod position;
pub mod range;
pub mod sentence;

pub use buffer::{BufferError, ContentChange, TextBuffer};
pub use position::{char_range_to_range, char_to_position, position_to_char, range_to_char_range};
pub use range::{RangeDelta, advance_position, cmp_positions, range_contains, ranges_overlap};
pub use sentence::{ParseOutcome, parse_sentence};
