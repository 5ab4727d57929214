//! Sentence delimiter for proof scripts.
//!
//! A sentence ends at a `.` (or a `...` ellipsis) followed by whitespace or
//! end of input, except inside block comments, string literals, backquoted
//! notation, and bracketed tactical groups. Proof-structuring bullets (`-`,
//! `+`, `*`, repeated) and the focus braces `{` / `}` are one-token
//! sentences of their own.
//!
//! The parser is stateless across calls and never looks past its input: the
//! caller hands it the document suffix starting at the intended sentence
//! origin and advances by the consumed length.

use ropey::RopeSlice;
use ropey::iter::Chars;

/// Result of delimiting the next sentence in a text suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
	/// A complete sentence: `offset` chars of leading whitespace and
	/// comments, then `length` chars up to and including the terminator.
	Complete {
		/// Leading trivia preceding the sentence proper.
		offset: usize,
		/// Sentence length, terminator included.
		length: usize,
	},
	/// The input ends inside a sentence starting `offset` chars in.
	Incomplete {
		/// Leading trivia preceding the unterminated sentence.
		offset: usize,
	},
	/// Only whitespace and comments remain.
	Empty,
}

/// Delimit the next sentence of `text`.
pub fn parse_sentence(text: RopeSlice<'_>) -> ParseOutcome {
	let mut s = Scanner::new(text);

	// Skip leading whitespace and comments. A comment left open at end of
	// input still counts as trivia: there is nothing submittable in it.
	let mut start = 0;
	let mut consumed_open_paren = false;
	loop {
		match s.peek() {
			None => return ParseOutcome::Empty,
			Some(c) if c.is_whitespace() => {
				s.next();
			}
			Some('(') => {
				s.next();
				if s.peek() == Some('*') {
					s.next();
					if !skip_comment(&mut s) {
						return ParseOutcome::Empty;
					}
				} else {
					start = s.idx - 1;
					consumed_open_paren = true;
					break;
				}
			}
			Some(_) => {
				start = s.idx;
				break;
			}
		}
	}

	// Bullets and braces are complete one-token sentences.
	if !consumed_open_paren {
		match s.peek() {
			Some(c @ ('-' | '+' | '*')) => {
				let mut length = 0;
				while s.peek() == Some(c) {
					s.next();
					length += 1;
				}
				return ParseOutcome::Complete { offset: start, length };
			}
			Some('{' | '}') => {
				s.next();
				return ParseOutcome::Complete { offset: start, length: 1 };
			}
			_ => {}
		}
	}

	// Scan for the terminating dot.
	let mut bracket_depth = 0usize;
	loop {
		let Some(c) = s.next() else {
			return ParseOutcome::Incomplete { offset: start };
		};
		match c {
			'(' if s.peek() == Some('*') => {
				s.next();
				if !skip_comment(&mut s) {
					return ParseOutcome::Incomplete { offset: start };
				}
			}
			'"' => {
				if !skip_string(&mut s) {
					return ParseOutcome::Incomplete { offset: start };
				}
			}
			'`' => {
				if !skip_backquote(&mut s) {
					return ParseOutcome::Incomplete { offset: start };
				}
			}
			'[' => bracket_depth += 1,
			']' => bracket_depth = bracket_depth.saturating_sub(1),
			'.' if bracket_depth == 0 => {
				// Fold an ellipsis into the terminator, then require a
				// delimiter; `Mod.path` and `1.5` keep scanning.
				while s.peek() == Some('.') {
					s.next();
				}
				match s.peek() {
					None => {
						return ParseOutcome::Complete {
							offset: start,
							length: s.idx - start,
						};
					}
					Some(c) if c.is_whitespace() => {
						return ParseOutcome::Complete {
							offset: start,
							length: s.idx - start,
						};
					}
					Some(_) => {}
				}
			}
			_ => {}
		}
	}
}

/// Char scanner with one char of lookahead over a rope slice.
struct Scanner<'a> {
	chars: Chars<'a>,
	peeked: Option<Option<char>>,
	/// Chars consumed so far.
	idx: usize,
}

impl<'a> Scanner<'a> {
	fn new(text: RopeSlice<'a>) -> Self {
		Self {
			chars: text.chars(),
			peeked: None,
			idx: 0,
		}
	}

	fn next(&mut self) -> Option<char> {
		let c = match self.peeked.take() {
			Some(c) => c,
			None => self.chars.next(),
		};
		if c.is_some() {
			self.idx += 1;
		}
		c
	}

	fn peek(&mut self) -> Option<char> {
		if self.peeked.is_none() {
			self.peeked = Some(self.chars.next());
		}
		self.peeked.flatten()
	}
}

/// Skip a block comment body after its `(*` opener. Nests. Returns false if
/// the input ends first.
fn skip_comment(s: &mut Scanner) -> bool {
	let mut depth = 1usize;
	while depth > 0 {
		let Some(c) = s.next() else {
			return false;
		};
		match c {
			'(' if s.peek() == Some('*') => {
				s.next();
				depth += 1;
			}
			'*' if s.peek() == Some(')') => {
				s.next();
				depth -= 1;
			}
			_ => {}
		}
	}
	true
}

/// Skip a string literal body after its opening quote. `""` is an escaped
/// quote. Returns false if the input ends first.
fn skip_string(s: &mut Scanner) -> bool {
	loop {
		let Some(c) = s.next() else {
			return false;
		};
		if c == '"' {
			if s.peek() == Some('"') {
				s.next();
			} else {
				return true;
			}
		}
	}
}

/// Skip a backquoted notation after its opening backquote.
fn skip_backquote(s: &mut Scanner) -> bool {
	loop {
		match s.next() {
			None => return false,
			Some('`') => return true,
			Some(_) => {}
		}
	}
}
