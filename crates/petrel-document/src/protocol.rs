//! Client-facing payload types.
//!
//! Everything the editor sees crosses this module: command outcomes, goal
//! views, highlight deltas, and status notifications, all serde-tagged so
//! the transport can forward them verbatim.

use lsp_types::{Position, Range};
use serde::Serialize;

use crate::prover::ProofView;

/// Highlight styles understood by the editor view. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HighlightStyle {
	/// Remove any highlight on the range.
	Clear,
	/// Sentence delimited, not yet acknowledged.
	Parsing,
	/// Acknowledged, queued for execution.
	Processing,
	/// Being executed.
	InProgress,
	/// Blocked on an unfinished subproof.
	Incomplete,
	/// Executed.
	Processed,
	/// Fully checked.
	Complete,
	/// Execution failed here.
	TacticFailure,
}

/// A single highlight delta addressed to a document range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighlightUpdate {
	/// Style to paint.
	pub style: HighlightStyle,
	/// Range to paint it on.
	pub range: Range,
}

/// Outcome of a navigation command, annotated with the focus position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CommandResult {
	/// The prover session is not running.
	NotRunning,
	/// The command advanced (or rewound) the spine as requested.
	Ok {
		/// Focus after the command.
		focus: Position,
	},
	/// There was no further sentence to execute.
	EndOfScript {
		/// Focus after the command.
		focus: Position,
	},
	/// The next sentence is not fully delimited yet.
	ParseIncomplete {
		/// Candidate range of the unterminated sentence.
		range: Range,
		/// Focus after the command.
		focus: Position,
	},
	/// The prover rejected a sentence.
	Failure {
		/// Prover message.
		message: String,
		/// Document range the failure points at.
		range: Range,
		/// Focus after the command.
		focus: Position,
	},
	/// The command was cancelled.
	Interrupted {
		/// Focus after the command.
		focus: Position,
	},
}

/// Goal view handed back for a `getGoal` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GoalResult {
	/// The prover session is not running.
	NotRunning,
	/// No proof is open at the focus.
	NoProof {
		/// Current focus.
		focus: Position,
	},
	/// An open proof with its goals.
	Proof {
		/// The goal view.
		view: ProofView,
		/// Current focus.
		focus: Position,
	},
	/// The prover failed to produce a goal view.
	Failure {
		/// Prover message.
		message: String,
		/// Document range the failure points at, when known.
		range: Option<Range>,
		/// Current focus.
		focus: Position,
	},
	/// The request was cancelled.
	Interrupted {
		/// Current focus.
		focus: Position,
	},
}

/// Non-mutating query kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
	/// `Locate`: where an identifier is defined.
	Locate,
	/// `Check`: the type of a term.
	Check,
	/// `Search`: lemmas matching a pattern.
	Search,
	/// `SearchAbout`: lemmas mentioning the argument.
	SearchAbout,
}

impl QueryKind {
	/// Render the full prover command for `argument`.
	pub fn command(self, argument: &str) -> String {
		let keyword = match self {
			QueryKind::Locate => "Locate",
			QueryKind::Check => "Check",
			QueryKind::Search => "Search",
			QueryKind::SearchAbout => "SearchAbout",
		};
		let argument = argument.trim();
		if argument.ends_with('.') {
			format!("{keyword} {argument}")
		} else {
			format!("{keyword} {argument}.")
		}
	}
}

/// Whether the coordinator is busy with a prover-bound operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ComputingStatus {
	/// A prover call is in flight.
	Computing,
	/// The operation resolved.
	Idle,
}
