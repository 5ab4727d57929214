//! Prover client interface.
//!
//! The STM drives an out-of-process prover through this trait; process
//! spawning, restart policy, and the wire codec all live behind it, the way
//! a pluggable transport hides server processes from an LSP session. A
//! request/response surface covers the synchronous calls, and a single-take
//! event stream carries everything the prover volunteers on its own:
//! execution status, errors, messages, profiling results, and death.
//!
//! The event channel belongs to the client, not to any one prover process:
//! it stays open across [`ProverClient::shutdown`] / [`ProverClient::init`]
//! cycles so the coordinator can keep one receiver for the whole session.

use async_trait::async_trait;
use lsp_types::Position;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::mpsc;

use crate::Result;

/// Opaque prover-assigned token naming a persisted intermediate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StateId(pub u64);

/// Execution status the prover reports for an added sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
	/// Queued for execution.
	Processing,
	/// Being executed.
	InProgress,
	/// Execution is blocked on an unfinished subproof.
	Incomplete,
	/// Executed; later states may still revisit it.
	Processed,
	/// Fully checked.
	Complete,
}

/// Severity of a prover output message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
	/// Debug chatter.
	Debug,
	/// Informational output (e.g. `Print` results).
	Info,
	/// Notices the user asked for.
	Notice,
	/// Warnings.
	Warning,
	/// Errors reported outside a failing call.
	Error,
}

/// Asynchronous events the prover emits between responses.
#[derive(Debug, Clone)]
pub enum ProverEvent {
	/// Execution status changed for a state.
	Status {
		/// State the update addresses.
		state_id: StateId,
		/// New execution status.
		status: ExecStatus,
	},
	/// An error was attached to a state.
	Error {
		/// State the error addresses.
		state_id: StateId,
		/// Char span within the sentence text, when located.
		span: Option<(usize, usize)>,
		/// Error message.
		message: String,
	},
	/// Free-form output message.
	Message {
		/// Severity.
		level: MessageLevel,
		/// Plain-text rendering.
		text: String,
		/// Structured rendering, when the prover provides one.
		rich: Option<JsonValue>,
	},
	/// Tactic profiling results requested via
	/// [`ProverClient::ltac_profile`].
	LtacProfResults {
		/// State the results were computed at, when scoped.
		state_id: Option<StateId>,
		/// Profiler payload, passed through verbatim.
		results: JsonValue,
	},
	/// The prover process terminated.
	Died {
		/// Exit reason, when known.
		reason: Option<String>,
	},
}

/// Result of a successful `add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
	/// State created for the added sentence.
	pub state_id: StateId,
	/// Prover-suggested focus when the add moved it (unfocused proofs).
	pub focus_hint: Option<StateId>,
}

/// Focus movement reported by a successful `edit_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
	/// Execution resumes linearly at the named state.
	NewTip {
		/// The new tip state.
		state_id: StateId,
	},
	/// The edit landed inside a finished proof, leaving it unfocused.
	NewFocus {
		/// State of the proof's closing sentence.
		qed_state_id: StateId,
		/// State execution is focused on now.
		focus_state_id: StateId,
	},
}

/// One goal: hypotheses above the line, conclusion below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Goal {
	/// Hypotheses, rendered.
	pub hypotheses: Vec<String>,
	/// Conclusion, rendered.
	pub conclusion: String,
}

/// The full goal view at the current tip.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ProofView {
	/// Goals in focus.
	pub goals: Vec<Goal>,
	/// Unfocused background goals.
	pub background: Vec<Goal>,
	/// Shelved goals.
	pub shelved: Vec<Goal>,
	/// Goals given up on.
	pub given_up: Vec<Goal>,
}

/// Request/response and event surface of the prover.
///
/// Implementations own exactly one prover process at a time and may restart
/// it: `init` after `shutdown` brings up a fresh session on the same event
/// channel.
#[async_trait]
pub trait ProverClient: Send + Sync {
	/// The prover's asynchronous event stream. Single-take.
	fn events(&self) -> mpsc::UnboundedReceiver<ProverEvent>;

	/// (Re)start the prover; returns the root state id.
	async fn init(&self) -> Result<StateId>;

	/// Submit one sentence for execution on top of `parent`.
	///
	/// `end_pos` is where the sentence ends in the document and `version` the
	/// buffer version it was parsed from; both are round-tripped into
	/// feedback so stale responses can be recognized.
	async fn add(&self, text: &str, parent: StateId, end_pos: Position, version: i32) -> Result<AddOutcome>;

	/// Reset execution to a prior state, discarding its descendants.
	async fn edit_at(&self, state_id: StateId) -> Result<FocusChange>;

	/// The goal view at the current execution point, `None` outside proofs.
	async fn goals(&self) -> Result<Option<ProofView>>;

	/// Run a non-mutating query command and return its rendered output.
	async fn query(&self, command: &str) -> Result<String>;

	/// Signal the prover to abandon the call in flight. Asynchronous.
	async fn interrupt(&self) -> Result<()>;

	/// Set the column width the prover wraps rendered output to.
	async fn resize(&self, columns: u32) -> Result<()>;

	/// Request tactic profiling results, scoped to `state_id` when given.
	/// Results arrive as [`ProverEvent::LtacProfResults`].
	async fn ltac_profile(&self, state_id: Option<StateId>) -> Result<()>;

	/// Terminate the prover process.
	async fn shutdown(&self) -> Result<()>;
}
