//! Error types for the document coordinator.

use thiserror::Error;

use crate::prover::StateId;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A failure the prover reported for a specific call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProverFailure {
	/// State the prover attributes the failure to, when it named one.
	pub state_id: Option<StateId>,
	/// Char span within the offending command text, when located.
	pub span: Option<(usize, usize)>,
	/// Human-readable message.
	pub message: String,
}

/// Errors surfaced by the coordination layer.
#[derive(Debug, Error)]
pub enum Error {
	/// The prover session is not running.
	#[error("prover is not running")]
	NotRunning,
	/// The prover rejected a call; recoverable by stepping back or editing.
	#[error("prover failure: {}", .0.message)]
	Prover(ProverFailure),
	/// The operation was cancelled by the user or a deadline.
	#[error("operation interrupted")]
	Interrupted,
	/// The prover process terminated; recoverable by reset.
	#[error("prover process died")]
	ProverDied,
	/// The transport below the prover client failed.
	#[error("prover transport: {0}")]
	Transport(String),
	/// A buffer operation was rejected.
	#[error(transparent)]
	Buffer(#[from] petrel_core::BufferError),
}
