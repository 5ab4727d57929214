//! Document-level proof-state coordination for a prover LSP backend.
//!
//! One [`DocumentController`] per open document converts editor requests
//! (step forward/back, interpret to point, queries, edits) into operations
//! on a [`Stm`] — the State-Transaction Machine owning the sentence forest
//! that mirrors the prover's state DAG — and reflects prover responses and
//! events back as highlight, diagnostic, goal, and status notifications.
//!
//! ```text
//! ┌────────┐ requests ┌────────────────────┐  add/edit_at  ┌────────┐
//! │ editor │─────────▶│ DocumentController │──────────────▶│ prover │
//! │ client │◀─────────│   (buffer + STM)   │◀──────────────│ (proc) │
//! └────────┘ notifies └────────────────────┘    events     └────────┘
//! ```
//!
//! The LSP transport, the editor view, and the prover process itself are
//! external collaborators: the first two sit behind [`DocumentEvents`], the
//! last behind [`ProverClient`].
#![warn(missing_docs)]

pub mod controller;
pub mod error;
pub mod events;
pub mod protocol;
pub mod prover;
pub mod stm;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{DocumentConfig, DocumentController, InterruptHandle, ScriptCursor, highlight_for};
pub use error::{Error, ProverFailure, Result};
pub use events::{DocumentEvents, NoOpEvents};
pub use protocol::{CommandResult, ComputingStatus, GoalResult, HighlightStyle, HighlightUpdate, QueryKind};
pub use prover::{
	AddOutcome, ExecStatus, FocusChange, Goal, MessageLevel, ProofView, ProverClient, ProverEvent, StateId,
};
pub use stm::{
	CommandSource, NextCommand, NoOpObserver, SentenceError, SentenceId, SentenceStatus, StepResult, Stm,
	StmObserver,
};
