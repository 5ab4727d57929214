//! Callback surface toward the editor client.

use std::time::Duration;

use lsp_types::{Diagnostic, Uri};
use serde_json::Value as JsonValue;

use crate::protocol::{ComputingStatus, HighlightUpdate};
use crate::prover::MessageLevel;

/// Notifications the controller pushes to the editor.
///
/// One implementation per client connection; handlers must not block.
pub trait DocumentEvents: Send + Sync {
	/// Incremental highlight deltas.
	fn highlights(&self, updates: &[HighlightUpdate]);

	/// Full replacement diagnostics for the document.
	fn diagnostics(&self, uri: &Uri, diagnostics: Vec<Diagnostic>);

	/// Free-form prover output.
	fn message(&self, level: MessageLevel, text: &str, rich: Option<&JsonValue>);

	/// The prover session was reset (or died); the view should clear.
	fn reset(&self);

	/// Periodic busy/idle status for long prover calls.
	fn computing(&self, status: ComputingStatus, elapsed: Duration);

	/// Tactic profiling results.
	fn ltac_prof_results(&self, results: &JsonValue);
}

/// Callback bag that ignores every notification.
pub struct NoOpEvents;

impl DocumentEvents for NoOpEvents {
	fn highlights(&self, _updates: &[HighlightUpdate]) {}
	fn diagnostics(&self, _uri: &Uri, _diagnostics: Vec<Diagnostic>) {}
	fn message(&self, _level: MessageLevel, _text: &str, _rich: Option<&JsonValue>) {}
	fn reset(&self) {}
	fn computing(&self, _status: ComputingStatus, _elapsed: Duration) {}
	fn ltac_prof_results(&self, _results: &JsonValue) {}
}
