//! Per-document façade: commands in, notifications out.
//!
//! [`DocumentController`] owns the text buffer and the STM for one open
//! document and converts client-level requests into STM operations. On the
//! way out it attaches the focus position to command results, maps sentence
//! statuses onto the client's highlight styles, republishes the full
//! diagnostics list after every operation, and paces busy/idle status
//! notifications while a prover call runs long.
//!
//! The controller is driven from a single task; the only thing allowed to
//! reach in from elsewhere is an [`InterruptHandle`], which cancels the
//! operation in flight and signals the prover.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range, Uri};
use parking_lot::Mutex;
use petrel_core::sentence::{ParseOutcome, parse_sentence};
use petrel_core::{ContentChange, TextBuffer};
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};
use crate::events::DocumentEvents;
use crate::protocol::{CommandResult, ComputingStatus, GoalResult, HighlightStyle, HighlightUpdate, QueryKind};
use crate::prover::{MessageLevel, ProverClient};
use crate::stm::{CommandSource, NextCommand, SentenceStatus, StepResult, Stm, StmObserver};

/// Diagnostic source tag attached to published diagnostics.
const DIAGNOSTIC_SOURCE: &str = "petrel";

/// Tuning knobs for a document controller.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
	/// Cadence of busy-status notifications during long prover calls.
	pub computing_cadence: Duration,
	/// Deadline after which a multi-step operation cancels itself.
	pub operation_deadline: Option<Duration>,
	/// Output wrapping width handed to the prover at startup.
	pub initial_wrapping_width: Option<u32>,
}

impl Default for DocumentConfig {
	fn default() -> Self {
		Self {
			computing_cadence: Duration::from_millis(500),
			operation_deadline: None,
			initial_wrapping_width: None,
		}
	}
}

/// Map a sentence status onto the client's highlight style.
pub fn highlight_for(status: SentenceStatus) -> HighlightStyle {
	match status {
		SentenceStatus::Parsed => HighlightStyle::Parsing,
		SentenceStatus::Processing => HighlightStyle::Processing,
		SentenceStatus::InProgress => HighlightStyle::InProgress,
		SentenceStatus::Incomplete => HighlightStyle::Incomplete,
		SentenceStatus::Processed => HighlightStyle::Processed,
		SentenceStatus::Complete => HighlightStyle::Complete,
		SentenceStatus::Error => HighlightStyle::TacticFailure,
		SentenceStatus::Cleared => HighlightStyle::Clear,
	}
}

/// STM observer that renders status changes as client notifications.
struct HighlightRelay {
	events: Arc<dyn DocumentEvents>,
}

impl StmObserver for HighlightRelay {
	fn sentence_status(&self, range: Range, status: SentenceStatus) {
		self.events.highlights(&[HighlightUpdate {
			style: highlight_for(status),
			range,
		}]);
	}

	fn message(&self, level: MessageLevel, text: &str, rich: Option<&JsonValue>) {
		self.events.message(level, text, rich);
	}

	fn ltac_prof_results(&self, results: &JsonValue) {
		self.events.ltac_prof_results(results);
	}

	fn prover_died(&self) {
		self.events.reset();
	}
}

/// Walks the buffer from a starting position, delimiting sentences lazily.
///
/// This is the controller's [`CommandSource`]: the STM pulls sentences from
/// it without ever holding the buffer.
pub struct ScriptCursor<'a> {
	buffer: &'a TextBuffer,
	offset: usize,
}

impl<'a> ScriptCursor<'a> {
	/// Cursor over `buffer` starting at `from`.
	pub fn new(buffer: &'a TextBuffer, from: Position) -> Self {
		let offset = buffer.offset_at(from).unwrap_or_else(|| buffer.len_chars());
		Self { buffer, offset }
	}
}

impl CommandSource for ScriptCursor<'_> {
	fn next(&mut self) -> NextCommand {
		let Some(tail) = self.buffer.tail(self.offset) else {
			return NextCommand::End;
		};
		match parse_sentence(tail) {
			ParseOutcome::Empty => NextCommand::End,
			ParseOutcome::Incomplete { offset } => {
				let Some(start) = self.buffer.position_at(self.offset + offset) else {
					return NextCommand::End;
				};
				NextCommand::Incomplete {
					range: Range {
						start,
						end: self.buffer.end_position(),
					},
				}
			}
			ParseOutcome::Complete { offset, length } => {
				let start = self.offset + offset;
				let end = start + length;
				let (Some(text), Some(start_pos), Some(end_pos)) = (
					self.buffer.substr(start, length),
					self.buffer.position_at(start),
					self.buffer.position_at(end),
				) else {
					return NextCommand::End;
				};
				self.offset = end;
				NextCommand::Sentence {
					text: text.to_string(),
					range: Range {
						start: start_pos,
						end: end_pos,
					},
				}
			}
		}
	}
}

/// Handle for interrupting the operation in flight from another task.
#[derive(Clone)]
pub struct InterruptHandle {
	current_op: Arc<Mutex<Option<CancellationToken>>>,
	prover: Arc<dyn ProverClient>,
}

impl InterruptHandle {
	/// Cancel the current operation and signal the prover.
	pub async fn interrupt(&self) -> Result<()> {
		if let Some(token) = self.current_op.lock().clone() {
			token.cancel();
		}
		self.prover.interrupt().await
	}
}

/// Top-level coordinator for one open document.
pub struct DocumentController {
	uri: Uri,
	buffer: TextBuffer,
	stm: Stm,
	events: Arc<dyn DocumentEvents>,
	config: DocumentConfig,
	current_op: Arc<Mutex<Option<CancellationToken>>>,
	prover: Arc<dyn ProverClient>,
}

impl DocumentController {
	/// Create a controller for `uri` holding `text` at `version`.
	///
	/// The prover session is not started; call [`DocumentController::start`].
	pub fn new(
		uri: Uri,
		text: &str,
		version: i32,
		prover: Arc<dyn ProverClient>,
		events: Arc<dyn DocumentEvents>,
		config: DocumentConfig,
	) -> Self {
		let buffer = TextBuffer::new(text, version);
		let relay = Arc::new(HighlightRelay {
			events: events.clone(),
		});
		let stm = Stm::new(prover.clone(), relay, version);
		Self {
			uri,
			buffer,
			stm,
			events,
			config,
			current_op: Arc::new(Mutex::new(None)),
			prover,
		}
	}

	/// Start the prover session.
	pub async fn start(&mut self) -> Result<()> {
		self.stm.start().await?;
		if let Some(width) = self.config.initial_wrapping_width {
			self.stm.resize(width).await?;
		}
		Ok(())
	}

	/// The document URI.
	pub fn uri(&self) -> &Uri {
		&self.uri
	}

	/// The document text.
	pub fn buffer(&self) -> &TextBuffer {
		&self.buffer
	}

	/// Whether the prover session is up.
	pub fn is_running(&self) -> bool {
		self.stm.is_running()
	}

	/// The focused position.
	pub fn focus(&self) -> Position {
		self.stm.focus()
	}

	/// A handle other tasks can use to interrupt the operation in flight.
	pub fn interrupt_handle(&self) -> InterruptHandle {
		InterruptHandle {
			current_op: self.current_op.clone(),
			prover: self.prover.clone(),
		}
	}

	/// Execute the next sentence.
	pub async fn step_forward(&mut self) -> CommandResult {
		self.begin_op();
		let mut cursor = ScriptCursor::new(&self.buffer, self.stm.focus());
		let step = with_computing(
			self.events.clone(),
			self.config.computing_cadence,
			self.stm.step_forward(&mut cursor),
		)
		.await;
		drop(cursor);
		self.finish_op();
		self.publish_diagnostics();
		self.command_result(step)
	}

	/// Rewind the spine by one sentence.
	pub async fn step_backward(&mut self) -> CommandResult {
		self.begin_op();
		let step = with_computing(
			self.events.clone(),
			self.config.computing_cadence,
			self.stm.step_backward(),
		)
		.await;
		self.finish_op();
		self.publish_diagnostics();
		self.command_result(step)
	}

	/// Drive execution to the char offset `offset`.
	pub async fn interpret_to_point(&mut self, offset: usize) -> CommandResult {
		let offset = offset.min(self.buffer.len_chars());
		let target = self
			.buffer
			.position_at(offset)
			.unwrap_or_else(|| self.buffer.end_position());
		self.interpret(target).await
	}

	/// Drive execution to the end of the document.
	pub async fn interpret_to_end(&mut self) -> CommandResult {
		let target = self.buffer.end_position();
		self.interpret(target).await
	}

	async fn interpret(&mut self, target: Position) -> CommandResult {
		let token = self.begin_op();
		let mut cursor = ScriptCursor::new(&self.buffer, self.stm.focus());
		let step = with_computing(
			self.events.clone(),
			self.config.computing_cadence,
			self.stm.interpret_to_point(target, &mut cursor, &token),
		)
		.await;
		drop(cursor);
		self.finish_op();
		self.publish_diagnostics();
		self.command_result(step)
	}

	/// The goal view at the focus.
	pub async fn get_goal(&mut self) -> GoalResult {
		let result = with_computing(
			self.events.clone(),
			self.config.computing_cadence,
			self.stm.goal(),
		)
		.await;
		let focus = self.stm.focus();
		match result {
			Ok(None) => GoalResult::NoProof { focus },
			Ok(Some(view)) => GoalResult::Proof { view, focus },
			Err(Error::Interrupted) => GoalResult::Interrupted { focus },
			Err(Error::Prover(failure)) => GoalResult::Failure {
				message: failure.message,
				range: None,
				focus,
			},
			Err(_) => GoalResult::NotRunning,
		}
	}

	/// `Locate` the identifier at the tip.
	pub async fn locate(&mut self, ident: &str) -> Result<String> {
		self.run_query(QueryKind::Locate, ident).await
	}

	/// `Check` a term at the tip.
	pub async fn check(&mut self, term: &str) -> Result<String> {
		self.run_query(QueryKind::Check, term).await
	}

	/// `Search` at the tip.
	pub async fn search(&mut self, query: &str) -> Result<String> {
		self.run_query(QueryKind::Search, query).await
	}

	/// `SearchAbout` at the tip.
	pub async fn search_about(&mut self, query: &str) -> Result<String> {
		self.run_query(QueryKind::SearchAbout, query).await
	}

	async fn run_query(&mut self, kind: QueryKind, argument: &str) -> Result<String> {
		with_computing(
			self.events.clone(),
			self.config.computing_cadence,
			self.stm.do_query(kind, argument),
		)
		.await
	}

	/// Set the prover's output wrapping width.
	pub async fn set_wrapping_width(&mut self, columns: u32) -> Result<()> {
		self.stm.resize(columns).await
	}

	/// Request tactic profiling results, scoped to the sentence at `offset`
	/// when one is given.
	pub async fn request_ltac_prof_results(&mut self, offset: Option<usize>) -> Result<()> {
		let state = offset
			.and_then(|offset| self.buffer.position_at(offset))
			.and_then(|pos| self.stm.state_at(pos));
		self.stm.request_ltac_profile(state).await
	}

	/// Cancel the operation in flight and signal the prover.
	pub async fn interrupt(&self) -> Result<()> {
		self.interrupt_handle().interrupt().await
	}

	/// Apply a `didChange` batch.
	///
	/// The version is validated first (stale batches are rejected with no
	/// state change), then the STM rewinds and shifts against pre-edit
	/// coordinates, and only then does the buffer mutate.
	pub async fn apply_text_edits(&mut self, changes: &[ContentChange], new_version: i32) -> Result<()> {
		self.buffer.check_version(new_version)?;
		if self.stm.affected_by(changes) {
			debug!(version = new_version, "semantic edit, cancelling in-flight work");
			if let Some(token) = self.current_op.lock().clone() {
				token.cancel();
			}
		}
		self.stm.apply_changes(changes, new_version).await?;
		self.buffer.apply(changes, new_version)?;
		self.publish_diagnostics();
		Ok(())
	}

	/// Restart the prover session from scratch.
	pub async fn reset(&mut self) -> Result<()> {
		self.finish_op();
		self.stm.reset().await?;
		self.events.reset();
		self.publish_diagnostics();
		Ok(())
	}

	/// Shut the prover session down.
	pub async fn quit(&mut self) -> Result<()> {
		self.finish_op();
		self.stm.shutdown().await
	}

	/// Close the document: shut the session down and retract diagnostics.
	pub async fn close(&mut self) -> Result<()> {
		self.finish_op();
		self.events.diagnostics(&self.uri, Vec::new());
		self.stm.shutdown().await
	}

	/// Process every prover event currently queued.
	pub fn poll_events(&mut self) {
		self.stm.pump_events();
		self.publish_diagnostics();
	}

	/// Await and process the next prover event; the host's event loop calls
	/// this alongside request dispatch. Returns false once the stream is
	/// closed for good.
	pub async fn wait_event(&mut self) -> bool {
		let alive = self.stm.wait_event().await;
		self.publish_diagnostics();
		alive
	}

	fn begin_op(&self) -> CancellationToken {
		let token = CancellationToken::new();
		if let Some(deadline) = self.config.operation_deadline {
			let timer = token.clone();
			tokio::spawn(async move {
				tokio::select! {
					_ = timer.cancelled() => {}
					_ = tokio::time::sleep(deadline) => timer.cancel(),
				}
			});
		}
		*self.current_op.lock() = Some(token.clone());
		token
	}

	fn finish_op(&self) {
		if let Some(token) = self.current_op.lock().take() {
			token.cancel();
		}
	}

	fn publish_diagnostics(&self) {
		let diagnostics = self
			.stm
			.diagnostics()
			.into_iter()
			.map(|error| Diagnostic {
				range: error.range,
				severity: Some(DiagnosticSeverity::ERROR),
				source: Some(DIAGNOSTIC_SOURCE.to_string()),
				message: error.message,
				..Diagnostic::default()
			})
			.collect();
		self.events.diagnostics(&self.uri, diagnostics);
	}

	fn command_result(&self, step: StepResult) -> CommandResult {
		let focus = self.stm.focus();
		match step {
			StepResult::Ok => CommandResult::Ok { focus },
			StepResult::EndOfScript => CommandResult::EndOfScript { focus },
			StepResult::ParseIncomplete { range } => CommandResult::ParseIncomplete { range, focus },
			StepResult::Failure { message, range } => CommandResult::Failure { message, range, focus },
			StepResult::Interrupted => CommandResult::Interrupted { focus },
			StepResult::NotRunning => CommandResult::NotRunning,
		}
	}
}

/// Run `operation`, emitting busy status at `cadence` until it resolves.
async fn with_computing<T>(
	events: Arc<dyn DocumentEvents>,
	cadence: Duration,
	operation: impl Future<Output = T>,
) -> T {
	let started = tokio::time::Instant::now();
	let mut ticks = tokio::time::interval(cadence);
	ticks.tick().await; // the first tick resolves immediately
	tokio::pin!(operation);
	loop {
		tokio::select! {
			output = &mut operation => {
				events.computing(ComputingStatus::Idle, started.elapsed());
				return output;
			}
			_ = ticks.tick() => {
				events.computing(ComputingStatus::Computing, started.elapsed());
			}
		}
	}
}
