//! State-Transaction Machine: the sentence forest mirroring the prover's
//! state DAG.
//!
//! The STM owns every sentence the document has executed, arranged as an
//! arena of parent-linked nodes with a distinguished *spine* — the chain
//! from the root state to the current tip. Edits become `edit_at` plus
//! forward steps; prover events are routed back onto sentences by state id
//! and re-emitted to an observer as range-addressed status changes.
//!
//! ```text
//! ┌──────────────┐  commands   ┌───────────┐  add/edit_at  ┌────────┐
//! │  Controller  │────────────▶│    STM    │──────────────▶│ Prover │
//! │ (owns buffer)│◀────────────│ (forest)  │◀──────────────│ (proc) │
//! └──────────────┘  statuses   └───────────┘    events     └────────┘
//! ```
//!
//! The STM never touches the text buffer: sentences arrive pre-delimited
//! through a [`CommandSource`] the controller binds to the focused
//! position, and all geometry is pure position arithmetic. The prover
//! connection is exclusively owned here; one call is in flight at a time.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use lsp_types::{Position, Range};
use petrel_core::ContentChange;
use petrel_core::range::{RangeDelta, advance_position, cmp_positions, range_contains, ranges_overlap};
use serde_json::Value as JsonValue;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::QueryKind;
use crate::prover::{ExecStatus, FocusChange, MessageLevel, ProofView, ProverClient, ProverEvent, StateId};

/// Local identifier of a sentence in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SentenceId(u32);

/// Lifecycle of a sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceStatus {
	/// Delimited, submitted, not yet acknowledged.
	Parsed,
	/// Acknowledged by the prover, queued for execution.
	Processing,
	/// Being executed.
	InProgress,
	/// Blocked on an unfinished subproof.
	Incomplete,
	/// Executed.
	Processed,
	/// Fully checked.
	Complete,
	/// Execution failed.
	Error,
	/// Removed from the spine; its range no longer means anything.
	Cleared,
}

impl SentenceStatus {
	fn from_exec(status: ExecStatus) -> Self {
		match status {
			ExecStatus::Processing => SentenceStatus::Processing,
			ExecStatus::InProgress => SentenceStatus::InProgress,
			ExecStatus::Incomplete => SentenceStatus::Incomplete,
			ExecStatus::Processed => SentenceStatus::Processed,
			ExecStatus::Complete => SentenceStatus::Complete,
		}
	}
}

/// An error attached to a sentence, already resolved to document
/// coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceError {
	/// Document range the error points at.
	pub range: Range,
	/// Prover message.
	pub message: String,
}

#[derive(Debug, Clone)]
struct Sentence {
	state_id: Option<StateId>,
	range: Range,
	text: String,
	status: SentenceStatus,
	parent: Option<SentenceId>,
	errors: Vec<SentenceError>,
}

/// Observer for state changes the embedding layer renders.
///
/// Calls are made synchronously from STM transitions, strictly ordered with
/// them: a status update for a sentence is never emitted after that
/// sentence's `Cleared` notification.
pub trait StmObserver: Send + Sync {
	/// A sentence's status changed (or its range should be cleared).
	fn sentence_status(&self, range: Range, status: SentenceStatus);

	/// Free-form prover output.
	fn message(&self, level: MessageLevel, text: &str, rich: Option<&JsonValue>);

	/// Tactic profiling results arrived.
	fn ltac_prof_results(&self, results: &JsonValue);

	/// The prover process died.
	fn prover_died(&self);
}

/// Observer that ignores everything.
pub struct NoOpObserver;

impl StmObserver for NoOpObserver {
	fn sentence_status(&self, _range: Range, _status: SentenceStatus) {}
	fn message(&self, _level: MessageLevel, _text: &str, _rich: Option<&JsonValue>) {}
	fn ltac_prof_results(&self, _results: &JsonValue) {}
	fn prover_died(&self) {}
}

/// Pull interface for the next delimited sentence at the focused position.
///
/// The controller implements this over its buffer; the STM never sees the
/// text itself, which keeps buffer edits and prover calls from racing.
pub trait CommandSource {
	/// Delimit and return the next sentence.
	fn next(&mut self) -> NextCommand;
}

/// One answer from a [`CommandSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextCommand {
	/// A fully delimited sentence ready to submit.
	Sentence {
		/// The exact command text.
		text: String,
		/// Its document range, leading trivia excluded.
		range: Range,
	},
	/// The input ends inside a sentence; nothing submittable.
	Incomplete {
		/// Candidate range of the unterminated sentence.
		range: Range,
	},
	/// Only trivia up to end of input.
	End,
}

/// Outcome of a single STM operation. The controller wraps this into a
/// client-facing result with the focus attached.
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
	/// The spine moved as requested.
	Ok,
	/// No further sentence to execute.
	EndOfScript,
	/// The next sentence is not fully delimited.
	ParseIncomplete {
		/// Candidate range.
		range: Range,
	},
	/// The prover rejected a sentence; nothing was kept on the spine.
	Failure {
		/// Prover message.
		message: String,
		/// Document range the failure points at.
		range: Range,
	},
	/// The operation was cancelled.
	Interrupted,
	/// The prover session is not running.
	NotRunning,
}

/// The sentence-forest controller.
pub struct Stm {
	prover: Arc<dyn ProverClient>,
	events: mpsc::UnboundedReceiver<ProverEvent>,
	observer: Arc<dyn StmObserver>,
	sentences: Vec<Sentence>,
	spine: Vec<SentenceId>,
	by_state: HashMap<StateId, SentenceId>,
	root_state: Option<StateId>,
	/// Off-spine record of the last failed attempt, kept for diagnostics
	/// until the region is re-executed or edited.
	failure: Option<SentenceId>,
	focus: Position,
	doc_version: i32,
	running: bool,
}

impl Stm {
	/// Create an STM over `prover`, taking its event stream.
	pub fn new(prover: Arc<dyn ProverClient>, observer: Arc<dyn StmObserver>, doc_version: i32) -> Self {
		let events = prover.events();
		Self {
			prover,
			events,
			observer,
			sentences: Vec::new(),
			spine: Vec::new(),
			by_state: HashMap::new(),
			root_state: None,
			failure: None,
			focus: Position::default(),
			doc_version,
			running: false,
		}
	}

	/// Start the prover session.
	pub async fn start(&mut self) -> Result<()> {
		let root = self.prover.init().await?;
		debug!(root = root.0, "prover session started");
		self.root_state = Some(root);
		self.running = true;
		Ok(())
	}

	/// Whether the prover session is up.
	pub fn is_running(&self) -> bool {
		self.running
	}

	/// The focused position: end of the tip sentence, or the origin.
	pub fn focus(&self) -> Position {
		self.focus
	}

	/// Number of sentences on the spine.
	pub fn spine_len(&self) -> usize {
		self.spine.len()
	}

	/// Ranges of the spine sentences, in order.
	pub fn spine_ranges(&self) -> Vec<Range> {
		self.spine.iter().map(|id| self.sentence(*id).range).collect()
	}

	/// Statuses of the spine sentences, in order.
	pub fn spine_statuses(&self) -> Vec<SentenceStatus> {
		self.spine.iter().map(|id| self.sentence(*id).status).collect()
	}

	/// State id of the tip: the last spine sentence's, or the root's.
	pub fn tip_state(&self) -> Option<StateId> {
		self.spine
			.last()
			.and_then(|id| self.sentence(*id).state_id)
			.or(self.root_state)
	}

	/// State id of the spine sentence containing `pos`, if any.
	pub fn state_at(&self, pos: Position) -> Option<StateId> {
		self.spine
			.iter()
			.find(|id| range_contains(self.sentence(**id).range, pos))
			.and_then(|id| self.sentence(*id).state_id)
	}

	/// The current diagnostics view: every error on the spine plus the
	/// recorded failed attempt, in document order.
	pub fn diagnostics(&self) -> Vec<SentenceError> {
		let mut out: Vec<SentenceError> = self
			.spine
			.iter()
			.chain(self.failure.as_ref())
			.flat_map(|id| self.sentence(*id).errors.iter().cloned())
			.collect();
		out.sort_by(|a, b| cmp_positions(a.range.start, b.range.start));
		out
	}

	/// Whether any change in the batch overlaps a spine sentence (i.e. the
	/// batch is not passive).
	pub fn affected_by(&self, changes: &[ContentChange]) -> bool {
		self.first_affected(changes).is_some()
	}

	/// Execute the next sentence from `source`.
	pub async fn step_forward(&mut self, source: &mut dyn CommandSource) -> StepResult {
		if !self.running {
			return StepResult::NotRunning;
		}
		self.drain_events();
		match source.next() {
			NextCommand::Sentence { text, range } => {
				self.clear_failure();
				self.submit(text, range, None).await
			}
			NextCommand::Incomplete { range } => {
				self.clear_failure();
				self.record_parse_failure(range);
				StepResult::ParseIncomplete { range }
			}
			NextCommand::End => StepResult::EndOfScript,
		}
	}

	/// Rewind the spine by one sentence. At the root, reset the session.
	pub async fn step_backward(&mut self) -> StepResult {
		if !self.running {
			return StepResult::NotRunning;
		}
		self.drain_events();
		self.clear_failure();
		if self.spine.is_empty() {
			let result = self.reset().await;
			return match result {
				Ok(()) => StepResult::Ok,
				Err(err) => self.step_error(err),
			};
		}
		self.rewind_spine_to(self.spine.len() - 1).await
	}

	/// Drive the spine to `target`: rewind if it precedes the focus,
	/// otherwise step forward until the next sentence would exceed it.
	pub async fn interpret_to_point(
		&mut self,
		target: Position,
		source: &mut dyn CommandSource,
		cancel: &CancellationToken,
	) -> StepResult {
		if !self.running {
			return StepResult::NotRunning;
		}
		self.drain_events();
		self.clear_failure();

		if cmp_positions(target, self.focus) == Ordering::Less {
			let keep = self
				.spine
				.iter()
				.take_while(|id| cmp_positions(self.sentence(**id).range.end, target) != Ordering::Greater)
				.count();
			return self.rewind_spine_to(keep).await;
		}

		loop {
			if cancel.is_cancelled() {
				// Nothing in flight; just stop pulling commands.
				return StepResult::Interrupted;
			}
			let (text, range) = match source.next() {
				NextCommand::Sentence { text, range } => (text, range),
				NextCommand::Incomplete { range } => {
					self.record_parse_failure(range);
					return StepResult::ParseIncomplete { range };
				}
				NextCommand::End => return StepResult::Ok,
			};
			if cmp_positions(range.end, target) == Ordering::Greater {
				return StepResult::Ok;
			}
			match self.submit(text, range, Some(cancel)).await {
				StepResult::Ok => {}
				stop => return stop,
			}
		}
	}

	/// Rewind and shift the forest for an incoming edit batch.
	///
	/// Must run *before* the buffer mutates: overlap tests and deltas are
	/// computed in pre-edit coordinates. Passive batches only shift ranges.
	pub async fn apply_changes(&mut self, changes: &[ContentChange], new_version: i32) -> Result<()> {
		if self.running {
			if let Some(first) = self.first_affected(changes) {
				let parent_state = self
					.sentence(self.spine[first])
					.parent
					.and_then(|parent| self.sentence(parent).state_id)
					.or(self.root_state);
				let Some(parent_state) = parent_state else {
					return Err(Error::NotRunning);
				};
				debug!(keep = first, "edit overlaps executed sentences, rewinding");
				let prover = self.prover.clone();
				let result = prover.edit_at(parent_state).await;
				match result {
					Ok(change) => {
						self.note_focus_change(change);
						self.truncate_spine(first);
					}
					Err(Error::Prover(failure)) => {
						// The session state is unknowable if a rewind is
						// refused; start over.
						warn!(message = %failure.message, "edit_at refused during edit, resetting session");
						self.reset().await?;
					}
					Err(err) => {
						self.note_prover_error(&err);
						return Err(err);
					}
				}
			}
		}

		// Only now is the batch committed to land: a failed rewind returned
		// above with the buffer (and this version) untouched.
		self.doc_version = new_version;

		// Clear the failure record if the edit touches the attempted range,
		// otherwise let it shift along with the survivors.
		if let Some(id) = self.failure {
			let attempted = self.sentence(id).range;
			if changes.iter().any(|c| ranges_overlap(attempted, c.range)) {
				self.clear_failure();
			}
		}

		let mut ordered: Vec<&ContentChange> = changes.iter().collect();
		ordered.sort_by(|a, b| cmp_positions(b.range.start, a.range.start));
		for change in ordered {
			let delta = RangeDelta::for_change(change.range, &change.text);
			self.shift_after(change.range.end, delta);
		}

		self.focus = self
			.spine
			.last()
			.map(|id| self.sentence(*id).range.end)
			.unwrap_or_default();
		Ok(())
	}

	/// The goal view at the tip.
	pub async fn goal(&mut self) -> Result<Option<ProofView>> {
		if !self.running {
			return Err(Error::NotRunning);
		}
		let prover = self.prover.clone();
		let result = prover.goals().await;
		self.drain_events();
		if let Err(err) = &result {
			self.note_prover_error(err);
		}
		result
	}

	/// Run a non-mutating query at the tip.
	pub async fn do_query(&mut self, kind: QueryKind, argument: &str) -> Result<String> {
		if !self.running {
			return Err(Error::NotRunning);
		}
		let command = kind.command(argument);
		let prover = self.prover.clone();
		let result = prover.query(&command).await;
		self.drain_events();
		if let Err(err) = &result {
			self.note_prover_error(err);
		}
		result
	}

	/// Set the prover's output wrapping width.
	pub async fn resize(&mut self, columns: u32) -> Result<()> {
		if !self.running {
			return Err(Error::NotRunning);
		}
		self.prover.resize(columns).await
	}

	/// Request tactic profiling results, scoped to `state_id` when given.
	pub async fn request_ltac_profile(&mut self, state_id: Option<StateId>) -> Result<()> {
		if !self.running {
			return Err(Error::NotRunning);
		}
		self.prover.ltac_profile(state_id).await
	}

	/// Shut the prover session down. Subsequent mutating operations answer
	/// `NotRunning` until [`Stm::reset`].
	pub async fn shutdown(&mut self) -> Result<()> {
		if !self.running {
			return Ok(());
		}
		self.running = false;
		self.root_state = None;
		self.clear_forest();
		self.prover.shutdown().await
	}

	/// Discard the whole forest and bring up a fresh session.
	pub async fn reset(&mut self) -> Result<()> {
		if self.running {
			self.running = false;
			let _ = self.prover.shutdown().await;
		}
		self.clear_forest();
		self.root_state = None;
		let root = self.prover.init().await?;
		debug!(root = root.0, "prover session reset");
		self.root_state = Some(root);
		self.running = true;
		Ok(())
	}

	/// Process every event currently queued, in arrival order.
	pub fn pump_events(&mut self) {
		self.drain_events();
	}

	/// Await one prover event, then drain the queue. Returns false once the
	/// event stream is closed for good.
	pub async fn wait_event(&mut self) -> bool {
		let event = self.events.recv().await;
		match event {
			Some(event) => {
				self.handle_event(event);
				self.drain_events();
				true
			}
			None => {
				self.handle_died(None);
				false
			}
		}
	}

	fn sentence(&self, id: SentenceId) -> &Sentence {
		&self.sentences[id.0 as usize]
	}

	fn sentence_mut(&mut self, id: SentenceId) -> &mut Sentence {
		&mut self.sentences[id.0 as usize]
	}

	fn alloc(&mut self, sentence: Sentence) -> SentenceId {
		let id = SentenceId(self.sentences.len() as u32);
		self.sentences.push(sentence);
		id
	}

	/// Index of the first spine sentence any change overlaps.
	fn first_affected(&self, changes: &[ContentChange]) -> Option<usize> {
		self.spine
			.iter()
			.position(|id| changes.iter().any(|c| ranges_overlap(self.sentence(*id).range, c.range)))
	}

	/// Submit one sentence, racing the prover call against `cancel`.
	async fn submit(&mut self, text: String, range: Range, cancel: Option<&CancellationToken>) -> StepResult {
		let Some(parent_state) = self.tip_state() else {
			return StepResult::NotRunning;
		};
		self.observer.sentence_status(range, SentenceStatus::Parsed);

		let prover = self.prover.clone();
		let result = match cancel {
			None => prover.add(&text, parent_state, range.end, self.doc_version).await,
			Some(token) => {
				let add = prover.add(&text, parent_state, range.end, self.doc_version);
				tokio::pin!(add);
				tokio::select! {
					result = &mut add => result,
					_ = token.cancelled() => {
						// Stop the prover, then drive the in-flight call to
						// completion so its outcome is known: a sentence
						// that landed after the cut is discarded again.
						let _ = prover.interrupt().await;
						let late = add.await;
						self.observer.sentence_status(range, SentenceStatus::Cleared);
						if late.is_ok() {
							let rollback = prover.edit_at(parent_state).await;
							if let Err(err) = rollback {
								self.note_prover_error(&err);
							}
						}
						self.drain_events();
						return StepResult::Interrupted;
					}
				}
			}
		};

		match result {
			Ok(outcome) => {
				let parent = self.spine.last().copied();
				let id = self.alloc(Sentence {
					state_id: Some(outcome.state_id),
					range,
					text,
					status: SentenceStatus::Processing,
					parent,
					errors: Vec::new(),
				});
				self.spine.push(id);
				self.by_state.insert(outcome.state_id, id);
				self.focus = range.end;
				if let Some(hint) = outcome.focus_hint {
					debug!(hint = hint.0, "prover moved the focus on add");
				}
				self.observer.sentence_status(range, SentenceStatus::Processing);
				self.drain_events();
				StepResult::Ok
			}
			Err(Error::Prover(failure)) => {
				self.observer.sentence_status(range, SentenceStatus::Cleared);
				let error_range = failure
					.span
					.map(|span| span_to_doc_range(range.start, &text, span))
					.unwrap_or(range);
				let message = failure.message.clone();
				let id = self.alloc(Sentence {
					state_id: None,
					range,
					text,
					status: SentenceStatus::Error,
					parent: None,
					errors: vec![SentenceError {
						range: error_range,
						message: message.clone(),
					}],
				});
				self.failure = Some(id);
				self.drain_events();
				StepResult::Failure {
					message,
					range: error_range,
				}
			}
			Err(Error::Interrupted) => {
				self.observer.sentence_status(range, SentenceStatus::Cleared);
				self.drain_events();
				StepResult::Interrupted
			}
			Err(err) => self.step_error(err),
		}
	}

	/// Rewind the spine so `keep` sentences remain.
	async fn rewind_spine_to(&mut self, keep: usize) -> StepResult {
		if keep >= self.spine.len() {
			return StepResult::Ok;
		}
		let target_state = if keep == 0 {
			self.root_state
		} else {
			self.sentence(self.spine[keep - 1]).state_id
		};
		let Some(target_state) = target_state else {
			return StepResult::NotRunning;
		};
		let prover = self.prover.clone();
		let result = prover.edit_at(target_state).await;
		match result {
			Ok(change) => {
				self.note_focus_change(change);
				self.truncate_spine(keep);
				self.drain_events();
				StepResult::Ok
			}
			Err(Error::Prover(failure)) => {
				let range = self
					.spine
					.last()
					.map(|id| self.sentence(*id).range)
					.unwrap_or_default();
				self.drain_events();
				StepResult::Failure {
					message: failure.message,
					range,
				}
			}
			Err(err) => self.step_error(err),
		}
	}

	/// Drop every spine sentence past index `keep`, clearing highlights.
	fn truncate_spine(&mut self, keep: usize) {
		if keep >= self.spine.len() {
			return;
		}
		let removed: Vec<SentenceId> = self.spine.split_off(keep);
		let cleared = Range {
			start: self.sentence(removed[0]).range.start,
			end: self.sentence(removed[removed.len() - 1]).range.end,
		};
		for id in removed {
			let state_id = self.sentence(id).state_id;
			if let Some(state_id) = state_id {
				self.by_state.remove(&state_id);
			}
			self.sentence_mut(id).status = SentenceStatus::Cleared;
		}
		debug!(keep, ?cleared, "spine truncated");
		self.observer.sentence_status(cleared, SentenceStatus::Cleared);
		self.focus = self
			.spine
			.last()
			.map(|id| self.sentence(*id).range.end)
			.unwrap_or_default();
	}

	/// Shift every surviving range at or after `edit_end` by `delta`.
	fn shift_after(&mut self, edit_end: Position, delta: RangeDelta) {
		let ids: Vec<SentenceId> = self.spine.iter().copied().chain(self.failure).collect();
		for id in ids {
			let sentence = self.sentence_mut(id);
			if cmp_positions(sentence.range.start, edit_end) == Ordering::Less {
				continue;
			}
			sentence.range = delta.translate_range(sentence.range);
			for error in &mut sentence.errors {
				error.range = delta.translate_range(error.range);
			}
		}
	}

	fn record_parse_failure(&mut self, range: Range) {
		let id = self.alloc(Sentence {
			state_id: None,
			range,
			text: String::new(),
			status: SentenceStatus::Error,
			parent: None,
			errors: vec![SentenceError {
				range,
				message: "incomplete sentence".to_string(),
			}],
		});
		self.failure = Some(id);
	}

	fn clear_failure(&mut self) {
		if let Some(id) = self.failure.take() {
			self.sentence_mut(id).status = SentenceStatus::Cleared;
		}
	}

	/// Drop every sentence, on the spine or off it, and return the focus to
	/// the origin. Used when the session ends one way or another, so a
	/// not-running session never reports stale diagnostics.
	fn clear_forest(&mut self) {
		self.sentences.clear();
		self.spine.clear();
		self.by_state.clear();
		self.failure = None;
		self.focus = Position::default();
	}

	fn note_focus_change(&self, change: FocusChange) {
		if let FocusChange::NewFocus {
			qed_state_id,
			focus_state_id,
		} = change
		{
			// The linear spine has no node for a nested qed state; record
			// the prover's authoritative answer for diagnosis.
			debug!(qed = qed_state_id.0, focus = focus_state_id.0, "edit_at left a proof unfocused");
		}
	}

	/// Fold a non-recoverable prover error into session state.
	fn note_prover_error(&mut self, err: &Error) {
		match err {
			Error::Prover(_) | Error::Interrupted | Error::NotRunning => {}
			Error::Transport(reason) => {
				self.observer.message(MessageLevel::Error, reason, None);
				self.handle_died(Some(reason.clone()));
			}
			_ => self.handle_died(None),
		}
	}

	fn step_error(&mut self, err: Error) -> StepResult {
		self.note_prover_error(&err);
		match err {
			Error::Interrupted => StepResult::Interrupted,
			_ => StepResult::NotRunning,
		}
	}

	fn drain_events(&mut self) {
		loop {
			match self.events.try_recv() {
				Ok(event) => self.handle_event(event),
				Err(mpsc::error::TryRecvError::Empty) => break,
				Err(mpsc::error::TryRecvError::Disconnected) => {
					self.handle_died(None);
					break;
				}
			}
		}
	}

	fn handle_event(&mut self, event: ProverEvent) {
		match event {
			ProverEvent::Status { state_id, status } => {
				let Some(&id) = self.by_state.get(&state_id) else {
					trace!(state = state_id.0, "status for state not on the spine, dropped");
					return;
				};
				let status = SentenceStatus::from_exec(status);
				let sentence = self.sentence_mut(id);
				if status == SentenceStatus::Processing {
					// Fresh execution of the state; earlier errors are stale.
					sentence.errors.clear();
				}
				sentence.status = status;
				let range = sentence.range;
				self.observer.sentence_status(range, status);
			}
			ProverEvent::Error { state_id, span, message } => {
				let Some(&id) = self.by_state.get(&state_id) else {
					trace!(state = state_id.0, "error for state not on the spine, dropped");
					return;
				};
				let sentence = self.sentence_mut(id);
				let error_range = span
					.map(|span| span_to_doc_range(sentence.range.start, &sentence.text, span))
					.unwrap_or(sentence.range);
				sentence.errors.push(SentenceError {
					range: error_range,
					message,
				});
				sentence.status = SentenceStatus::Error;
				let range = sentence.range;
				self.observer.sentence_status(range, SentenceStatus::Error);
			}
			ProverEvent::Message { level, text, rich } => {
				self.observer.message(level, &text, rich.as_ref());
			}
			ProverEvent::LtacProfResults { results, .. } => {
				self.observer.ltac_prof_results(&results);
			}
			ProverEvent::Died { reason } => self.handle_died(reason),
		}
	}

	fn handle_died(&mut self, reason: Option<String>) {
		if !self.running {
			return;
		}
		warn!(?reason, "prover died");
		self.running = false;
		self.root_state = None;
		// The client is about to be told to reset its view; anything still
		// in the forest would resurface as stale diagnostics on the next
		// event pump.
		self.clear_forest();
		self.observer.prover_died();
	}
}

/// Resolve a char span within a sentence's text to a document range.
fn span_to_doc_range(start: Position, text: &str, span: (usize, usize)) -> Range {
	let prefix = |n: usize| {
		let end = text.char_indices().nth(n).map(|(i, _)| i).unwrap_or(text.len());
		&text[..end]
	};
	Range {
		start: advance_position(start, prefix(span.0)),
		end: advance_position(start, prefix(span.1)),
	}
}
