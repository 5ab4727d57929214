//! Shared test doubles for the stm and controller test modules.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lsp_types::{Diagnostic, Position, Range, Uri};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use tokio::sync::{Notify, mpsc};

use crate::error::{Error, ProverFailure, Result};
use crate::events::DocumentEvents;
use crate::protocol::{ComputingStatus, HighlightUpdate};
use crate::prover::{
	AddOutcome, ExecStatus, FocusChange, MessageLevel, ProofView, ProverClient, ProverEvent, StateId,
};
use crate::stm::{CommandSource, NextCommand, SentenceStatus, StmObserver};

/// Root state every scripted session starts from.
pub const ROOT: StateId = StateId(1);

pub fn pos(line: u32, character: u32) -> Position {
	Position { line, character }
}

pub fn range(start: (u32, u32), end: (u32, u32)) -> Range {
	Range {
		start: pos(start.0, start.1),
		end: pos(end.0, end.1),
	}
}

/// A line-0 sentence command for a [`VecSource`].
pub fn sentence(text: &str, start: u32, end: u32) -> NextCommand {
	NextCommand::Sentence {
		text: text.to_string(),
		range: range((0, start), (0, end)),
	}
}

/// Command source over a fixed script.
pub struct VecSource(std::vec::IntoIter<NextCommand>);

impl VecSource {
	pub fn new(commands: Vec<NextCommand>) -> Self {
		Self(commands.into_iter())
	}
}

impl CommandSource for VecSource {
	fn next(&mut self) -> NextCommand {
		self.0.next().unwrap_or(NextCommand::End)
	}
}

/// Scripted in-process prover: sequential state ids, optional failures,
/// optional blocking until interrupt, and a manual event channel.
pub struct ScriptedProver {
	next_state: AtomicU64,
	pub inits: AtomicUsize,
	pub interrupts: AtomicUsize,
	/// Successful adds as `(text, parent, new_state)`.
	pub added: Mutex<Vec<(String, StateId, StateId)>>,
	/// Document versions seen by `add`, in call order.
	pub add_versions: Mutex<Vec<i32>>,
	pub edits: Mutex<Vec<StateId>>,
	/// When set, `edit_at` fails as interrupted without recording anything.
	pub interrupt_edits: AtomicBool,
	pub queries: Mutex<Vec<String>>,
	pub resizes: Mutex<Vec<u32>>,
	pub ltac_requests: Mutex<Vec<Option<StateId>>>,
	fail_on: Mutex<Vec<(String, (usize, usize), String)>>,
	block_on: Mutex<Option<String>>,
	/// When set, a blocked add succeeds after release instead of failing.
	pub block_release_ok: AtomicBool,
	delay_on: Mutex<Option<(String, Duration)>>,
	/// Notified when a blocking add has started.
	pub add_blocked: Notify,
	release: Notify,
	goals: Mutex<Option<ProofView>>,
	events_tx: mpsc::UnboundedSender<ProverEvent>,
	events_rx: Mutex<Option<mpsc::UnboundedReceiver<ProverEvent>>>,
	/// Emit a `Complete` status event after every successful add.
	pub auto_complete: AtomicBool,
}

impl ScriptedProver {
	pub fn new() -> Arc<Self> {
		let (events_tx, events_rx) = mpsc::unbounded_channel();
		Arc::new(Self {
			next_state: AtomicU64::new(2),
			inits: AtomicUsize::new(0),
			interrupts: AtomicUsize::new(0),
			added: Mutex::new(Vec::new()),
			add_versions: Mutex::new(Vec::new()),
			edits: Mutex::new(Vec::new()),
			interrupt_edits: AtomicBool::new(false),
			queries: Mutex::new(Vec::new()),
			resizes: Mutex::new(Vec::new()),
			ltac_requests: Mutex::new(Vec::new()),
			fail_on: Mutex::new(Vec::new()),
			block_on: Mutex::new(None),
			block_release_ok: AtomicBool::new(false),
			delay_on: Mutex::new(None),
			add_blocked: Notify::new(),
			release: Notify::new(),
			goals: Mutex::new(None),
			events_tx,
			events_rx: Mutex::new(Some(events_rx)),
			auto_complete: AtomicBool::new(true),
		})
	}

	/// Make `add` fail for this exact command text.
	pub fn fail_on(&self, text: &str, span: (usize, usize), message: &str) {
		self.fail_on
			.lock()
			.push((text.to_string(), span, message.to_string()));
	}

	/// Make `add` block for this exact command text until interrupted.
	pub fn block_on(&self, text: &str) {
		*self.block_on.lock() = Some(text.to_string());
	}

	/// Make `add` sleep for this exact command text.
	pub fn delay_on(&self, text: &str, delay: Duration) {
		*self.delay_on.lock() = Some((text.to_string(), delay));
	}

	pub fn set_goals(&self, view: Option<ProofView>) {
		*self.goals.lock() = view;
	}

	pub fn emit(&self, event: ProverEvent) {
		let _ = self.events_tx.send(event);
	}
}

#[async_trait]
impl ProverClient for ScriptedProver {
	fn events(&self) -> mpsc::UnboundedReceiver<ProverEvent> {
		self.events_rx
			.lock()
			.take()
			.expect("events() called twice on ScriptedProver")
	}

	async fn init(&self) -> Result<StateId> {
		self.inits.fetch_add(1, Ordering::SeqCst);
		self.next_state.store(2, Ordering::SeqCst);
		Ok(ROOT)
	}

	async fn add(&self, text: &str, parent: StateId, _end_pos: Position, version: i32) -> Result<AddOutcome> {
		self.add_versions.lock().push(version);
		let blocked = self.block_on.lock().as_deref() == Some(text);
		if blocked {
			self.add_blocked.notify_one();
			self.release.notified().await;
			if !self.block_release_ok.load(Ordering::SeqCst) {
				return Err(Error::Interrupted);
			}
		}
		let delay = self.delay_on.lock().clone();
		if let Some((delayed, duration)) = delay {
			if delayed == text {
				tokio::time::sleep(duration).await;
			}
		}
		let failure = self
			.fail_on
			.lock()
			.iter()
			.find(|(t, ..)| t == text)
			.map(|(_, span, message)| (*span, message.clone()));
		if let Some((span, message)) = failure {
			return Err(Error::Prover(ProverFailure {
				state_id: Some(parent),
				span: Some(span),
				message,
			}));
		}
		let state = StateId(self.next_state.fetch_add(1, Ordering::SeqCst));
		self.added.lock().push((text.to_string(), parent, state));
		if self.auto_complete.load(Ordering::SeqCst) {
			self.emit(ProverEvent::Status {
				state_id: state,
				status: ExecStatus::Complete,
			});
		}
		Ok(AddOutcome {
			state_id: state,
			focus_hint: None,
		})
	}

	async fn edit_at(&self, state_id: StateId) -> Result<FocusChange> {
		if self.interrupt_edits.load(Ordering::SeqCst) {
			return Err(Error::Interrupted);
		}
		self.edits.lock().push(state_id);
		Ok(FocusChange::NewTip { state_id })
	}

	async fn goals(&self) -> Result<Option<ProofView>> {
		Ok(self.goals.lock().clone())
	}

	async fn query(&self, command: &str) -> Result<String> {
		self.queries.lock().push(command.to_string());
		Ok(format!("answer: {command}"))
	}

	async fn interrupt(&self) -> Result<()> {
		self.interrupts.fetch_add(1, Ordering::SeqCst);
		self.release.notify_one();
		Ok(())
	}

	async fn resize(&self, columns: u32) -> Result<()> {
		self.resizes.lock().push(columns);
		Ok(())
	}

	async fn ltac_profile(&self, state_id: Option<StateId>) -> Result<()> {
		self.ltac_requests.lock().push(state_id);
		Ok(())
	}

	async fn shutdown(&self) -> Result<()> {
		Ok(())
	}
}

/// STM observer that records everything it sees.
#[derive(Default)]
pub struct RecordingObserver {
	pub statuses: Mutex<Vec<(Range, SentenceStatus)>>,
	pub messages: Mutex<Vec<(MessageLevel, String)>>,
	pub ltac: Mutex<Vec<JsonValue>>,
	pub died: AtomicUsize,
}

impl StmObserver for RecordingObserver {
	fn sentence_status(&self, range: Range, status: SentenceStatus) {
		self.statuses.lock().push((range, status));
	}

	fn message(&self, level: MessageLevel, text: &str, _rich: Option<&JsonValue>) {
		self.messages.lock().push((level, text.to_string()));
	}

	fn ltac_prof_results(&self, results: &JsonValue) {
		self.ltac.lock().push(results.clone());
	}

	fn prover_died(&self) {
		self.died.fetch_add(1, Ordering::SeqCst);
	}
}

/// Callback bag that records everything it sees.
#[derive(Default)]
pub struct RecordingEvents {
	pub highlights: Mutex<Vec<HighlightUpdate>>,
	pub diagnostics: Mutex<Vec<Vec<Diagnostic>>>,
	pub messages: Mutex<Vec<(MessageLevel, String)>>,
	pub computing: Mutex<Vec<(ComputingStatus, Duration)>>,
	pub ltac: Mutex<Vec<JsonValue>>,
	pub resets: AtomicUsize,
}

impl RecordingEvents {
	/// The most recently published diagnostics list.
	pub fn last_diagnostics(&self) -> Vec<Diagnostic> {
		self.diagnostics.lock().last().cloned().unwrap_or_default()
	}
}

impl DocumentEvents for RecordingEvents {
	fn highlights(&self, updates: &[HighlightUpdate]) {
		self.highlights.lock().extend_from_slice(updates);
	}

	fn diagnostics(&self, _uri: &Uri, diagnostics: Vec<Diagnostic>) {
		self.diagnostics.lock().push(diagnostics);
	}

	fn message(&self, level: MessageLevel, text: &str, _rich: Option<&JsonValue>) {
		self.messages.lock().push((level, text.to_string()));
	}

	fn reset(&self) {
		self.resets.fetch_add(1, Ordering::SeqCst);
	}

	fn computing(&self, status: ComputingStatus, elapsed: Duration) {
		self.computing.lock().push((status, elapsed));
	}

	fn ltac_prof_results(&self, results: &JsonValue) {
		self.ltac.lock().push(results.clone());
	}
}
