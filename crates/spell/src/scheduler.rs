//! Single-flight analysis scheduling, one job per file.
//!
//! [`Scheduler`] owns the in-flight table and the pending table:
//! - At most one job executes per file at any time.
//! - Requests arriving while a file's job runs overwrite that file's pending
//!   entry (last write wins) instead of queueing.
//! - When a job finishes, its result is published first and the pending
//!   entry, if any, starts exactly one follow-up job.
//! - The focused file runs on a dedicated interactive thread, everything else
//!   shares the bounded background pool.
//!
//! # Locking
//!
//! One mutex guards table membership and the shutdown flag. It is never held
//! while a job executes or while results are published.
//!
//! # Cancellation
//!
//! [`Scheduler::cancel_all`] cancels every job cooperatively and blocks until
//! each reaches a terminal state or the drain timeout passes. A cancelled job
//! keeps its file's slot until it actually ends, so requests made during the
//! drain coalesce behind it. Its result is discarded once its token is
//! cancelled, whether or not it cooperated.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use lector_worker::{CancellationToken, CompletionGuard, CompletionLatch, TaskClass, TaskId, TaskIdClock, TaskToken, WorkerPool};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::word::{FileId, Mistakes, Word};

/// Execution priority of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPriority {
	/// The focused file: dedicated thread, minimal latency.
	High,
	/// Any other file: bounded background pool.
	Low,
}

impl JobPriority {
	pub const fn class(self) -> TaskClass {
		match self {
			Self::High => TaskClass::Interactive,
			Self::Low => TaskClass::Background,
		}
	}
}

/// One analysis pass over a file's candidate words.
#[derive(Debug, Clone)]
pub struct Job {
	pub id: TaskId,
	pub file: FileId,
	/// Every candidate word of the file at submission time.
	pub words: Vec<Word>,
	/// The file's mistakes when the job was created.
	pub baseline: Mistakes,
	pub priority: JobPriority,
}

/// Terminal result of executing a [`Job`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
	/// The mistakes found.
	Completed(Vec<Word>),
	/// The job observed its cancellation token and stopped early.
	Cancelled,
}

/// The side of the scheduler that knows how to analyse and publish.
pub trait JobHost: Send + Sync + 'static {
	/// Current mistakes for `file`, handed to new jobs.
	fn baseline(&self, file: &FileId) -> Mistakes;

	/// Priority for a job about to start on `file`.
	fn priority(&self, file: &FileId) -> JobPriority;

	/// Executes `job`. Should poll `token` between units of work.
	fn run(&self, job: &Job, token: &TaskToken) -> JobOutcome;

	/// Applies a completed job's mistakes.
	fn publish(&self, file: &FileId, words: Vec<Word>);
}

/// Why a request was absorbed without starting or recording anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
	/// Empty file id or no words.
	EmptyInput,
	/// The scheduler is shutting down.
	ShutdownInProgress,
}

/// Result of [`Scheduler::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
	/// A new job was started.
	Started { id: TaskId, priority: JobPriority },
	/// A job is already in flight; the words replaced the file's pending request.
	Coalesced,
	Ignored(IgnoreReason),
}

/// Why a finished job's result was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
	Cancelled,
	ShutdownInProgress,
	/// The job is no longer the one registered for its file.
	StaleHandle,
}

/// Result of handling one job completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
	Published { follow_up: Option<TaskId> },
	Discarded(DiscardReason),
}

/// Counters describing scheduler activity since construction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
	pub started: u64,
	pub coalesced: u64,
	pub ignored: u64,
	pub published: u64,
	pub discarded: u64,
}

#[derive(Debug, Default)]
struct Counters {
	started: AtomicU64,
	coalesced: AtomicU64,
	ignored: AtomicU64,
	published: AtomicU64,
	discarded: AtomicU64,
}

impl Counters {
	fn inc(counter: &AtomicU64) {
		counter.fetch_add(1, Ordering::Relaxed);
	}

	fn snapshot(&self) -> SchedulerStats {
		SchedulerStats {
			started: self.started.load(Ordering::Relaxed),
			coalesced: self.coalesced.load(Ordering::Relaxed),
			ignored: self.ignored.load(Ordering::Relaxed),
			published: self.published.load(Ordering::Relaxed),
			discarded: self.discarded.load(Ordering::Relaxed),
		}
	}
}

struct InFlight {
	id: TaskId,
	token: TaskToken,
	done: CompletionLatch,
}

#[derive(Default)]
struct SchedulerState {
	in_flight: HashMap<FileId, InFlight>,
	pending: HashMap<FileId, Vec<Word>>,
	shutting_down: bool,
}

impl SchedulerState {
	fn is_tracked(&self, file: &FileId, id: TaskId) -> bool {
		self.in_flight.get(file).is_some_and(|entry| entry.id == id)
	}
}

/// A cancelled job `cancel_all` is waiting on.
struct Draining {
	file: FileId,
	id: TaskId,
	done: CompletionLatch,
}

/// A job registered in the in-flight table but not yet handed to the pool.
struct Registered {
	id: TaskId,
	file: FileId,
	words: Vec<Word>,
	token: TaskToken,
	guard: CompletionGuard,
}

struct SchedulerInner {
	state: Mutex<SchedulerState>,
	host: Arc<dyn JobHost>,
	pool: WorkerPool,
	ids: TaskIdClock,
	/// Parent of every job token; cancelled on shutdown.
	root: CancellationToken,
	drain_timeout: Duration,
	counters: Counters,
}

/// Per-file single-flight job dispatcher.
pub struct Scheduler {
	inner: Arc<SchedulerInner>,
}

impl std::fmt::Debug for Scheduler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.inner.state.lock();
		f.debug_struct("Scheduler")
			.field("in_flight", &state.in_flight.len())
			.field("pending", &state.pending.len())
			.field("shutting_down", &state.shutting_down)
			.field("pool", &self.inner.pool)
			.finish()
	}
}

impl Scheduler {
	pub fn new(host: Arc<dyn JobHost>, pool: WorkerPool, drain_timeout: Duration) -> Self {
		Self {
			inner: Arc::new(SchedulerInner {
				state: Mutex::new(SchedulerState::default()),
				host,
				pool,
				ids: TaskIdClock::new(),
				root: CancellationToken::new(),
				drain_timeout,
				counters: Counters::default(),
			}),
		}
	}

	/// Requests analysis of `words`, the complete candidate set of `file`.
	///
	/// Never blocks on job execution.
	pub fn submit(&self, file: FileId, words: Vec<Word>) -> SubmitOutcome {
		let inner = &self.inner;
		if file.is_empty() || words.is_empty() {
			trace!(file = %file, "spell.scheduler.empty_input");
			Counters::inc(&inner.counters.ignored);
			return SubmitOutcome::Ignored(IgnoreReason::EmptyInput);
		}

		let registered = {
			let mut state = inner.state.lock();
			if state.shutting_down {
				trace!(file = %file, "spell.scheduler.submit_after_shutdown");
				Counters::inc(&inner.counters.ignored);
				return SubmitOutcome::Ignored(IgnoreReason::ShutdownInProgress);
			}
			if state.in_flight.contains_key(&file) {
				let superseded = state.pending.insert(file.clone(), words).is_some();
				trace!(file = %file, superseded, "spell.scheduler.coalesced");
				Counters::inc(&inner.counters.coalesced);
				return SubmitOutcome::Coalesced;
			}
			inner.register(&mut state, file, words)
		};

		let (id, priority) = inner.dispatch(registered);
		SubmitOutcome::Started { id, priority }
	}

	/// Cancels every in-flight job, drops all pending requests, and blocks
	/// until the cancelled jobs have finished (bounded by the drain timeout).
	/// A job still running at the deadline keeps its slot until it ends.
	///
	/// Returns the number of jobs that were in flight.
	pub fn cancel_all(&self) -> usize {
		self.inner.cancel_all()
	}

	/// Stops accepting work and drains. Later submits and completions are absorbed.
	pub fn shutdown(&self) -> usize {
		{
			let mut state = self.inner.state.lock();
			if state.shutting_down {
				return 0;
			}
			state.shutting_down = true;
		}
		debug!("spell.scheduler.shutdown");
		self.inner.root.cancel();
		self.inner.cancel_all()
	}

	pub fn is_shutting_down(&self) -> bool {
		self.inner.state.lock().shutting_down
	}

	pub fn in_flight_count(&self) -> usize {
		self.inner.state.lock().in_flight.len()
	}

	pub fn pending_count(&self) -> usize {
		self.inner.state.lock().pending.len()
	}

	pub fn is_in_flight(&self, file: &str) -> bool {
		self.inner.state.lock().in_flight.contains_key(file)
	}

	/// The words waiting to be analysed once `file`'s current job finishes.
	pub fn pending_words(&self, file: &str) -> Option<Vec<Word>> {
		self.inner.state.lock().pending.get(file).cloned()
	}

	pub fn stats(&self) -> SchedulerStats {
		self.inner.counters.snapshot()
	}
}

impl Drop for Scheduler {
	fn drop(&mut self) {
		self.shutdown();
	}
}

impl SchedulerInner {
	/// Claims the in-flight slot for `file`. Caller holds the state lock.
	fn register(&self, state: &mut SchedulerState, file: FileId, words: Vec<Word>) -> Registered {
		let id = self.ids.next();
		let token = TaskToken::child_of(id, &self.root);
		let (done, guard) = CompletionLatch::new();
		state.in_flight.insert(
			file.clone(),
			InFlight {
				id,
				token: token.clone(),
				done,
			},
		);
		Registered {
			id,
			file,
			words,
			token,
			guard,
		}
	}

	/// Builds the job for a registered slot and hands it to the pool.
	fn dispatch(self: &Arc<Self>, registered: Registered) -> (TaskId, JobPriority) {
		let Registered {
			id,
			file,
			words,
			token,
			guard,
		} = registered;

		let priority = self.host.priority(&file);
		let baseline = self.host.baseline(&file);
		let job = Job {
			id,
			file,
			words,
			baseline,
			priority,
		};
		debug!(
			id = %job.id,
			file = %job.file,
			words = job.words.len(),
			baseline = job.baseline.len(),
			?priority,
			"spell.scheduler.job_start"
		);
		Counters::inc(&self.counters.started);

		let host = Arc::clone(&self.host);
		let scheduler: Weak<Self> = Arc::downgrade(self);
		let lane = self.pool.spawn(priority.class(), move || {
			// Declared first so the latch opens only after everything below is dropped.
			let _done = guard;
			let outcome = execute(host.as_ref(), &job, &token);
			drop(host);
			if let Some(scheduler) = scheduler.upgrade() {
				let completion = scheduler.complete(job.file.clone(), job.id, &token, outcome);
				debug!(id = %job.id, file = %job.file, ?completion, "spell.scheduler.job_done");
			}
		});
		if lane != priority.class() {
			debug!(id = %id, ?priority, lane = lane.as_str(), "spell.scheduler.lane_fallback");
		}
		(id, priority)
	}

	/// Handles one finished job: publish, then release the slot and start
	/// the coalesced follow-up if there is one.
	fn complete(self: &Arc<Self>, file: FileId, id: TaskId, token: &TaskToken, outcome: JobOutcome) -> CompletionOutcome {
		let words = {
			let mut state = self.state.lock();
			if state.shutting_down {
				if state.is_tracked(&file, id) {
					state.in_flight.remove(&file);
				}
				return self.discard(DiscardReason::ShutdownInProgress);
			}
			if !state.is_tracked(&file, id) {
				let reason = if token.is_cancelled() {
					DiscardReason::Cancelled
				} else {
					DiscardReason::StaleHandle
				};
				return self.discard(reason);
			}
			match outcome {
				JobOutcome::Completed(words) if !token.is_cancelled() => words,
				_ => {
					// Cancelled but still registered: free the slot so the file is not stuck.
					let follow_up = self.release(&mut state, &file, id);
					drop(state);
					if let Some(registered) = follow_up {
						self.dispatch(registered);
					}
					return self.discard(DiscardReason::Cancelled);
				}
			}
		};

		// The slot stays claimed while publishing so results for one file land in order.
		self.host.publish(&file, words);
		Counters::inc(&self.counters.published);

		let follow_up = {
			let mut state = self.state.lock();
			self.release(&mut state, &file, id)
		};
		let follow_up = follow_up.map(|registered| self.dispatch(registered).0);
		CompletionOutcome::Published { follow_up }
	}

	/// Removes job `id` from the table and registers the pending follow-up, if any.
	fn release(&self, state: &mut SchedulerState, file: &FileId, id: TaskId) -> Option<Registered> {
		if !state.is_tracked(file, id) {
			return None;
		}
		state.in_flight.remove(file);
		if state.shutting_down {
			return None;
		}
		let words = state.pending.remove(file)?;
		trace!(file = %file, words = words.len(), "spell.scheduler.follow_up");
		Some(self.register(state, file.clone(), words))
	}

	fn discard(&self, reason: DiscardReason) -> CompletionOutcome {
		Counters::inc(&self.counters.discarded);
		CompletionOutcome::Discarded(reason)
	}

	fn cancel_all(self: &Arc<Self>) -> usize {
		// Slots stay claimed until their jobs end, so a submit during the
		// drain coalesces instead of starting a second execution.
		let (jobs, dropped_pending) = {
			let mut state = self.state.lock();
			let dropped_pending = state.pending.len();
			state.pending.clear();
			let jobs: Vec<Draining> = state
				.in_flight
				.iter()
				.map(|(file, job)| Draining {
					file: file.clone(),
					id: job.id,
					done: job.done.clone(),
				})
				.collect();
			for job in state.in_flight.values() {
				job.token.cancel();
			}
			(jobs, dropped_pending)
		};

		let deadline = Instant::now() + self.drain_timeout;
		let mut stuck = 0;
		for job in &jobs {
			if !job.done.wait_until(deadline) {
				stuck += 1;
				warn!(id = %job.id, file = %job.file, timeout_ms = self.drain_timeout.as_millis() as u64, "spell.scheduler.drain_timeout");
			}
		}

		// Jobs that ended without reporting back (never ran) still hold their slot.
		let follow_ups: Vec<Registered> = {
			let mut state = self.state.lock();
			jobs.iter()
				.filter(|job| job.done.is_done())
				.filter_map(|job| self.release(&mut state, &job.file, job.id))
				.collect()
		};
		for registered in follow_ups {
			self.dispatch(registered);
		}

		debug!(jobs = jobs.len(), stuck, dropped_pending, "spell.scheduler.cancel_all");
		jobs.len()
	}
}

/// Runs `job` on the host, converting a panic into an empty result.
fn execute(host: &dyn JobHost, job: &Job, token: &TaskToken) -> JobOutcome {
	if token.is_cancelled() {
		return JobOutcome::Cancelled;
	}
	match panic::catch_unwind(AssertUnwindSafe(|| host.run(job, token))) {
		Ok(outcome) => outcome,
		Err(payload) => {
			warn!(
				id = %job.id,
				file = %job.file,
				panic = panic_message(payload.as_ref()).unwrap_or("<non-string payload>"),
				"spell.scheduler.job_panicked"
			);
			JobOutcome::Completed(Vec::new())
		}
	}
}

/// Extracts the message from a panic payload, if it is a string.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> Option<&str> {
	payload
		.downcast_ref::<&'static str>()
		.copied()
		.or_else(|| payload.downcast_ref::<String>().map(String::as_str))
}
