use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::runtime::Runtime;

use crate::TaskClass;

/// Bounded background pool plus on-demand dedicated interactive threads.
///
/// Background tasks run on the blocking pool of a private Tokio runtime capped
/// at `background_threads`; excess tasks queue FIFO until a thread frees up.
/// Interactive tasks each get a fresh named OS thread and never wait on the
/// background queue.
pub struct WorkerPool {
	runtime: Option<Runtime>,
	background_threads: usize,
	interactive_seq: AtomicU64,
	running: Arc<RunningCounts>,
}

#[derive(Debug, Default)]
struct RunningCounts {
	interactive: AtomicUsize,
	background: AtomicUsize,
}

impl RunningCounts {
	fn slot(&self, class: TaskClass) -> &AtomicUsize {
		match class {
			TaskClass::Interactive => &self.interactive,
			TaskClass::Background => &self.background,
		}
	}
}

struct RunningGuard {
	counts: Arc<RunningCounts>,
	class: TaskClass,
}

impl RunningGuard {
	fn enter(counts: &Arc<RunningCounts>, class: TaskClass) -> Self {
		counts.slot(class).fetch_add(1, Ordering::AcqRel);
		Self {
			counts: Arc::clone(counts),
			class,
		}
	}
}

impl Drop for RunningGuard {
	fn drop(&mut self) {
		self.counts.slot(self.class).fetch_sub(1, Ordering::AcqRel);
	}
}

impl std::fmt::Debug for WorkerPool {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WorkerPool")
			.field("background_threads", &self.background_threads)
			.field("running_interactive", &self.running(TaskClass::Interactive))
			.field("running_background", &self.running(TaskClass::Background))
			.finish()
	}
}

impl WorkerPool {
	/// Builds a pool with `background_threads` background workers (at least one).
	pub fn new(background_threads: usize) -> std::io::Result<Self> {
		let background_threads = background_threads.max(1);
		let runtime = tokio::runtime::Builder::new_multi_thread()
			.worker_threads(1)
			.max_blocking_threads(background_threads)
			.thread_name(TaskClass::Background.thread_prefix())
			.build()?;
		tracing::debug!(background_threads, "worker.pool.start");
		Ok(Self {
			runtime: Some(runtime),
			background_threads,
			interactive_seq: AtomicU64::new(0),
			running: Arc::new(RunningCounts::default()),
		})
	}

	pub fn background_threads(&self) -> usize {
		self.background_threads
	}

	/// Number of tasks of `class` currently executing (queued tasks excluded).
	pub fn running(&self, class: TaskClass) -> usize {
		self.running.slot(class).load(Ordering::Acquire)
	}

	/// Runs `task` on the lane for `class` and returns the lane actually used.
	///
	/// If a dedicated interactive thread cannot be created the task falls back
	/// to the background pool instead of being lost.
	pub fn spawn<F>(&self, class: TaskClass, task: F) -> TaskClass
	where
		F: FnOnce() + Send + 'static,
	{
		tracing::trace!(worker_class = class.as_str(), "worker.spawn");
		match class {
			TaskClass::Background => {
				self.spawn_background(task);
				TaskClass::Background
			}
			TaskClass::Interactive => self.spawn_interactive(task),
		}
	}

	fn spawn_interactive<F>(&self, task: F) -> TaskClass
	where
		F: FnOnce() + Send + 'static,
	{
		let seq = self.interactive_seq.fetch_add(1, Ordering::Relaxed);
		let name = format!("{}-{seq}", TaskClass::Interactive.thread_prefix());
		let slot = Arc::new(Mutex::new(Some(task)));
		let thread_slot = Arc::clone(&slot);
		let counts = Arc::clone(&self.running);

		let spawned = spawn_named_thread(name, move || {
			let task = thread_slot.lock().take();
			if let Some(task) = task {
				let _running = RunningGuard::enter(&counts, TaskClass::Interactive);
				task();
			}
		});

		match spawned {
			Ok(_) => TaskClass::Interactive,
			Err(err) => {
				tracing::warn!(error = %err, "worker.spawn_interactive_failed; falling back to background pool");
				let task = slot.lock().take();
				if let Some(task) = task {
					self.spawn_background(task);
				}
				TaskClass::Background
			}
		}
	}

	#[allow(clippy::disallowed_methods)]
	fn spawn_background<F>(&self, task: F)
	where
		F: FnOnce() + Send + 'static,
	{
		let Some(runtime) = self.runtime.as_ref() else {
			tracing::debug!("worker.spawn_after_shutdown");
			return;
		};
		let counts = Arc::clone(&self.running);
		drop(runtime.spawn_blocking(move || {
			let _running = RunningGuard::enter(&counts, TaskClass::Background);
			task();
		}));
	}
}

impl Drop for WorkerPool {
	fn drop(&mut self) {
		if let Some(runtime) = self.runtime.take() {
			tracing::debug!("worker.pool.stop");
			// Safe to call from async contexts, unlike a plain drop.
			runtime.shutdown_background();
		}
	}
}

/// Spawns a dedicated named OS thread.
pub fn spawn_named_thread<F, R>(name: impl Into<String>, f: F) -> std::io::Result<std::thread::JoinHandle<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	let name = name.into();
	tracing::trace!(thread = %name, "worker.spawn_named_thread");
	std::thread::Builder::new().name(name).spawn(f)
}
