//! One-shot completion signalling between a task and whoever drains it.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct LatchState {
	done: Mutex<bool>,
	cond: Condvar,
}

/// Waiting side of a task completion signal.
///
/// The latch opens when the paired [`CompletionGuard`] is dropped, whether
/// the task ran to the end, unwound, or was discarded before it started.
#[derive(Debug, Clone)]
pub struct CompletionLatch {
	state: Arc<LatchState>,
}

/// Signalling side of a [`CompletionLatch`]. Opens the latch on drop.
#[derive(Debug)]
pub struct CompletionGuard {
	state: Arc<LatchState>,
}

impl CompletionLatch {
	/// Creates a closed latch and the guard that opens it.
	pub fn new() -> (Self, CompletionGuard) {
		let state = Arc::new(LatchState::default());
		(
			Self {
				state: Arc::clone(&state),
			},
			CompletionGuard { state },
		)
	}

	pub fn is_done(&self) -> bool {
		*self.state.done.lock()
	}

	/// Blocks until the latch opens or `deadline` passes. Returns whether it opened.
	pub fn wait_until(&self, deadline: Instant) -> bool {
		let mut done = self.state.done.lock();
		while !*done {
			if self.state.cond.wait_until(&mut done, deadline).timed_out() {
				return *done;
			}
		}
		true
	}
}

impl Drop for CompletionGuard {
	fn drop(&mut self) {
		*self.state.done.lock() = true;
		self.state.cond.notify_all();
	}
}
