use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Identifier of one submitted task. Never reused within a [`TaskIdClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Monotonic id source for tasks.
#[derive(Debug, Default, Clone)]
pub struct TaskIdClock {
	next: Arc<AtomicU64>,
}

impl TaskIdClock {
	/// Creates a clock whose first id is 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next task id.
	pub fn next(&self) -> TaskId {
		TaskId(self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1))
	}
}

/// Cooperative cancellation flag scoped to one task.
///
/// Cancellation is best-effort: the task observes it only where it polls
/// [`TaskToken::is_cancelled`].
#[derive(Debug, Clone)]
pub struct TaskToken {
	id: TaskId,
	cancel: CancellationToken,
}

impl TaskToken {
	pub fn new(id: TaskId) -> Self {
		Self {
			id,
			cancel: CancellationToken::new(),
		}
	}

	/// Creates a token that is also cancelled when `parent` is.
	pub fn child_of(id: TaskId, parent: &CancellationToken) -> Self {
		Self {
			id,
			cancel: parent.child_token(),
		}
	}

	pub const fn id(&self) -> TaskId {
		self.id
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	pub fn cancel(&self) {
		self.cancel.cancel();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clock_starts_at_one_and_is_monotonic() {
		let clock = TaskIdClock::new();
		let shared = clock.clone();
		assert_eq!(clock.next(), TaskId(1));
		assert_eq!(shared.next(), TaskId(2));
		assert_eq!(clock.next(), TaskId(3));
	}

	#[test]
	fn child_token_follows_parent() {
		let parent = CancellationToken::new();
		let token = TaskToken::child_of(TaskId(7), &parent);
		assert!(!token.is_cancelled());
		parent.cancel();
		assert!(token.is_cancelled());
		assert_eq!(token.id(), TaskId(7));
	}

	#[test]
	fn cancelling_a_clone_is_visible_to_every_holder() {
		let token = TaskToken::new(TaskId(1));
		token.clone().cancel();
		assert!(token.is_cancelled());
	}
}
