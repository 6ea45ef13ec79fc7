/// Execution lane a task is scheduled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Latency-sensitive work for the file being edited. Runs on its own
	/// dedicated thread so it never queues behind background work.
	Interactive,
	/// Bulk work that shares the bounded background pool.
	Background,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
		}
	}

	pub(crate) const fn thread_prefix(self) -> &'static str {
		match self {
			Self::Interactive => "lector-interactive",
			Self::Background => "lector-background",
		}
	}
}

impl std::fmt::Display for TaskClass {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
