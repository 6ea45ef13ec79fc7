//! Execution primitives for background analysis jobs.
//!
//! * [`WorkerPool`]: bounded background lane plus dedicated interactive threads
//! * [`TaskToken`] / [`TaskIdClock`]: cooperative cancellation and task identity
//! * [`CompletionLatch`]: synchronous drain point for in-flight tasks

mod class;
mod latch;
mod pool;
mod token;

pub use class::TaskClass;
pub use latch::{CompletionGuard, CompletionLatch};
pub use pool::{WorkerPool, spawn_named_thread};
pub use token::{TaskId, TaskIdClock, TaskToken};
pub use tokio_util::sync::CancellationToken;
