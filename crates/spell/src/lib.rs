//! Spell-check core: per-file single-flight analysis and mistake tracking.
//!
//! A word producer submits the complete candidate words of a file to
//! [`SpellService::submit`]. The scheduler runs at most one job per file,
//! collapsing requests that arrive meanwhile into a single follow-up. Results
//! land in the [`MistakeStore`], and observers learn about them through
//! [`SpellEvent`]s.
//!
//! * [`SpellService`]: owned entry point with a `start`/`shutdown` lifecycle
//! * [`Scheduler`]: single-flight dispatch over a [`JobHost`]
//! * [`MistakeStore`]: per-file mistake snapshots with point and text queries
//! * [`ActiveContext`]: focused file, cursor, and active project membership
//! * [`SpellChecker`]: seam to the actual dictionary

mod actions;
mod checker;
mod config;
mod context;
mod error;
mod events;
mod pipeline;
mod publisher;
mod scheduler;
mod service;
mod store;
#[cfg(test)]
mod test_support;
mod word;

pub use actions::{ReplacementPlan, context_suggestions, plan_replacement, targets};
pub use checker::{CheckerRegistry, SpellChecker};
pub use config::SpellConfig;
pub use context::{ActiveContext, FileDelta};
pub use error::{Result, SpellError};
pub use events::{EventHub, SpellEvent, SpellEventReceiver};
pub use pipeline::SpellPipeline;
pub use publisher::Publisher;
pub use scheduler::{
	CompletionOutcome, DiscardReason, IgnoreReason, Job, JobHost, JobOutcome, JobPriority, Scheduler, SchedulerStats, SubmitOutcome,
};
pub use service::SpellService;
pub use store::{FileSummary, MistakeStore};
pub use word::{Cursor, FileId, Mistakes, Word};
