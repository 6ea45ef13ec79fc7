//! The spell-check core as one explicitly owned service.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use lector_worker::WorkerPool;
use tracing::{debug, info, warn};

use crate::actions::{self, ReplacementPlan};
use crate::checker::{CheckerRegistry, SpellChecker};
use crate::config::SpellConfig;
use crate::context::{ActiveContext, FileDelta};
use crate::error::Result;
use crate::events::{EventHub, SpellEvent, SpellEventReceiver};
use crate::pipeline::SpellPipeline;
use crate::publisher::Publisher;
use crate::scheduler::{Scheduler, SchedulerStats, SubmitOutcome};
use crate::store::{FileSummary, MistakeStore};
use crate::word::{Cursor, FileId, Mistakes, Word};

#[derive(Debug, Clone, Copy)]
enum Learn {
	Add,
	Ignore,
}

impl Learn {
	const fn as_str(self) -> &'static str {
		match self {
			Self::Add => "add",
			Self::Ignore => "ignore",
		}
	}
}

/// Owns the mistake store, the active context, and the scheduler, and wires
/// them to the registered spelling capabilities.
///
/// Construct with [`SpellService::start`]; dropping the service shuts it down
/// and waits for in-flight jobs.
#[derive(Debug)]
pub struct SpellService {
	config: SpellConfig,
	store: Arc<MistakeStore>,
	context: Arc<ActiveContext>,
	events: Arc<EventHub>,
	publisher: Arc<Publisher>,
	checkers: Arc<CheckerRegistry>,
	scheduler: Scheduler,
}

impl SpellService {
	/// Validates `config` and starts the worker pool.
	pub fn start(config: SpellConfig) -> Result<Self> {
		config.validate()?;
		let pool = WorkerPool::new(config.background_threads)?;

		let store = Arc::new(MistakeStore::new());
		let context = Arc::new(ActiveContext::new());
		let events = Arc::new(EventHub::new());
		let publisher = Arc::new(Publisher::new(Arc::clone(&store), Arc::clone(&context), Arc::clone(&events)));
		let checkers = Arc::new(CheckerRegistry::new());
		let pipeline = SpellPipeline::new(Arc::clone(&store), Arc::clone(&context), Arc::clone(&publisher), Arc::clone(&checkers));
		let scheduler = Scheduler::new(Arc::new(pipeline), pool, config.drain_timeout());

		info!(
			background_threads = config.background_threads,
			drain_timeout_ms = config.drain_timeout_ms,
			"spell.service.start"
		);
		Ok(Self {
			config,
			store,
			context,
			events,
			publisher,
			checkers,
			scheduler,
		})
	}

	/// Registers `checker` and returns the service, for builder-style setup.
	#[must_use]
	pub fn with_checker(self, checker: Arc<dyn SpellChecker>) -> Self {
		self.add_checker(checker);
		self
	}

	pub fn config(&self) -> &SpellConfig {
		&self.config
	}

	/// Opens a new event stream. Events emitted before this call are not replayed.
	pub fn subscribe(&self) -> SpellEventReceiver {
		self.events.subscribe()
	}

	/// Registers a spelling capability. The first one becomes active.
	pub fn add_checker(&self, checker: Arc<dyn SpellChecker>) -> bool {
		self.checkers.add(checker)
	}

	/// Switches the active capability. Existing mistakes stay until their
	/// files are re-analysed, which checks every word again.
	pub fn set_checker(&self, name: &str) -> Result<()> {
		self.checkers.select(name)
	}

	pub fn checker_names(&self) -> Vec<String> {
		self.checkers.names()
	}

	pub fn active_checker(&self) -> Option<String> {
		self.checkers.active_name()
	}

	/// Requests analysis of `words`, the complete candidate set for `file`.
	pub fn submit(&self, file: impl Into<FileId>, words: Vec<Word>) -> SubmitOutcome {
		self.scheduler.submit(file.into(), words)
	}

	/// Cancels and drains all analysis without publishing.
	pub fn cancel_all(&self) -> usize {
		self.scheduler.cancel_all()
	}

	pub fn is_analysing(&self, file: &str) -> bool {
		self.scheduler.is_in_flight(file)
	}

	pub fn scheduler_stats(&self) -> SchedulerStats {
		self.scheduler.stats()
	}

	pub fn mistakes_for_file(&self, file: &str) -> Mistakes {
		self.store.mistakes_for_file(file)
	}

	pub fn word_at(&self, file: &str, line: u32, column: u32) -> Option<Word> {
		self.store.word_at(file, line, column)
	}

	/// Mistakes in `file` whose text equals `text` exactly.
	pub fn occurrences_of(&self, file: &str, text: &str) -> Vec<Word> {
		self.store.occurrences_of(file, text)
	}

	pub fn summaries(&self) -> Vec<FileSummary> {
		self.store.summaries()
	}

	pub fn current_file(&self) -> Option<FileId> {
		self.context.current_file()
	}

	/// Focuses `file` (or nothing) and re-evaluates the cursor mistake state.
	pub fn set_current_file(&self, file: Option<FileId>) {
		if !self.context.set_current_file(file) {
			return;
		}
		let file = self.context.current_file();
		debug!(file = ?file.as_ref().map(FileId::as_str), "spell.service.current_file");
		self.events.emit(SpellEvent::CurrentFileChanged { file });
		self.publisher.refresh_cursor();
	}

	/// Moves the cursor in the focused file. Returns the mistake under it.
	pub fn set_cursor(&self, line: u32, column: u32) -> Option<Word> {
		self.context.set_cursor(Cursor::new(line, column));
		self.publisher.refresh_cursor()
	}

	pub fn word_under_cursor(&self) -> Option<Word> {
		self.publisher.word_under_cursor()
	}

	pub fn project_name(&self) -> Option<String> {
		self.context.project_name()
	}

	pub fn project_files(&self) -> BTreeSet<FileId> {
		self.context.project_files()
	}

	/// Switches the active project, discarding all analysis of the previous one.
	///
	/// A project listed in `ignored_projects` behaves as no project.
	pub fn set_active_project(&self, project: Option<(String, HashSet<FileId>)>) {
		let project = project.filter(|(name, _)| {
			let ignored = self.config.is_project_ignored(name);
			if ignored {
				info!(project = %name, "spell.service.project_ignored");
			}
			!ignored
		});
		let name = project.as_ref().map(|(name, _)| name.clone());

		let cancelled = self.scheduler.cancel_all();
		self.context.set_active_project(project);
		self.publisher.reset_project(name.clone());
		info!(project = ?name, cancelled, "spell.service.project_changed");
	}

	/// Replaces the active project's file set. Returns the delta, or `None`
	/// when no project is active.
	pub fn file_list_changed(&self, files: HashSet<FileId>) -> Option<FileDelta> {
		let Some(delta) = self.context.file_list_changed(files) else {
			debug!("spell.service.file_list_without_project");
			return None;
		};
		if !delta.is_empty() {
			self.publisher.apply_delta(&delta);
		}
		Some(delta)
	}

	/// Adds `text` to the active checker's dictionary. On success every
	/// occurrence is cleared from all files without re-analysis.
	pub fn add_word(&self, text: &str) -> bool {
		self.learn(text, Learn::Add)
	}

	/// Ignores `text` in the active checker. Clears it like [`Self::add_word`].
	pub fn ignore_word(&self, text: &str) -> bool {
		self.learn(text, Learn::Ignore)
	}

	pub fn add_word_under_cursor(&self) -> bool {
		self.word_under_cursor().is_some_and(|word| self.add_word(&word.text))
	}

	pub fn ignore_word_under_cursor(&self) -> bool {
		self.word_under_cursor().is_some_and(|word| self.ignore_word(&word.text))
	}

	fn learn(&self, text: &str, mode: Learn) -> bool {
		if text.is_empty() {
			return false;
		}
		let Some(checker) = self.checkers.active() else {
			warn!(word = text, mode = mode.as_str(), "spell.service.learn_without_checker");
			return false;
		};
		let newly = match mode {
			Learn::Add => checker.add_word(text),
			Learn::Ignore => checker.ignore_word(text),
		};
		if !newly {
			debug!(word = text, mode = mode.as_str(), "spell.service.already_known");
			return false;
		}
		// Bump before removing: results published after the removal are revalidated.
		let generation = self.checkers.invalidate();
		let affected = self.publisher.remove_word(text);
		info!(word = text, mode = mode.as_str(), files = affected.len(), generation, "spell.service.learned");
		true
	}

	/// Context-menu suggestions for the mistake under the cursor.
	pub fn suggestions_under_cursor(&self) -> Vec<String> {
		self.word_under_cursor()
			.map(|word| actions::context_suggestions(&word, self.config.max_context_suggestions))
			.unwrap_or_default()
	}

	/// Plans a context-menu replacement of `word` in the focused file.
	///
	/// Covers every occurrence in the file when `replace_all_from_context_menu` is set.
	pub fn replacement_for(&self, word: &Word, replacement: &str) -> Option<ReplacementPlan> {
		let file = self.context.current_file()?;
		Some(actions::plan_replacement(
			&self.store,
			&file,
			word,
			replacement,
			self.config.replace_all_from_context_menu,
		))
	}

	/// Plans replacing the mistake under the cursor with its first suggestion.
	pub fn first_suggestion_under_cursor(&self) -> Option<ReplacementPlan> {
		let word = self.word_under_cursor()?;
		let first = word.suggestions.first()?.clone();
		self.replacement_for(&word, &first)
	}

	/// Spans a suggestion dialog edits: the word under the cursor, or all of
	/// its occurrences in the focused file when `accept_all` is set.
	pub fn suggestion_dialog_targets(&self, accept_all: bool) -> Vec<Word> {
		let Some((file, _)) = self.context.position() else {
			return Vec::new();
		};
		match self.word_under_cursor() {
			Some(word) => actions::targets(&self.store, &file, &word, accept_all),
			None => Vec::new(),
		}
	}

	/// Stops accepting work and drains in-flight jobs. Idempotent.
	pub fn shutdown(&self) {
		if self.scheduler.is_shutting_down() {
			return;
		}
		let drained = self.scheduler.shutdown();
		info!(drained, "spell.service.shutdown");
	}

	pub fn is_shut_down(&self) -> bool {
		self.scheduler.is_shutting_down()
	}
}

impl Drop for SpellService {
	fn drop(&mut self) {
		self.shutdown();
	}
}

#[cfg(test)]
mod tests;
