//! Applies analysis results to the store and notifies observers.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::context::{ActiveContext, FileDelta};
use crate::events::{EventHub, SpellEvent};
use crate::store::MistakeStore;
use crate::word::{FileId, Mistakes, Word};

/// Serialises store writes with the notifications describing them.
///
/// Every mutation that observers can see happens under one gate together with
/// the events it produces, so no subscriber sees an event that disagrees with
/// the store.
#[derive(Debug)]
pub struct Publisher {
	store: Arc<MistakeStore>,
	context: Arc<ActiveContext>,
	events: Arc<EventHub>,
	gate: Mutex<()>,
}

impl Publisher {
	pub fn new(store: Arc<MistakeStore>, context: Arc<ActiveContext>, events: Arc<EventHub>) -> Self {
		Self {
			store,
			context,
			events,
			gate: Mutex::new(()),
		}
	}

	/// Replaces the mistakes of `file`. When `file` is focused, the cursor
	/// mistake state is recomputed and emitted once.
	pub fn apply(&self, file: &FileId, words: Vec<Word>) -> Mistakes {
		self.apply_with(file, words, |words| words)
	}

	/// Like [`Self::apply`], but `prepare` rewrites the words under the gate,
	/// ordered against [`Self::remove_word`].
	pub fn apply_with(&self, file: &FileId, words: Vec<Word>, prepare: impl FnOnce(Vec<Word>) -> Vec<Word>) -> Mistakes {
		let _gate = self.gate.lock();
		let words = prepare(words);
		let in_project = self.context.is_project_file(file.as_str());
		let stored = self.store.insert_or_replace(file, words, in_project);
		debug!(file = %file, count = stored.len(), in_project, "spell.publish");
		self.events.emit(SpellEvent::MistakesUpdated {
			file: file.clone(),
			count: stored.len(),
		});
		if self.context.is_current(file.as_str()) {
			self.emit_cursor_state();
		}
		stored
	}

	/// Drops every mistake with `text` store-wide and re-publishes the
	/// affected files without re-running analysis.
	pub fn remove_word(&self, text: &str) -> Vec<FileId> {
		let _gate = self.gate.lock();
		let affected = self.store.remove_all_occurrences(text);
		let mut touches_current = false;
		for file in &affected {
			touches_current |= self.context.is_current(file.as_str());
			self.events.emit(SpellEvent::MistakesUpdated {
				file: file.clone(),
				count: self.store.mistakes_for_file(file.as_str()).len(),
			});
		}
		if touches_current {
			self.emit_cursor_state();
		}
		affected
	}

	/// Applies a project membership delta and announces it.
	pub fn apply_delta(&self, delta: &FileDelta) {
		let _gate = self.gate.lock();
		self.store.project_files_changed(&delta.added, &delta.removed);
		debug!(added = delta.added.len(), removed = delta.removed.len(), "spell.publish.project_files");
		self.events.emit(SpellEvent::ProjectFilesChanged {
			added: delta.added.clone(),
			removed: delta.removed.clone(),
		});
	}

	/// Empties the store after a project switch and announces `project`.
	pub fn reset_project(&self, project: Option<String>) {
		let _gate = self.gate.lock();
		self.store.clear_all();
		self.events.emit(SpellEvent::ProjectChanged { project });
		self.emit_cursor_state();
	}

	/// Recomputes and emits the cursor mistake state.
	pub fn refresh_cursor(&self) -> Option<Word> {
		let _gate = self.gate.lock();
		self.emit_cursor_state()
	}

	/// The mistake under the cursor in the focused file, if any.
	pub fn word_under_cursor(&self) -> Option<Word> {
		let (file, cursor) = self.context.position()?;
		self.store.word_at(file.as_str(), cursor.line, cursor.column)
	}

	fn emit_cursor_state(&self) -> Option<Word> {
		let word = self.word_under_cursor();
		self.events.emit(SpellEvent::CursorMistakeChanged {
			is_mistake: word.is_some(),
			word: word.clone(),
		});
		word
	}
}
