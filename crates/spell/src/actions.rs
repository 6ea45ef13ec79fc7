//! Planning for mistake-specific editor actions.
//!
//! These functions decide *what* to replace; applying text edits stays with
//! the caller. Replace-all is scoped to one file's mistakes, unlike
//! learning a word, which clears it from every file.

use crate::store::MistakeStore;
use crate::word::{FileId, Word};

/// Spans of one file to overwrite with the same replacement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementPlan {
	pub file: FileId,
	pub replacement: String,
	/// Ordered last to first so earlier edits do not shift later spans.
	pub targets: Vec<Word>,
}

impl ReplacementPlan {
	pub fn is_empty(&self) -> bool {
		self.targets.is_empty()
	}
}

/// The first `limit` suggestions for `word`.
pub fn context_suggestions(word: &Word, limit: usize) -> Vec<String> {
	word.suggestions.iter().take(limit).cloned().collect()
}

/// The spans an action on `word` should touch: just `word`, or every
/// stored occurrence of its text in `file`.
///
/// Falls back to `word` alone when the store no longer lists it.
pub fn targets(store: &MistakeStore, file: &FileId, word: &Word, all_occurrences: bool) -> Vec<Word> {
	let mut targets = if all_occurrences {
		store.occurrences_of(file.as_str(), &word.text)
	} else {
		Vec::new()
	};
	if targets.is_empty() {
		targets.push(word.clone());
	}
	targets.sort_by(|a, b| b.position().cmp(&a.position()));
	targets
}

/// Plans replacing `word` in `file` with `replacement`.
///
/// An empty replacement produces an empty plan.
pub fn plan_replacement(store: &MistakeStore, file: &FileId, word: &Word, replacement: &str, all_occurrences: bool) -> ReplacementPlan {
	let targets = if replacement.is_empty() {
		Vec::new()
	} else {
		targets(store, file, word, all_occurrences)
	};
	ReplacementPlan {
		file: file.clone(),
		replacement: replacement.to_owned(),
		targets,
	}
}
