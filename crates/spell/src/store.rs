//! Authoritative per-file record of spelling mistakes.
//!
//! Each file's mistakes are held as one immutable [`Mistakes`] snapshot.
//! Writers swap whole snapshots under the write lock, so readers always see
//! either the previous or the next snapshot of a file, never a mix.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use crate::word::{FileId, Mistakes, Word};

#[derive(Debug, Clone)]
struct FileEntry {
	mistakes: Mistakes,
	in_project: bool,
}

/// Display row for one file with mistakes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
	pub file: FileId,
	pub mistakes: usize,
	pub in_project: bool,
}

/// Mistakes for every analysed file.
///
/// Files without mistakes have no entry; lookups on them return empty results.
#[derive(Debug, Default)]
pub struct MistakeStore {
	files: RwLock<HashMap<FileId, FileEntry>>,
	/// Bumped on every mutation.
	version: AtomicU64,
}

fn empty() -> Mistakes {
	Arc::from(Vec::new())
}

impl MistakeStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Monotonic change counter, useful for cheap "did anything change" checks.
	pub fn version(&self) -> u64 {
		self.version.load(Ordering::Acquire)
	}

	fn bump(&self) {
		self.version.fetch_add(1, Ordering::AcqRel);
	}

	/// Replaces the mistakes of `file` wholesale and returns the stored snapshot.
	///
	/// Only the first word claiming a given `(line, column)` start is kept.
	pub fn insert_or_replace(&self, file: &FileId, mut words: Vec<Word>, in_project: bool) -> Mistakes {
		let mut seen = HashSet::with_capacity(words.len());
		let before = words.len();
		words.retain(|word| seen.insert(word.position()));
		if words.len() != before {
			debug!(file = %file, dropped = before - words.len(), "spell.store.duplicate_positions");
		}

		let mistakes: Mistakes = Arc::from(words);
		{
			let mut files = self.files.write();
			if mistakes.is_empty() {
				files.remove(file);
			} else {
				files.insert(
					file.clone(),
					FileEntry {
						mistakes: Arc::clone(&mistakes),
						in_project,
					},
				);
			}
		}
		self.bump();
		mistakes
	}

	/// Current snapshot for `file`; empty if the file has no mistakes.
	pub fn mistakes_for_file(&self, file: &str) -> Mistakes {
		self.files.read().get(file).map(|entry| Arc::clone(&entry.mistakes)).unwrap_or_else(empty)
	}

	pub fn contains_file(&self, file: &str) -> bool {
		self.files.read().contains_key(file)
	}

	/// The mistake whose span covers `column` on `line`.
	///
	/// Overlapping spans should not occur; if they do, the earliest inserted
	/// match wins.
	pub fn word_at(&self, file: &str, line: u32, column: u32) -> Option<Word> {
		let mistakes = self.mistakes_for_file(file);
		mistakes.iter().find(|word| word.contains(line, column)).cloned()
	}

	/// All mistakes in `file` whose text equals `text` exactly.
	pub fn occurrences_of(&self, file: &str, text: &str) -> Vec<Word> {
		let mistakes = self.mistakes_for_file(file);
		mistakes.iter().filter(|word| word.text == text).cloned().collect()
	}

	/// Removes every mistake with `text` from every file.
	///
	/// Returns the affected files in path order.
	pub fn remove_all_occurrences(&self, text: &str) -> Vec<FileId> {
		let mut affected = Vec::new();
		{
			let mut files = self.files.write();
			files.retain(|file, entry| {
				if !entry.mistakes.iter().any(|word| word.text == text) {
					return true;
				}
				affected.push(file.clone());
				let kept: Vec<Word> = entry.mistakes.iter().filter(|word| word.text != text).cloned().collect();
				entry.mistakes = Arc::from(kept);
				!entry.mistakes.is_empty()
			});
		}
		if !affected.is_empty() {
			self.bump();
		}
		affected.sort();
		debug!(text, files = affected.len(), "spell.store.remove_all_occurrences");
		affected
	}

	/// Applies a project membership delta: removed files are dropped, added
	/// files already present are flagged as project members.
	pub fn project_files_changed(&self, added: &BTreeSet<FileId>, removed: &BTreeSet<FileId>) {
		if added.is_empty() && removed.is_empty() {
			return;
		}
		{
			let mut files = self.files.write();
			for file in removed {
				files.remove(file);
			}
			for file in added {
				if let Some(entry) = files.get_mut(file) {
					entry.in_project = true;
				}
			}
		}
		self.bump();
	}

	pub fn clear_all(&self) {
		self.files.write().clear();
		self.bump();
	}

	/// Number of files with mistakes.
	pub fn len(&self) -> usize {
		self.files.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.files.read().is_empty()
	}

	/// Files with mistakes, active-project members first, then by path.
	pub fn summaries(&self) -> Vec<FileSummary> {
		let mut rows: Vec<FileSummary> = self
			.files
			.read()
			.iter()
			.map(|(file, entry)| FileSummary {
				file: file.clone(),
				mistakes: entry.mistakes.len(),
				in_project: entry.in_project,
			})
			.collect();
		rows.sort_by(|a, b| b.in_project.cmp(&a.in_project).then_with(|| a.file.cmp(&b.file)));
		rows
	}
}
