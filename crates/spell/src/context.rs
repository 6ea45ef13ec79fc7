//! Focused file, cursor, and active project membership.

use std::collections::{BTreeSet, HashSet};

use parking_lot::RwLock;

use crate::word::{Cursor, FileId};

/// Files that joined and left the active project in one file-list change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDelta {
	pub added: BTreeSet<FileId>,
	pub removed: BTreeSet<FileId>,
}

impl FileDelta {
	/// `added = new - old`, `removed = old - new`.
	pub fn between(old: &HashSet<FileId>, new: &HashSet<FileId>) -> Self {
		Self {
			added: new.difference(old).cloned().collect(),
			removed: old.difference(new).cloned().collect(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.added.is_empty() && self.removed.is_empty()
	}
}

#[derive(Debug)]
struct ActiveProject {
	name: String,
	files: HashSet<FileId>,
}

#[derive(Debug, Default)]
struct ContextState {
	current_file: Option<FileId>,
	cursor: Cursor,
	project: Option<ActiveProject>,
}

/// Tracks what the user is looking at and which files the active project owns.
#[derive(Debug, Default)]
pub struct ActiveContext {
	state: RwLock<ContextState>,
}

impl ActiveContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn current_file(&self) -> Option<FileId> {
		self.state.read().current_file.clone()
	}

	pub fn is_current(&self, file: &str) -> bool {
		self.state.read().current_file.as_ref().is_some_and(|current| current.as_str() == file)
	}

	/// Focuses `file` and resets the cursor. Returns whether the focus changed.
	pub fn set_current_file(&self, file: Option<FileId>) -> bool {
		let file = file.filter(|file| !file.is_empty());
		let mut state = self.state.write();
		if state.current_file == file {
			return false;
		}
		state.current_file = file;
		state.cursor = Cursor::default();
		true
	}

	pub fn cursor(&self) -> Cursor {
		self.state.read().cursor
	}

	pub fn set_cursor(&self, cursor: Cursor) {
		self.state.write().cursor = cursor;
	}

	/// Current file and cursor, read together.
	pub fn position(&self) -> Option<(FileId, Cursor)> {
		let state = self.state.read();
		state.current_file.clone().map(|file| (file, state.cursor))
	}

	pub fn project_name(&self) -> Option<String> {
		self.state.read().project.as_ref().map(|project| project.name.clone())
	}

	pub fn is_project_file(&self, file: &str) -> bool {
		self.state.read().project.as_ref().is_some_and(|project| project.files.contains(file))
	}

	/// Sorted snapshot of the active project's files.
	pub fn project_files(&self) -> BTreeSet<FileId> {
		self.state
			.read()
			.project
			.as_ref()
			.map(|project| project.files.iter().cloned().collect())
			.unwrap_or_default()
	}

	/// Replaces the active project and its files wholesale. `None` clears it.
	pub fn set_active_project(&self, project: Option<(String, HashSet<FileId>)>) {
		self.state.write().project = project.map(|(name, files)| ActiveProject { name, files });
	}

	/// Replaces the file set of the active project and returns the delta.
	///
	/// Returns `None` when there is no active project.
	pub fn file_list_changed(&self, files: HashSet<FileId>) -> Option<FileDelta> {
		let mut state = self.state.write();
		let project = state.project.as_mut()?;
		let delta = FileDelta::between(&project.files, &files);
		project.files = files;
		Some(delta)
	}
}
