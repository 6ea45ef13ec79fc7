//! Core value types: files, words and cursor positions.

use std::borrow::Borrow;
use std::sync::Arc;

/// Canonical path of a file, cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(Arc<str>);

impl FileId {
	pub fn new(path: impl AsRef<str>) -> Self {
		Self(Arc::from(path.as_ref()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl std::fmt::Display for FileId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for FileId {
	fn from(path: &str) -> Self {
		Self::new(path)
	}
}

impl From<String> for FileId {
	fn from(path: String) -> Self {
		Self(Arc::from(path))
	}
}

impl Borrow<str> for FileId {
	fn borrow(&self) -> &str {
		&self.0
	}
}

/// A checkable word and, once analysed, its suggestions.
///
/// Lines and columns are 1-based. The word covers columns
/// `column..column + length` on `line`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Word {
	pub text: String,
	pub line: u32,
	pub column: u32,
	pub length: u32,
	pub suggestions: Vec<String>,
}

impl Word {
	/// Creates a word without suggestions; `length` is the character count of `text`.
	pub fn new(text: impl Into<String>, line: u32, column: u32) -> Self {
		let text = text.into();
		let length = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
		Self {
			text,
			line,
			column,
			length,
			suggestions: Vec::new(),
		}
	}

	#[must_use]
	pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
		self.suggestions = suggestions;
		self
	}

	/// Returns true if `(line, column)` falls inside this word's span.
	pub fn contains(&self, line: u32, column: u32) -> bool {
		self.line == line && column >= self.column && column < self.column.saturating_add(self.length)
	}

	/// Start position, used as the per-file uniqueness key.
	pub fn position(&self) -> (u32, u32) {
		(self.line, self.column)
	}
}

/// Immutable snapshot of one file's mistakes, in insertion order.
pub type Mistakes = Arc<[Word]>;

/// Cursor position inside the current file (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
	pub line: u32,
	pub column: u32,
}

impl Cursor {
	pub const fn new(line: u32, column: u32) -> Self {
		Self { line, column }
	}
}
