//! Seam to the external spelling capability.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{Result, SpellError};

/// A spelling capability: dictionary lookups, suggestions, and learning.
///
/// Implementations are called from worker threads and must be thread-safe.
pub trait SpellChecker: Send + Sync {
	/// Unique name used to select this checker.
	fn name(&self) -> &str;

	/// Returns `true` when `word` is spelled correctly.
	fn check_word(&self, word: &str) -> Result<bool>;

	/// Ordered replacement suggestions for a misspelled `word`.
	fn suggestions(&self, word: &str) -> Result<Vec<String>>;

	/// Adds `word` to the user dictionary. Returns `true` if it was not known before.
	fn add_word(&self, word: &str) -> bool;

	/// Ignores `word` for the session. Returns `true` if it was not ignored before.
	fn ignore_word(&self, word: &str) -> bool;
}

#[derive(Default)]
struct RegistryState {
	checkers: BTreeMap<String, Arc<dyn SpellChecker>>,
	active: Option<String>,
}

/// Named spelling capabilities with one active selection.
///
/// The registry also keeps a verdict generation: any change that can flip a
/// word's verdict (switching checkers, learning or ignoring a word) bumps it.
/// Verdicts computed under an older generation must not be reused.
#[derive(Default)]
pub struct CheckerRegistry {
	state: RwLock<RegistryState>,
	generation: AtomicU64,
}

impl std::fmt::Debug for CheckerRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.read();
		f.debug_struct("CheckerRegistry")
			.field("checkers", &state.checkers.keys().collect::<Vec<_>>())
			.field("active", &state.active)
			.field("generation", &self.generation())
			.finish()
	}
}

impl CheckerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a checker. The first registered checker becomes active.
	///
	/// Returns `false` if a checker with the same name is already registered.
	pub fn add(&self, checker: Arc<dyn SpellChecker>) -> bool {
		let name = checker.name().to_owned();
		let mut state = self.state.write();
		if state.checkers.contains_key(&name) {
			return false;
		}
		if state.active.is_none() {
			tracing::debug!(checker = %name, "spell.checker.activated");
			state.active = Some(name.clone());
			self.invalidate();
		}
		state.checkers.insert(name, checker);
		true
	}

	/// Makes the named checker active.
	pub fn select(&self, name: &str) -> Result<()> {
		let mut state = self.state.write();
		if !state.checkers.contains_key(name) {
			return Err(SpellError::UnknownChecker(name.to_owned()));
		}
		if state.active.as_deref() != Some(name) {
			tracing::debug!(checker = name, "spell.checker.activated");
			state.active = Some(name.to_owned());
			self.invalidate();
		}
		Ok(())
	}

	/// Current verdict generation.
	pub fn generation(&self) -> u64 {
		self.generation.load(Ordering::Acquire)
	}

	/// Marks every previously computed verdict as stale.
	pub fn invalidate(&self) -> u64 {
		self.generation.fetch_add(1, Ordering::AcqRel) + 1
	}

	pub fn active(&self) -> Option<Arc<dyn SpellChecker>> {
		let state = self.state.read();
		state.active.as_ref().and_then(|name| state.checkers.get(name)).cloned()
	}

	pub fn active_name(&self) -> Option<String> {
		self.state.read().active.clone()
	}

	/// Registered checker names in sorted order.
	pub fn names(&self) -> Vec<String> {
		self.state.read().checkers.keys().cloned().collect()
	}
}
