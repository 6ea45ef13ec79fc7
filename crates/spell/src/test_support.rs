//! Fakes shared by unit tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex, RwLock};

use crate::checker::SpellChecker;
use crate::error::{Result, SpellError};
use crate::word::Word;

/// Word the fake checker fails on.
pub(crate) const FAILING_WORD: &str = "kaboom";
/// Word the fake checker panics on.
pub(crate) const PANICKING_WORD: &str = "panicword";

/// Manually opened barrier used to hold work in flight.
#[derive(Default)]
pub(crate) struct Gate {
	open: Mutex<bool>,
	cond: Condvar,
}

impl Gate {
	pub(crate) fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub(crate) fn wait(&self) {
		let mut open = self.open.lock();
		while !*open {
			self.cond.wait(&mut open);
		}
	}

	pub(crate) fn is_open(&self) -> bool {
		*self.open.lock()
	}

	pub(crate) fn open(&self) {
		*self.open.lock() = true;
		self.cond.notify_all();
	}
}

/// In-memory checker: a word is correct if it is known or ignored.
pub(crate) struct DictionaryChecker {
	name: String,
	known: RwLock<HashSet<String>>,
	ignored: RwLock<HashSet<String>>,
	checks: AtomicUsize,
	gate: Option<Arc<Gate>>,
	/// When set, only checks of this word wait on the gate.
	held: Option<String>,
}

impl DictionaryChecker {
	pub(crate) fn new<const N: usize>(known: [&str; N]) -> Self {
		Self::named("test", known)
	}

	pub(crate) fn named<const N: usize>(name: &str, known: [&str; N]) -> Self {
		Self {
			name: name.to_owned(),
			known: RwLock::new(known.into_iter().map(str::to_owned).collect()),
			ignored: RwLock::new(HashSet::new()),
			checks: AtomicUsize::new(0),
			gate: None,
			held: None,
		}
	}

	/// Every check blocks until `gate` opens.
	pub(crate) fn gated(mut self, gate: Arc<Gate>) -> Self {
		self.gate = Some(gate);
		self
	}

	/// Checks of `word` block until `gate` opens; other words pass straight through.
	pub(crate) fn holding(mut self, word: &str, gate: Arc<Gate>) -> Self {
		self.gate = Some(gate);
		self.held = Some(word.to_owned());
		self
	}

	pub(crate) fn checks(&self) -> usize {
		self.checks.load(Ordering::SeqCst)
	}
}

impl SpellChecker for DictionaryChecker {
	fn name(&self) -> &str {
		&self.name
	}

	fn check_word(&self, word: &str) -> Result<bool> {
		self.checks.fetch_add(1, Ordering::SeqCst);
		if let Some(gate) = &self.gate
			&& self.held.as_deref().is_none_or(|held| held == word)
		{
			gate.wait();
		}
		match word {
			FAILING_WORD => Err(SpellError::Checker("dictionary unavailable".into())),
			PANICKING_WORD => panic!("checker blew up"),
			_ => Ok(self.known.read().contains(word) || self.ignored.read().contains(word)),
		}
	}

	fn suggestions(&self, word: &str) -> Result<Vec<String>> {
		let first = word.chars().next();
		let mut out: Vec<String> = self.known.read().iter().filter(|known| known.chars().next() == first).cloned().collect();
		out.sort();
		Ok(out)
	}

	fn add_word(&self, word: &str) -> bool {
		self.known.write().insert(word.to_owned())
	}

	fn ignore_word(&self, word: &str) -> bool {
		self.ignored.write().insert(word.to_owned())
	}
}

pub(crate) fn words(items: &[(&str, u32, u32)]) -> Vec<Word> {
	items.iter().map(|&(text, line, column)| Word::new(text, line, column)).collect()
}

/// Polls `condition` until it holds, panicking after two seconds.
pub(crate) fn wait_until(name: &str, mut condition: impl FnMut() -> bool) {
	let deadline = std::time::Instant::now() + Duration::from_secs(2);
	while !condition() {
		assert!(std::time::Instant::now() < deadline, "timed out waiting for {name}");
		std::thread::sleep(Duration::from_millis(5));
	}
}
