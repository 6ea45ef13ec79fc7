//! Runs the active spelling capability over a job's words.

use std::collections::HashMap;
use std::sync::Arc;

use lector_worker::TaskToken;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::checker::CheckerRegistry;
use crate::context::ActiveContext;
use crate::publisher::Publisher;
use crate::scheduler::{Job, JobHost, JobOutcome, JobPriority};
use crate::store::MistakeStore;
use crate::word::{FileId, Mistakes, Word};

/// Checker generations behind each file's results.
#[derive(Debug, Default)]
struct ResultGenerations {
	/// Produced by the last run, not yet published.
	computed: HashMap<FileId, u64>,
	/// Behind the snapshot currently in the store.
	published: HashMap<FileId, u64>,
}

/// [`JobHost`] backed by the mistake store and the checker registry.
#[derive(Debug)]
pub struct SpellPipeline {
	store: Arc<MistakeStore>,
	context: Arc<ActiveContext>,
	publisher: Arc<Publisher>,
	checkers: Arc<CheckerRegistry>,
	generations: Mutex<ResultGenerations>,
}

impl SpellPipeline {
	pub fn new(store: Arc<MistakeStore>, context: Arc<ActiveContext>, publisher: Arc<Publisher>, checkers: Arc<CheckerRegistry>) -> Self {
		Self {
			store,
			context,
			publisher,
			checkers,
			generations: Mutex::new(ResultGenerations::default()),
		}
	}

	/// Whether `file`'s stored mistakes were computed under the current generation.
	fn baseline_is_current(&self, file: &FileId, generation: u64) -> bool {
		self.generations.lock().published.get(file) == Some(&generation)
	}
}

/// Drops words the active checker now accepts. Without a checker nothing survives.
fn revalidate(checkers: &CheckerRegistry, file: &FileId, words: &mut Vec<Word>) {
	let Some(checker) = checkers.active() else {
		words.clear();
		return;
	};
	let before = words.len();
	let mut accepted: HashMap<String, bool> = HashMap::new();
	words.retain(|word| {
		let correct = *accepted
			.entry(word.text.clone())
			.or_insert_with(|| matches!(checker.check_word(&word.text), Ok(true)));
		!correct
	});
	debug!(file = %file, dropped = before - words.len(), "spell.job.revalidated");
}

impl JobHost for SpellPipeline {
	fn baseline(&self, file: &FileId) -> Mistakes {
		self.store.mistakes_for_file(file.as_str())
	}

	fn priority(&self, file: &FileId) -> JobPriority {
		if self.context.is_current(file.as_str()) {
			JobPriority::High
		} else {
			JobPriority::Low
		}
	}

	/// Checks every word. Baseline verdicts are reused only when the baseline
	/// was computed under the current checker generation. A checker failure
	/// yields zero mistakes for the job.
	fn run(&self, job: &Job, token: &TaskToken) -> JobOutcome {
		let generation = self.checkers.generation();
		let Some(checker) = self.checkers.active() else {
			warn!(file = %job.file, "spell.job.no_checker");
			self.generations.lock().computed.insert(job.file.clone(), generation);
			return JobOutcome::Completed(Vec::new());
		};

		// text -> suggestions when misspelled, None when correct
		let mut verdicts: HashMap<&str, Option<Vec<String>>> = if self.baseline_is_current(&job.file, generation) {
			job.baseline
				.iter()
				.map(|known| (known.text.as_str(), Some(known.suggestions.clone())))
				.collect()
		} else {
			HashMap::new()
		};
		let reused = verdicts.len();

		let mut mistakes = Vec::new();
		for word in &job.words {
			if token.is_cancelled() {
				trace!(id = %job.id, file = %job.file, "spell.job.cancelled");
				return JobOutcome::Cancelled;
			}

			let verdict = match verdicts.get(word.text.as_str()) {
				Some(verdict) => verdict.clone(),
				None => {
					let verdict = match checker.check_word(&word.text) {
						Ok(true) => None,
						Ok(false) => Some(checker.suggestions(&word.text).unwrap_or_else(|err| {
							warn!(file = %job.file, word = %word.text, error = %err, "spell.job.suggestions_failed");
							Vec::new()
						})),
						Err(err) => {
							warn!(file = %job.file, word = %word.text, error = %err, checker = checker.name(), "spell.job.checker_failed");
							self.generations.lock().computed.insert(job.file.clone(), generation);
							return JobOutcome::Completed(Vec::new());
						}
					};
					verdicts.insert(word.text.as_str(), verdict.clone());
					verdict
				}
			};

			if let Some(suggestions) = verdict {
				mistakes.push(word.clone().with_suggestions(suggestions));
			}
		}

		self.generations.lock().computed.insert(job.file.clone(), generation);
		trace!(
			id = %job.id,
			file = %job.file,
			words = job.words.len(),
			mistakes = mistakes.len(),
			reused,
			generation,
			"spell.job.checked"
		);
		JobOutcome::Completed(mistakes)
	}

	/// Publishes `words`, first dropping any the checker accepted after the
	/// run started. The check happens under the publisher gate, so a word
	/// learned concurrently is either filtered here or removed right after.
	fn publish(&self, file: &FileId, words: Vec<Word>) {
		let computed = self.generations.lock().computed.remove(file);
		let checkers = &self.checkers;
		self.publisher.apply_with(file, words, |mut words| {
			if computed.is_none_or(|generation| generation != checkers.generation()) {
				revalidate(checkers, file, &mut words);
			}
			words
		});

		let mut generations = self.generations.lock();
		match computed {
			// A revalidated result still counts as old, so the next run checks everything.
			Some(generation) => generations.published.insert(file.clone(), generation),
			None => generations.published.remove(file),
		};
	}
}
