use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::error::SpellError;
use crate::scheduler::{IgnoreReason, JobPriority};
use crate::test_support::{DictionaryChecker, FAILING_WORD, Gate, PANICKING_WORD, wait_until, words};

fn started(config: SpellConfig, checker: DictionaryChecker) -> (SpellService, Arc<DictionaryChecker>) {
	tracing_subscriber::fmt::try_init().ok();
	let checker = Arc::new(checker);
	let service = SpellService::start(config).expect("service starts");
	assert!(service.add_checker(Arc::clone(&checker) as Arc<dyn SpellChecker>));
	(service, checker)
}

fn drain(rx: &mut SpellEventReceiver) -> Vec<SpellEvent> {
	std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

fn texts(mistakes: &[Word]) -> Vec<&str> {
	mistakes.iter().map(|word| word.text.as_str()).collect()
}

fn files(items: &[&str]) -> HashSet<FileId> {
	items.iter().map(|item| FileId::from(*item)).collect()
}

fn settle(service: &SpellService, file: &str) {
	wait_until(file, || !service.is_analysing(file));
}

#[test]
fn start_rejects_an_empty_pool() {
	let config = SpellConfig {
		background_threads: 0,
		..SpellConfig::default()
	};
	assert!(matches!(SpellService::start(config), Err(SpellError::InvalidConfig(_))));
}

#[test]
fn submitted_words_become_mistakes() {
	let (service, _) = started(SpellConfig::default(), DictionaryChecker::new(["the", "quick"]));
	let mut rx = service.subscribe();

	let outcome = service.submit("/p/a.rs", words(&[("the", 1, 1), ("quikc", 1, 5), ("teh", 2, 1)]));
	assert!(matches!(outcome, SubmitOutcome::Started { priority: JobPriority::Low, .. }));
	settle(&service, "/p/a.rs");

	let mistakes = service.mistakes_for_file("/p/a.rs");
	assert_eq!(texts(&mistakes), vec!["quikc", "teh"]);
	assert_eq!(mistakes[0].suggestions, vec!["quick".to_owned()]);
	assert_eq!(service.word_at("/p/a.rs", 1, 9).map(|word| word.text), Some("quikc".to_owned()));
	assert_eq!(service.word_at("/p/a.rs", 1, 10), None);
	assert_eq!(
		drain(&mut rx),
		vec![SpellEvent::MistakesUpdated {
			file: "/p/a.rs".into(),
			count: 2,
		}]
	);
}

#[test]
fn edits_during_analysis_collapse_into_one_follow_up() {
	let gate = Gate::new();
	let (service, checker) = started(SpellConfig::default(), DictionaryChecker::new([]).gated(Arc::clone(&gate)));

	service.submit("/p/a.rs", words(&[("one", 1, 1)]));
	wait_until("first check", || checker.checks() == 1);
	assert_eq!(service.submit("/p/a.rs", words(&[("two", 1, 1)])), SubmitOutcome::Coalesced);
	assert_eq!(service.submit("/p/a.rs", words(&[("three", 1, 1)])), SubmitOutcome::Coalesced);

	gate.open();
	wait_until("follow-up published", || service.scheduler_stats().published == 2);
	settle(&service, "/p/a.rs");

	assert_eq!(texts(&service.mistakes_for_file("/p/a.rs")), vec!["three"]);
	assert_eq!(checker.checks(), 2);
	assert_eq!(service.scheduler_stats().started, 2);
}

#[rstest]
#[case::failing(FAILING_WORD)]
#[case::panicking(PANICKING_WORD)]
fn checker_trouble_publishes_no_mistakes(#[case] bad: &str) {
	let (service, _) = started(SpellConfig::default(), DictionaryChecker::new([]));
	service.submit("/p/a.rs", words(&[("teh", 1, 1), (bad, 2, 1)]));
	settle(&service, "/p/a.rs");

	assert!(service.mistakes_for_file("/p/a.rs").is_empty());
	assert_eq!(service.scheduler_stats().published, 1);

	// The file is not wedged afterwards.
	service.submit("/p/a.rs", words(&[("teh", 1, 1)]));
	settle(&service, "/p/a.rs");
	assert_eq!(texts(&service.mistakes_for_file("/p/a.rs")), vec!["teh"]);
}

#[test]
fn cursor_tracks_mistakes_in_the_focused_file() {
	let (service, _) = started(SpellConfig::default(), DictionaryChecker::new(["the"]));
	let mut rx = service.subscribe();

	service.set_current_file(Some("/p/a.rs".into()));
	assert_eq!(
		drain(&mut rx),
		vec![
			SpellEvent::CurrentFileChanged {
				file: Some("/p/a.rs".into()),
			},
			SpellEvent::CursorMistakeChanged {
				is_mistake: false,
				word: None,
			},
		]
	);

	let outcome = service.submit("/p/a.rs", words(&[("teh", 1, 1)]));
	assert!(matches!(outcome, SubmitOutcome::Started { priority: JobPriority::High, .. }));
	settle(&service, "/p/a.rs");
	drain(&mut rx);

	let under = service.set_cursor(1, 2);
	assert_eq!(under.as_ref().map(|word| word.text.as_str()), Some("teh"));
	assert_eq!(
		drain(&mut rx),
		vec![SpellEvent::CursorMistakeChanged {
			is_mistake: true,
			word: under,
		}]
	);

	// Refocusing the same file is not a change.
	service.set_current_file(Some("/p/a.rs".into()));
	assert!(drain(&mut rx).is_empty());
}

#[test]
fn learning_a_word_clears_it_everywhere() {
	let (service, checker) = started(SpellConfig::default(), DictionaryChecker::new([]));
	service.submit("/p/a.rs", words(&[("teh", 1, 1), ("wrod", 2, 1)]));
	service.submit("/p/b.rs", words(&[("teh", 7, 3)]));
	settle(&service, "/p/a.rs");
	settle(&service, "/p/b.rs");
	let mut rx = service.subscribe();

	assert!(service.add_word("teh"));
	assert_eq!(texts(&service.mistakes_for_file("/p/a.rs")), vec!["wrod"]);
	assert!(service.mistakes_for_file("/p/b.rs").is_empty());
	assert_eq!(drain(&mut rx).len(), 2);

	// Already known: nothing to clear.
	assert!(!service.add_word("teh"));
	assert!(!service.ignore_word(""));

	// Later analysis agrees with the dictionary.
	service.submit("/p/b.rs", words(&[("teh", 7, 3)]));
	settle(&service, "/p/b.rs");
	assert!(service.mistakes_for_file("/p/b.rs").is_empty());
	assert!(checker.checks() >= 3);
}

#[rstest]
#[case::reused_from_baseline(true)]
#[case::checked_during_the_job(false)]
fn word_learned_during_analysis_stays_cleared(#[case] seeded: bool) {
	let gate = Gate::new();
	let (service, checker) = started(SpellConfig::default(), DictionaryChecker::new([]).holding("blocker", Arc::clone(&gate)));
	if seeded {
		service.submit("/p/a.rs", words(&[("teh", 1, 1)]));
		settle(&service, "/p/a.rs");
		assert_eq!(texts(&service.mistakes_for_file("/p/a.rs")), vec!["teh"]);
	}
	let before = checker.checks();

	service.submit("/p/a.rs", words(&[("teh", 1, 1), ("blocker", 2, 1)]));
	let blocked = if seeded { before + 1 } else { before + 2 };
	wait_until("job blocked on the checker", || checker.checks() == blocked);
	assert!(service.add_word("teh"));

	gate.open();
	settle(&service, "/p/a.rs");
	assert_eq!(texts(&service.mistakes_for_file("/p/a.rs")), vec!["blocker"]);

	for _ in 0..3 {
		service.submit("/p/a.rs", words(&[("teh", 1, 1), ("blocker", 2, 1)]));
		settle(&service, "/p/a.rs");
	}
	assert_eq!(texts(&service.mistakes_for_file("/p/a.rs")), vec!["blocker"]);
}

#[test]
fn switching_checkers_takes_effect_on_reanalysis() {
	let (service, _) = started(SpellConfig::default(), DictionaryChecker::named("en_US", ["color"]));
	assert!(service.add_checker(Arc::new(DictionaryChecker::named("en_GB", ["colour"]))));

	service.submit("/p/a.rs", words(&[("colour", 1, 1), ("color", 2, 1)]));
	settle(&service, "/p/a.rs");
	assert_eq!(texts(&service.mistakes_for_file("/p/a.rs")), vec!["colour"]);

	service.set_checker("en_GB").expect("registered checker");
	service.submit("/p/a.rs", words(&[("colour", 1, 1), ("color", 2, 1)]));
	settle(&service, "/p/a.rs");
	assert_eq!(texts(&service.mistakes_for_file("/p/a.rs")), vec!["color"]);
}

#[test]
fn ignoring_the_word_under_the_cursor() {
	let (service, _) = started(SpellConfig::default(), DictionaryChecker::new([]));
	service.set_current_file(Some("/p/a.rs".into()));
	service.submit("/p/a.rs", words(&[("teh", 1, 1), ("wrod", 1, 5)]));
	settle(&service, "/p/a.rs");

	assert!(!service.ignore_word_under_cursor());
	service.set_cursor(1, 6);
	let mut rx = service.subscribe();
	assert!(service.ignore_word_under_cursor());

	assert_eq!(texts(&service.mistakes_for_file("/p/a.rs")), vec!["teh"]);
	assert_eq!(
		drain(&mut rx),
		vec![
			SpellEvent::MistakesUpdated {
				file: "/p/a.rs".into(),
				count: 1,
			},
			SpellEvent::CursorMistakeChanged {
				is_mistake: false,
				word: None,
			},
		]
	);
	assert!(!service.add_word_under_cursor());
}

#[test]
fn project_switch_discards_running_analysis() {
	let gate = Gate::new();
	let config = SpellConfig {
		drain_timeout_ms: 100,
		..SpellConfig::default()
	};
	let (service, checker) = started(config, DictionaryChecker::new([]).gated(Arc::clone(&gate)));
	let mut rx = service.subscribe();

	service.submit("/p/a.rs", words(&[("teh", 1, 1)]));
	wait_until("check started", || checker.checks() == 1);

	service.set_active_project(Some(("app".into(), files(&["/p/a.rs", "/p/b.rs"]))));
	// The job outlived the drain timeout; it keeps the file's slot until it ends.
	assert!(service.is_analysing("/p/a.rs"));
	assert_eq!(service.project_name(), Some("app".to_owned()));
	assert_eq!(service.project_files().len(), 2);

	gate.open();
	wait_until("late result discarded", || service.scheduler_stats().discarded == 1);
	assert!(!service.is_analysing("/p/a.rs"));
	assert!(service.mistakes_for_file("/p/a.rs").is_empty());
	assert_eq!(
		drain(&mut rx),
		vec![
			SpellEvent::ProjectChanged {
				project: Some("app".into()),
			},
			SpellEvent::CursorMistakeChanged {
				is_mistake: false,
				word: None,
			},
		]
	);
}

#[test]
fn file_list_changes_emit_deltas() {
	let (service, _) = started(SpellConfig::default(), DictionaryChecker::new([]));
	service.set_active_project(Some(("app".into(), files(&["a", "b", "c"]))));
	service.submit("a", words(&[("teh", 1, 1)]));
	settle(&service, "a");
	let mut rx = service.subscribe();

	let delta = service.file_list_changed(files(&["b", "c", "d"])).expect("active project");
	assert_eq!(delta.added, BTreeSet::from([FileId::from("d")]));
	assert_eq!(delta.removed, BTreeSet::from([FileId::from("a")]));
	assert!(service.mistakes_for_file("a").is_empty());
	assert_eq!(
		drain(&mut rx),
		vec![SpellEvent::ProjectFilesChanged {
			added: delta.added.clone(),
			removed: delta.removed.clone(),
		}]
	);

	let unchanged = service.file_list_changed(files(&["b", "c", "d"])).expect("active project");
	assert!(unchanged.is_empty());
	assert!(drain(&mut rx).is_empty());
}

#[test]
fn ignored_projects_are_not_tracked() {
	let config = SpellConfig {
		ignored_projects: vec!["vendor".into()],
		..SpellConfig::default()
	};
	let (service, _) = started(config, DictionaryChecker::new([]));
	let mut rx = service.subscribe();

	service.set_active_project(Some(("vendor".into(), files(&["a"]))));
	assert_eq!(service.project_name(), None);
	assert!(service.project_files().is_empty());
	assert_eq!(service.file_list_changed(files(&["a", "b"])), None);
	assert!(drain(&mut rx).contains(&SpellEvent::ProjectChanged { project: None }));
}

#[test]
fn summaries_list_project_files_first() {
	let (service, _) = started(SpellConfig::default(), DictionaryChecker::new([]));
	service.set_active_project(Some(("app".into(), files(&["/p/z.rs"]))));
	service.submit("/p/z.rs", words(&[("teh", 1, 1)]));
	service.submit("/a/outside.rs", words(&[("teh", 1, 1), ("wrod", 2, 1)]));
	settle(&service, "/p/z.rs");
	settle(&service, "/a/outside.rs");

	let rows: Vec<(String, usize, bool)> = service
		.summaries()
		.into_iter()
		.map(|row| (row.file.to_string(), row.mistakes, row.in_project))
		.collect();
	assert_eq!(rows, vec![("/p/z.rs".to_owned(), 1, true), ("/a/outside.rs".to_owned(), 2, false)]);
}

#[rstest]
#[case::single(false, vec![(2, 1)])]
#[case::all_in_file(true, vec![(4, 3), (2, 1)])]
fn context_replacement_scope(#[case] replace_all: bool, #[case] expected: Vec<(u32, u32)>) {
	let config = SpellConfig {
		replace_all_from_context_menu: replace_all,
		max_context_suggestions: 2,
		..SpellConfig::default()
	};
	let (service, _) = started(config, DictionaryChecker::new(["tea", "ten", "the"]));
	service.set_current_file(Some("/p/a.rs".into()));
	service.submit("/p/a.rs", words(&[("teh", 2, 1), ("teh", 4, 3)]));
	settle(&service, "/p/a.rs");
	service.set_cursor(2, 2);

	assert_eq!(service.suggestions_under_cursor(), vec!["tea".to_owned(), "ten".to_owned()]);

	let plan = service.first_suggestion_under_cursor().expect("mistake under cursor");
	assert_eq!(plan.file, FileId::from("/p/a.rs"));
	assert_eq!(plan.replacement, "tea");
	assert_eq!(plan.targets.iter().map(Word::position).collect::<Vec<_>>(), expected);
}

#[test]
fn suggestion_dialog_targets_follow_accept_all() {
	let (service, _) = started(SpellConfig::default(), DictionaryChecker::new([]));
	service.set_current_file(Some("/p/a.rs".into()));
	service.submit("/p/a.rs", words(&[("teh", 1, 1), ("teh", 3, 1)]));
	settle(&service, "/p/a.rs");

	assert!(service.suggestion_dialog_targets(true).is_empty());
	service.set_cursor(3, 1);
	assert_eq!(service.suggestion_dialog_targets(false).len(), 1);
	assert_eq!(service.suggestion_dialog_targets(true).len(), 2);
}

#[test]
fn checkers_can_be_switched_by_name() {
	let (service, _) = started(SpellConfig::default(), DictionaryChecker::named("en", []));
	assert!(service.add_checker(Arc::new(DictionaryChecker::named("de", []))));
	assert!(!service.add_checker(Arc::new(DictionaryChecker::named("de", []))));

	assert_eq!(service.checker_names(), vec!["de".to_owned(), "en".to_owned()]);
	assert_eq!(service.active_checker(), Some("en".to_owned()));
	service.set_checker("de").expect("known checker");
	assert_eq!(service.active_checker(), Some("de".to_owned()));
	assert!(matches!(service.set_checker("fr"), Err(SpellError::UnknownChecker(_))));
}

#[test]
fn empty_requests_are_absorbed() {
	let (service, _) = started(SpellConfig::default(), DictionaryChecker::new([]));
	assert_eq!(service.submit("", words(&[("teh", 1, 1)])), SubmitOutcome::Ignored(IgnoreReason::EmptyInput));
	assert_eq!(service.submit("/p/a.rs", Vec::new()), SubmitOutcome::Ignored(IgnoreReason::EmptyInput));
}

#[test]
fn shutdown_absorbs_late_requests() {
	let (service, _) = started(SpellConfig::default(), DictionaryChecker::new([]));
	service.shutdown();
	assert!(service.is_shut_down());
	assert_eq!(
		service.submit("/p/a.rs", words(&[("teh", 1, 1)])),
		SubmitOutcome::Ignored(IgnoreReason::ShutdownInProgress)
	);
	service.shutdown();
}
