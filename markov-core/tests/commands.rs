use std::path::Path;
use std::sync::Barrier;
use std::thread;

use chrono::{TimeZone, Utc};
use markov_core::fanfic::Pairing;
use markov_core::model::TextModel;
use markov_core::store::CorpusStore;
use markov_core::updater::{Document, UpdateBatch, UpdateSummary};
use markov_core::{Commands, Config, MarkovError};

const OPERATOR: &str = "215367025705484289";

fn config(root: &Path) -> Config {
	let mut config = Config {
		corpus_dir: root.join("people"),
		fanfic_dir: root.join("fanfic"),
		timestamp_file: root.join("last_update.txt"),
		operator: Some(OPERATOR.to_owned()),
		..Config::default()
	};
	config.limits.check_overlap = false;
	config
}

fn seeded(root: &Path) -> Commands {
	let mut store = CorpusStore::open(root.join("people")).unwrap();
	store.put("alice", &TextModel::from_lines(["the cat sat down"], 2).unwrap()).unwrap();
	store.put("alison", &TextModel::from_lines(["a dog ran far"], 2).unwrap()).unwrap();
	store.put("bob", &TextModel::from_lines(["bob likes trains", "bob likes cake"], 2).unwrap()).unwrap();
	Commands::new(config(root)).unwrap()
}

fn doc(id: &str, name: &str, text: &str, minute: u32) -> Document {
	Document {
		author_id: id.to_owned(),
		author_name: name.to_owned(),
		text: text.to_owned(),
		timestamp: Utc.with_ymd_and_hms(2018, 3, 1, 12, minute, 0).unwrap(),
	}
}

#[test]
fn ambiguous_substring_lists_candidates() {
	let dir = tempfile::tempdir().unwrap();
	let commands = seeded(dir.path());

	match commands.generate("ali", None) {
		Err(MarkovError::AmbiguousInput { name, candidates }) => {
			assert_eq!(name, "ali");
			assert_eq!(candidates, vec!["alice", "alison"]);
		}
		other => panic!("expected ambiguity, got {other:?}"),
	}
}

#[test]
fn exact_name_generates_from_that_corpus() {
	let dir = tempfile::tempdir().unwrap();
	let commands = seeded(dir.path());

	let generated = commands.generate("alice", None).unwrap();
	assert_eq!(generated.text, "the cat sat down");
	assert_eq!(generated.label, "Alice");
}

#[test]
fn unknown_name_in_combination_fails() {
	let dir = tempfile::tempdir().unwrap();
	let commands = seeded(dir.path());

	assert!(matches!(commands.generate("bob+zzz", None), Err(MarkovError::NameNotFound(name)) if name == "zzz"));
}

#[test]
fn combined_corpora_share_one_label() {
	let dir = tempfile::tempdir().unwrap();
	let commands = seeded(dir.path());

	let generated = commands.generate("Bob+alison", None).unwrap();
	assert_eq!(generated.label, "Bob+Alison");
	assert!(!generated.text.is_empty());
}

#[test]
fn name_limit_is_ten() {
	let dir = tempfile::tempdir().unwrap();
	let commands = seeded(dir.path());

	assert!(commands.generate(&vec!["bob"; 10].join("+"), None).is_ok());
	assert!(matches!(
		commands.generate(&vec!["bob"; 11].join("+"), None),
		Err(MarkovError::TooManyInputs(11))
	));
}

#[test]
fn raw_arguments_carry_a_root_word() {
	let dir = tempfile::tempdir().unwrap();
	let commands = seeded(dir.path());

	let reply = commands.markov("alice sat");
	assert_eq!(reply.text, "sat down");
	assert_eq!(reply.label, "Alice");
}

#[test]
fn errors_become_replies_with_default_label() {
	let dir = tempfile::tempdir().unwrap();
	let commands = seeded(dir.path());

	let reply = commands.markov("bob+zzz");
	assert_eq!(reply.text, "Error: User not found (zzz).");
	assert_eq!(reply.label, "MathBot");

	let reply = commands.markov(&vec!["bob"; 11].join("+"));
	assert_eq!(reply.text, "Error: Too many inputs (11).");
}

#[test]
fn sparse_corpus_reports_insufficient_data() {
	let dir = tempfile::tempdir().unwrap();
	let mut store = CorpusStore::open(dir.path().join("people")).unwrap();
	store.put("quiet", &TextModel::from_lines(["just one line here"], 2).unwrap()).unwrap();

	let mut config = config(dir.path());
	config.limits.check_overlap = true;
	let commands = Commands::new(config).unwrap();

	assert_eq!(commands.markov("quiet").text, "Error: insufficient data for Markov chain.");
}

#[test]
fn update_creates_only_qualifying_authors_and_advances_the_mark() {
	let dir = tempfile::tempdir().unwrap();
	let commands = Commands::new(config(dir.path())).unwrap();
	let batch = UpdateBatch::new(vec![
		doc("1", "Bob!!", "hello there friend", 0),
		doc("1", "Bob!!", "how are you today", 1),
		doc("2", "Eve", "i am eve", 2),
		doc("1", "Bob!!", "see you later", 3),
	]);

	let summary = commands.update(batch.clone()).unwrap();
	assert_eq!(summary, UpdateSummary { messages: 4, updated: 0, created: 1 });
	assert_eq!(commands.list_corpora(), vec!["bob, everyone"]);
	assert!(commands.generate("bob", None).is_ok());

	let stored = std::fs::read_to_string(dir.path().join("last_update.txt")).unwrap();
	assert!(stored.starts_with("2018-03-01T12:03:00"));

	let again = commands.update(batch).unwrap();
	assert_eq!(again, UpdateSummary::default());
}

#[test]
fn admin_commands_require_the_operator() {
	let dir = tempfile::tempdir().unwrap();
	let commands = seeded(dir.path());

	assert!(matches!(commands.rename("someone", "alice", "alicia"), Err(MarkovError::PermissionDenied)));
	assert!(matches!(commands.remove("someone", "bob"), Err(MarkovError::PermissionDenied)));
	assert!(matches!(commands.merge("someone", "alice", "bob", "duo"), Err(MarkovError::PermissionDenied)));
	assert_eq!(commands.list_corpora(), vec!["alice, alison, bob"]);
}

#[test]
fn operator_can_rename_merge_and_remove() {
	let dir = tempfile::tempdir().unwrap();
	let commands = seeded(dir.path());

	commands.rename(OPERATOR, "alice", "Alicia!").unwrap();
	assert_eq!(commands.generate("alicia", None).unwrap().label, "Alicia");
	assert!(matches!(commands.rename(OPERATOR, "bob", "alison"), Err(MarkovError::NameTaken(_))));

	commands.merge(OPERATOR, "alicia", "bob", "duo").unwrap();
	assert_eq!(commands.list_corpora(), vec!["alicia, alison, bob, duo, everyone"]);

	commands.remove(OPERATOR, "duo").unwrap();
	assert!(matches!(commands.generate("duo", None), Err(MarkovError::NameNotFound(_))));
	assert!(matches!(commands.remove(OPERATOR, "duo"), Err(MarkovError::FileNotFound(_))));
	assert!(matches!(commands.merge(OPERATOR, "bob", "bob", "everyone"), Err(MarkovError::InvalidName(_))));
}

#[test]
fn fanfic_without_corpus_reports_missing_file() {
	let dir = tempfile::tempdir().unwrap();
	let commands = seeded(dir.path());

	assert_eq!(commands.fanfic_reply(Some("a"), Some("b"), Pairing::Any), "Error: File not found (corpus.json).");
}

#[test]
fn fanfic_with_corpus_substitutes_names() {
	let dir = tempfile::tempdir().unwrap();
	let fanfic_dir = dir.path().join("fanfic");
	std::fs::create_dir_all(&fanfic_dir).unwrap();
	// Both lines pass through ("waved", "at"), so walks can leave the
	// training sentences and survive the overlap test.
	let corpus = TextModel::from_lines(["$PERSON_1 waved at $PERSON_2 happily", "$PERSON_2 waved at the crowd"], 2).unwrap();
	std::fs::write(fanfic_dir.join("corpus.json"), corpus.to_json().unwrap()).unwrap();
	std::fs::write(fanfic_dir.join("characters.txt"), "Harry\nDraco\n").unwrap();

	let mut config = config(dir.path());
	config.fanfic.max_length = 200;
	assert!(config.fanfic.check_overlap);
	let commands = Commands::new(config).unwrap();

	let paragraph = commands.fanfic(Some("Ann"), None, Pairing::Any).unwrap();
	assert!(paragraph.contains("Ann") || paragraph.contains("Harry") || paragraph.contains("Draco"));
	assert!(!paragraph.contains("$PERSON"));
}

#[test]
fn listing_is_paginated() {
	let dir = tempfile::tempdir().unwrap();
	let mut config = config(dir.path());
	config.limits.page_length = 14;
	let mut store = CorpusStore::open(&config.corpus_dir).unwrap();
	for name in ["alice", "alison", "bob"] {
		store.put(name, &TextModel::from_lines(["a b c"], 2).unwrap()).unwrap();
	}

	let commands = Commands::new(config).unwrap();
	assert_eq!(commands.list_corpora(), vec!["alice, alison", "bob"]);
}

fn bob_batch() -> UpdateBatch {
	UpdateBatch::new(vec![
		doc("1", "Bob!!", "hello there friend", 0),
		doc("1", "Bob!!", "how are you today", 1),
		doc("1", "Bob!!", "see you later", 2),
	])
}

#[test]
fn concurrent_updates_fold_each_document_once() {
	for _ in 0..5 {
		let dir = tempfile::tempdir().unwrap();
		let commands = Commands::new(config(dir.path())).unwrap();
		let batch = bob_batch();
		let barrier = Barrier::new(2);
		let (commands, batch, barrier) = (&commands, &batch, &barrier);

		let summaries: Vec<UpdateSummary> = thread::scope(|scope| {
			let workers: Vec<_> = (0..2)
				.map(|_| {
					scope.spawn(move || {
						barrier.wait();
						commands.update(batch.clone()).unwrap()
					})
				})
				.collect();
			workers.into_iter().map(|worker| worker.join().unwrap()).collect()
		});

		assert_eq!(summaries.iter().map(UpdateSummary::authors).sum::<usize>(), 1);
		let store = CorpusStore::open(dir.path().join("people")).unwrap();
		assert_eq!(store.get("bob").unwrap().sentence_count(), 3);
	}
}

#[test]
fn admin_names_cannot_leave_the_corpus_directory() {
	let dir = tempfile::tempdir().unwrap();
	let commands = seeded(dir.path());
	let outside = dir.path().join("outside.json");
	std::fs::write(&outside, TextModel::from_lines(["a b c"], 2).unwrap().to_json().unwrap()).unwrap();

	assert!(matches!(commands.remove(OPERATOR, "../outside"), Err(MarkovError::InvalidName(_))));
	assert!(matches!(commands.rename(OPERATOR, "../outside", "inside"), Err(MarkovError::InvalidName(_))));
	assert!(matches!(commands.merge(OPERATOR, "../outside", "bob", "duo"), Err(MarkovError::InvalidName(_))));
	assert!(outside.exists());
	assert_eq!(commands.list_corpora(), vec!["alice, alison, bob"]);
}

#[test]
fn aggregate_cannot_be_an_admin_source() {
	let dir = tempfile::tempdir().unwrap();
	let commands = seeded(dir.path());
	commands.merge(OPERATOR, "alice", "bob", "duo").unwrap();

	assert!(matches!(commands.rename(OPERATOR, "everyone", "crowd"), Err(MarkovError::InvalidName(_))));
	assert!(matches!(commands.merge(OPERATOR, "everyone", "bob", "crowd"), Err(MarkovError::InvalidName(_))));
	assert!(matches!(commands.merge(OPERATOR, "bob", "everyone", "crowd"), Err(MarkovError::InvalidName(_))));
	assert_eq!(commands.list_corpora(), vec!["alice, alison, bob, duo, everyone"]);
}

#[test]
fn removing_the_last_corpus_removes_the_aggregate() {
	let dir = tempfile::tempdir().unwrap();
	let commands = Commands::new(config(dir.path())).unwrap();
	commands.update(bob_batch()).unwrap();
	assert_eq!(commands.list_corpora(), vec!["bob, everyone"]);

	commands.remove(OPERATOR, "bob").unwrap();
	assert!(commands.list_corpora().is_empty());
	assert!(!dir.path().join("people").join("everyone.json").exists());
}

#[test]
fn extra_repositories_are_separate_name_sets() {
	let dir = tempfile::tempdir().unwrap();
	let mut reddit = CorpusStore::open(dir.path().join("reddit")).unwrap();
	reddit.put("carol", &TextModel::from_lines(["carol posts memes"], 2).unwrap()).unwrap();
	let mut store = CorpusStore::open(dir.path().join("people")).unwrap();
	store.put("alice", &TextModel::from_lines(["the cat sat down"], 2).unwrap()).unwrap();

	let mut config = config(dir.path());
	config.repositories.insert("reddit".to_owned(), dir.path().join("reddit"));
	let commands = Commands::new(config).unwrap();

	assert_eq!(commands.repositories(), vec!["people", "reddit"]);
	assert_eq!(commands.generate_in(Some("reddit"), "carol", None).unwrap().text, "carol posts memes");
	assert!(matches!(commands.generate("carol", None), Err(MarkovError::NameNotFound(_))));
	assert!(matches!(commands.generate_in(Some("reddit"), "alice", None), Err(MarkovError::NameNotFound(_))));
	assert_eq!(commands.generate_in(Some("people"), "alice", None).unwrap().label, "Alice");

	assert_eq!(commands.list_corpora_in(Some("reddit")).unwrap(), vec!["carol"]);
	assert_eq!(commands.list_corpora_in(None).unwrap(), vec!["alice"]);
	assert!(matches!(commands.list_corpora_in(Some("nope")), Err(MarkovError::UnknownRepository(_))));
	assert_eq!(commands.markov_in(Some("nope"), "carol").text, "Error: Unknown repository (nope).");
}

#[test]
fn repository_cannot_shadow_the_primary_name() {
	let dir = tempfile::tempdir().unwrap();
	let mut config = config(dir.path());
	config.repositories.insert("people".to_owned(), dir.path().join("other"));
	assert!(matches!(Commands::new(config), Err(MarkovError::Config(_))));
}

#[test]
fn configured_overlap_limits_are_validated() {
	let dir = tempfile::tempdir().unwrap();
	let mut config = config(dir.path());
	config.limits.max_overlap_ratio = 2.0;
	assert!(matches!(Commands::new(config), Err(MarkovError::Config(_))));
}
