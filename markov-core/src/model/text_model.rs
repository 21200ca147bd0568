use std::collections::{BTreeMap, HashSet};
use std::sync::{LazyLock, mpsc};
use std::thread;

use rand::seq::SliceRandom;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::chain::{BEGIN, Chain};
use super::sentence_options::SentenceOptions;
use crate::error::{MarkovError, Result};

/// State size used by every corpus built by this crate.
pub const DEFAULT_STATE_SIZE: usize = 2;

/// Below this many lines a model is built on the calling thread.
const PARALLEL_THRESHOLD: usize = 2048;

/// Sentences containing quotes, parentheses or brackets, or apostrophes
/// used as quote marks, are left out of training and generation.
static REJECT_PATTERN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r#"(^')|('$)|\s'|'\s|["(\(\)\[\])]"#).expect("reject pattern is valid"));

/// Either a plain JSON value or a JSON string holding that value.
///
/// Older corpus files encode the whole document, or only its chain, as a
/// string of JSON.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Encoded<T> {
	Plain(T),
	Text(String),
}

impl<T: DeserializeOwned> Encoded<T> {
	fn decode(self) -> serde_json::Result<T> {
		match self {
			Encoded::Plain(value) => Ok(value),
			Encoded::Text(text) => serde_json::from_str(&text),
		}
	}
}

/// On-disk layout of a corpus.
#[derive(Serialize, Deserialize)]
struct CorpusFile {
	state_size: usize,
	chain: Encoded<Vec<(Vec<String>, BTreeMap<String, u64>)>>,
	#[serde(default)]
	parsed_sentences: Option<Vec<Vec<String>>>,
}

/// A sentence-level text model: a word [`Chain`] plus, optionally, the
/// tokenized training sentences used to reject verbatim output.
///
/// # Responsibilities
/// - Build the chain from newline-delimited text
/// - Generate sentences, optionally seeded with starting words
/// - Merge with other models of the same state size
/// - Encode to / decode from the corpus JSON format
#[derive(Clone, Debug)]
pub struct TextModel {
	chain: Chain,
	parsed_sentences: Option<Vec<Vec<String>>>,
	/// Training sentences joined with spaces, for the overlap test.
	rejoined_text: Option<String>,
}

impl TextModel {
	/// Creates an empty model that retains its training sentences.
	pub fn new(state_size: usize) -> Result<Self> {
		Ok(Self { chain: Chain::new(state_size)?, parsed_sentences: Some(Vec::new()), rejoined_text: Some(String::new()) })
	}

	/// Wraps an existing chain; no training sentences are retained so
	/// generated output is not overlap-tested.
	pub fn from_chain(chain: Chain) -> Self {
		Self { chain, parsed_sentences: None, rejoined_text: None }
	}

	/// Builds a model from newline-delimited text, one sentence per line.
	pub fn from_text(text: &str, state_size: usize) -> Result<Self> {
		Self::from_lines(text.lines(), state_size)
	}

	/// Builds a model from lines, each one an independent sentence.
	///
	/// # Behavior
	/// - Lines are trimmed and split on whitespace.
	/// - Blank lines and lines matching the reject pattern are skipped.
	/// - Large inputs are split into one chunk per CPU, built on worker
	///   threads and merged in chunk order.
	///
	/// # Errors
	/// - `InvalidModel` if `state_size` is zero.
	/// - `Unknown` if a worker thread panicked.
	pub fn from_lines<I, S>(lines: I, state_size: usize) -> Result<Self>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let lines: Vec<String> = lines.into_iter().map(|line| line.as_ref().to_owned()).collect();
		let mut model = Self::new(state_size)?;

		if lines.len() < PARALLEL_THRESHOLD {
			for line in &lines {
				model.add_sentence(line);
			}
			model.rebuild_rejoined();
			return Ok(model);
		}

		let chunks = num_cpus::get().max(1);
		let chunk_size = lines.len().div_ceil(chunks);

		let (tx, rx) = mpsc::channel();
		let mut workers = Vec::with_capacity(chunks);
		for (index, chunk) in lines.chunks(chunk_size).enumerate() {
			let tx = tx.clone();
			let chunk: Vec<String> = chunk.to_vec();

			workers.push(thread::spawn(move || {
				let partial = Self::new(state_size).map(|mut partial| {
					for sentence in &chunk {
						partial.add_sentence(sentence);
					}
					partial
				});
				// The receiver only goes away if the caller already failed.
				let _ = tx.send((index, partial));
			}));
		}
		drop(tx);

		let mut partials: Vec<(usize, Result<Self>)> = rx.iter().collect();
		for worker in workers {
			// A panicking worker never sent its chunk.
			worker.join().map_err(|_| MarkovError::Unknown("model worker thread panicked".to_owned()))?;
		}
		partials.sort_by_key(|(index, _)| *index);
		for (_, partial) in partials {
			model.merge_without_rebuild(&partial?)?;
		}

		model.rebuild_rejoined();
		Ok(model)
	}

	/// Adds one training sentence, returns whether it was accepted.
	fn add_sentence(&mut self, sentence: &str) -> bool {
		let sentence = sentence.trim();
		if sentence.is_empty() || REJECT_PATTERN.is_match(sentence) {
			return false;
		}

		let words: Vec<String> = sentence.split_whitespace().map(str::to_owned).collect();
		self.chain.add_run(&words);
		if let Some(parsed) = self.parsed_sentences.as_mut() {
			parsed.push(words);
		}
		true
	}

	fn rebuild_rejoined(&mut self) {
		self.rejoined_text = self
			.parsed_sentences
			.as_ref()
			.map(|parsed| parsed.iter().map(|words| words.join(" ")).collect::<Vec<_>>().join(" "));
	}

	pub fn chain(&self) -> &Chain {
		&self.chain
	}

	pub fn state_size(&self) -> usize {
		self.chain.state_size()
	}

	/// Training sentences, if the model retains them.
	pub fn parsed_sentences(&self) -> Option<&[Vec<String>]> {
		self.parsed_sentences.as_deref()
	}

	/// Number of retained training sentences (0 when none are retained).
	pub fn sentence_count(&self) -> usize {
		self.parsed_sentences.as_ref().map_or(0, Vec::len)
	}

	/// Generates a sentence, starting from `init_state` when given.
	///
	/// Leading [`BEGIN`] markers of `init_state` are dropped; the remaining
	/// words open the sentence.
	///
	/// # Returns
	/// - `Some(String)`: the first walk out of `options.tries` that satisfies
	///   the word bounds and, when enabled, the overlap test.
	/// - `None`: every try was rejected.
	pub fn make_sentence(&self, init_state: Option<&[String]>, options: &SentenceOptions) -> Option<String> {
		let prefix: Vec<String> = init_state
			.map(|state| state.iter().skip_while(|word| *word == BEGIN).cloned().collect())
			.unwrap_or_default();
		self.sentence_from(&prefix, init_state, options)
	}

	fn sentence_from(&self, prefix: &[String], init_state: Option<&[String]>, options: &SentenceOptions) -> Option<String> {
		for _ in 0..options.tries {
			let mut words = prefix.to_vec();
			words.extend(self.chain.walk(init_state));

			if words.is_empty() || !options.accepts_length(words.len()) {
				continue;
			}
			if options.test_output && !self.test_sentence_output(&words, options) {
				continue;
			}
			return Some(words.join(" "));
		}
		None
	}

	/// Generates a sentence that begins with `beginning`.
	///
	/// # Behavior
	/// - The trailing `state_size` words (or fewer) of `beginning` form
	///   the seed window; any words before it are kept as a prefix.
	/// - A window shorter than the state size is padded with [`BEGIN`]
	///   markers.
	/// - When `strict` is false, every state whose words (ignoring
	///   [`BEGIN`]) start with the window is also tried. If that finds
	///   nothing, the window shrinks to the last word alone.
	/// - Candidate states are tried in random order.
	///
	/// # Errors
	/// - `InvalidSeed` if `beginning` holds no words.
	/// - `InvalidSeed` in strict mode when no known state matches.
	pub fn make_sentence_with_start(
		&self,
		beginning: &str,
		strict: bool,
		options: &SentenceOptions,
	) -> Result<Option<String>> {
		let split: Vec<String> = beginning.split_whitespace().map(str::to_owned).collect();
		if split.is_empty() {
			return Err(MarkovError::InvalidSeed(beginning.to_owned()));
		}

		let size = self.state_size();
		let window = split.len().min(size);
		let mut prefix_len = split.len() - window;
		let mut init_states = self.candidate_states(&split[prefix_len..], strict);

		if init_states.is_empty() && !strict && window > 1 {
			prefix_len = split.len() - 1;
			init_states = self.candidate_states(&split[prefix_len..], false);
		}
		if init_states.is_empty() {
			return if strict { Err(MarkovError::InvalidSeed(beginning.to_owned())) } else { Ok(None) };
		}

		init_states.shuffle(&mut rand::rng());
		for init_state in &init_states {
			let mut prefix = split[..prefix_len].to_vec();
			prefix.extend(init_state.iter().filter(|word| *word != BEGIN).cloned());
			if let Some(sentence) = self.sentence_from(&prefix, Some(init_state.as_slice()), options) {
				return Ok(Some(sentence));
			}
		}
		Ok(None)
	}

	/// Known states matching a seed window of at most `state_size` words.
	fn candidate_states(&self, window: &[String], strict: bool) -> Vec<Vec<String>> {
		let size = self.state_size();
		let mut exact: Vec<String> = vec![BEGIN.to_owned(); size - window.len()];
		exact.extend(window.iter().cloned());

		let mut states = Vec::new();
		if self.chain.contains_state(&exact) {
			states.push(exact.clone());
		}
		if !strict {
			states.extend(
				self.chain
					.states()
					.filter(|state| **state != exact)
					.filter(|state| {
						let words: Vec<&String> = state.iter().filter(|word| *word != BEGIN).collect();
						words.len() >= window.len() && words.iter().zip(window).all(|(a, b)| *a == b)
					})
					.cloned(),
			);
		}
		states
	}

	/// Rejects output matching the reject pattern or copying a run of
	/// more than `overlap_max` consecutive training words.
	fn test_sentence_output(&self, words: &[String], options: &SentenceOptions) -> bool {
		if REJECT_PATTERN.is_match(&words.join(" ")) {
			return false;
		}
		let Some(rejoined) = &self.rejoined_text else {
			return true;
		};

		let overlap_max = options.overlap_max(words.len());
		let overlap_over = overlap_max + 1;
		let gram_count = words.len().saturating_sub(overlap_max).max(1);
		(0..gram_count).all(|i| {
			let end = (i + overlap_over).min(words.len());
			!rejoined.contains(&words[i..end].join(" "))
		})
	}

	/// Tokens any generated sentence can contain.
	pub fn vocabulary(&self) -> HashSet<&str> {
		self.chain.vocabulary()
	}

	/// Merges another model into this one.
	///
	/// Chains are summed; retained sentences are concatenated. The merged
	/// model retains sentences if either side did.
	///
	/// # Errors
	/// Returns an error if the state sizes differ.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		self.merge_without_rebuild(other)?;
		self.rebuild_rejoined();
		Ok(())
	}

	fn merge_without_rebuild(&mut self, other: &Self) -> Result<()> {
		self.chain.merge(&other.chain)?;
		if let Some(sentences) = &other.parsed_sentences {
			self.parsed_sentences.get_or_insert_with(Vec::new).extend(sentences.iter().cloned());
		}
		Ok(())
	}

	/// Combines several models into a new one.
	///
	/// # Errors
	/// - `InvalidModel` if `models` is empty.
	/// - `StateSizeMismatch` if the models disagree on state size.
	pub fn combine(models: &[TextModel]) -> Result<TextModel> {
		let (first, rest) = models
			.split_first()
			.ok_or_else(|| MarkovError::InvalidModel("nothing to combine".to_owned()))?;

		let mut combined = first.clone();
		for model in rest {
			combined.merge_without_rebuild(model)?;
		}
		combined.rebuild_rejoined();
		Ok(combined)
	}

	/// Decodes a corpus document.
	///
	/// Accepts the plain layout as well as documents (or chains) stored as
	/// JSON strings.
	pub fn from_json(text: &str) -> Result<Self> {
		let file: CorpusFile = serde_json::from_str::<Encoded<CorpusFile>>(text)?.decode()?;
		let chain = Chain::from_entries(file.state_size, file.chain.decode()?)?;

		let mut model = Self { chain, parsed_sentences: file.parsed_sentences, rejoined_text: None };
		model.rebuild_rejoined();
		Ok(model)
	}

	/// Encodes the model in the plain corpus layout.
	pub fn to_json(&self) -> Result<String> {
		let file = CorpusFile {
			state_size: self.state_size(),
			chain: Encoded::Plain(
				self.chain
					.to_entries()
					.into_iter()
					.map(|(key, successors)| (key, successors.into_iter().collect()))
					.collect(),
			),
			parsed_sentences: self.parsed_sentences.clone(),
		};
		Ok(serde_json::to_string(&file)?)
	}
}
