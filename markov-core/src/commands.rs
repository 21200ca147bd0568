use std::collections::BTreeMap;
use std::iter;

use log::{debug, error, info, warn};
use parking_lot::RwLock;
use serde::Serialize;

use crate::config::{Config, PRIMARY_REPOSITORY};
use crate::error::{MarkovError, Result};
use crate::fanfic::{FanficGenerator, Pairing};
use crate::label::{display_label, paginate};
use crate::loader::load_and_combine;
use crate::model::DEFAULT_STATE_SIZE;
use crate::resolver::{resolve, split_query};
use crate::sampler::Sampler;
use crate::store::{CorpusStore, canonical_name};
use crate::updater::{self, HighWaterMark, UpdateBatch, UpdatePolicy, UpdateSummary};

/// A generated sentence and the label to show it under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Generated {
	pub text: String,
	pub label: String,
}

/// What the host shows for a command, errors included.
pub type Reply = Generated;

/// Formats an error for chat users.
///
/// Unexpected faults are logged and reported with a generic message.
pub fn user_message(err: &MarkovError) -> String {
	match err {
		MarkovError::TooManyInputs(count) => format!("Error: Too many inputs ({count})."),
		MarkovError::AmbiguousInput { name, candidates } => {
			format!("Error: Input maps to multiple users (\"{name}\" -> {}).", candidates.join(", "))
		}
		MarkovError::FileNotFound(name) => format!("Error: File not found ({name}.json)."),
		MarkovError::NameNotFound(name) => format!("Error: User not found ({name})."),
		MarkovError::InsufficientData => "Error: insufficient data for Markov chain.".to_owned(),
		MarkovError::PermissionDenied => "Error: You are not allowed to do that.".to_owned(),
		MarkovError::InvalidName(name) => format!("Error: Invalid name ({name})."),
		MarkovError::NameTaken(name) => format!("Error: Name already in use ({name})."),
		MarkovError::UnknownRepository(name) => format!("Error: Unknown repository ({name})."),
		other => {
			error!("command failed: {other}");
			"Error: Unknown error.".to_owned()
		}
	}
}

/// Command surface exposed to a chat host.
///
/// Every command runs to completion on the calling thread. Each store sits
/// behind a read/write lock: generation and listing share it, updates and
/// administrative commands take it exclusively, so readers never observe a
/// half-updated name set.
///
/// The primary repository (`corpus_dir`) is the only one written to. The
/// extra `[repositories]` serve generation and listing.
pub struct Commands {
	config: Config,
	store: RwLock<CorpusStore>,
	repositories: BTreeMap<String, RwLock<CorpusStore>>,
	fanfic: Option<FanficGenerator>,
	sampler: Sampler,
	policy: UpdatePolicy,
	mark: HighWaterMark,
}

impl Commands {
	/// Opens the corpus stores and, if present, the fanfic corpus.
	///
	/// A missing fanfic corpus only disables the fanfic command.
	///
	/// # Errors
	/// - `Config` if an extra repository reuses the primary name, or the
	///   overlap limits are out of range.
	/// - `Io` if a corpus directory cannot be created or listed.
	pub fn new(config: Config) -> Result<Self> {
		let store = CorpusStore::open(&config.corpus_dir)?;
		let mut repositories = BTreeMap::new();
		for (name, dir) in &config.repositories {
			if name == PRIMARY_REPOSITORY {
				return Err(MarkovError::Config(format!("repository name {name:?} is reserved for corpus_dir")));
			}
			let extra = CorpusStore::open(dir)?;
			info!("loaded {} corpora from repository {name}", extra.list().len());
			repositories.insert(name.clone(), RwLock::new(extra));
		}
		let fanfic = match FanficGenerator::load(&config.fanfic_dir, config.fanfic.clone()) {
			Ok(generator) => Some(generator),
			Err(e) => {
				warn!("fanfic disabled: {e}");
				None
			}
		};
		info!("loaded {} corpora from {}", store.list().len(), config.corpus_dir.display());

		Ok(Self {
			sampler: Sampler::new(config.limits.max_attempts, config.sentence_options()?),
			policy: UpdatePolicy {
				min_messages: config.limits.min_messages,
				aggregate_name: config.aggregate_name.clone(),
				state_size: DEFAULT_STATE_SIZE,
			},
			mark: HighWaterMark::new(&config.timestamp_file),
			store: RwLock::new(store),
			repositories,
			fanfic,
			config,
		})
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Names of every repository, the primary one first.
	pub fn repositories(&self) -> Vec<&str> {
		iter::once(PRIMARY_REPOSITORY).chain(self.repositories.keys().map(String::as_str)).collect()
	}

	/// The store behind `repository`; `None` or a blank name is the primary one.
	fn repository(&self, repository: Option<&str>) -> Result<&RwLock<CorpusStore>> {
		match repository.map(str::trim).filter(|name| !name.is_empty()) {
			None | Some(PRIMARY_REPOSITORY) => Ok(&self.store),
			Some(name) => {
				self.repositories.get(name).ok_or_else(|| MarkovError::UnknownRepository(name.to_owned()))
			}
		}
	}

	fn error_reply(&self, err: &MarkovError) -> Reply {
		Reply { text: user_message(err), label: self.config.default_label.clone() }
	}

	/// Runs the markov command on raw argument text.
	///
	/// The first word is the person expression, the rest the root words.
	pub fn markov(&self, args: &str) -> Reply {
		self.markov_in(None, args)
	}

	/// [`Commands::markov`] against a named repository.
	pub fn markov_in(&self, repository: Option<&str>, args: &str) -> Reply {
		let args = args.trim();
		let (person, root) = match args.split_once(char::is_whitespace) {
			Some((person, root)) => (person, Some(root)),
			None => (args, None),
		};
		self.generate_reply(repository, person, root)
	}

	/// [`Commands::generate_in`] with errors turned into replies.
	pub fn generate_reply(&self, repository: Option<&str>, person: &str, root: Option<&str>) -> Reply {
		self.generate_in(repository, person, root).unwrap_or_else(|e| self.error_reply(&e))
	}

	/// Generates a sentence in the voice of the people named by `person`,
	/// from the primary repository.
	///
	/// # Errors
	/// `TooManyInputs`, `NameNotFound`, `AmbiguousInput`, `FileNotFound`
	/// or `InsufficientData`.
	pub fn generate(&self, person: &str, root: Option<&str>) -> Result<Generated> {
		self.generate_in(None, person, root)
	}

	/// [`Commands::generate`] against a named repository.
	///
	/// # Errors
	/// As [`Commands::generate`], plus `UnknownRepository`.
	pub fn generate_in(&self, repository: Option<&str>, person: &str, root: Option<&str>) -> Result<Generated> {
		let store = self.repository(repository)?;
		let queries = split_query(person, self.config.limits.max_names)?;
		let (names, model) = {
			let store = store.read();
			let names = resolve(&queries, store.list())?;
			let model = load_and_combine(&store, &names)?;
			(names, model)
		};
		debug!("generating from {}", names.join("+"));

		let text = self.sampler.sample(&model, root)?;
		Ok(Generated { text, label: display_label(&names, self.config.limits.label_length) })
	}

	/// Corpus names of the primary repository, split into pages that fit
	/// one chat message.
	pub fn list_corpora(&self) -> Vec<String> {
		paginate(self.store.read().list(), self.config.limits.page_length)
	}

	/// [`Commands::list_corpora`] for a named repository.
	///
	/// # Errors
	/// `UnknownRepository` if no such repository is configured.
	pub fn list_corpora_in(&self, repository: Option<&str>) -> Result<Vec<String>> {
		let store = self.repository(repository)?;
		Ok(paginate(store.read().list(), self.config.limits.page_length))
	}

	/// Generates a fanfic paragraph.
	///
	/// # Errors
	/// `FileNotFound` when no fanfic corpus is loaded.
	pub fn fanfic(&self, person1: Option<&str>, person2: Option<&str>, pairing: Pairing) -> Result<String> {
		let generator = self.fanfic.as_ref().ok_or_else(|| MarkovError::FileNotFound("corpus".to_owned()))?;
		generator.generate(person1, person2, pairing)
	}

	/// [`Commands::fanfic`] with errors turned into messages.
	pub fn fanfic_reply(&self, person1: Option<&str>, person2: Option<&str>, pairing: Pairing) -> String {
		self.fanfic(person1, person2, pairing).unwrap_or_else(|e| user_message(&e))
	}

	/// Folds the documents newer than the high-water mark into the primary
	/// store, then advances the mark to the newest of them.
	///
	/// The mark is read and written under the store's write lock, so
	/// concurrent updates never fold the same document twice.
	pub fn update(&self, batch: UpdateBatch) -> Result<UpdateSummary> {
		let mut store = self.store.write();
		let batch = batch.since(self.mark.read()?);
		let summary = updater::update(&batch, &mut store, &self.policy)?;
		if let Some(latest) = batch.latest() {
			self.mark.write(latest)?;
		}
		Ok(summary)
	}

	/// Re-reads every repository's name set from disk.
	pub fn refresh(&self) -> Result<()> {
		self.store.write().refresh()?;
		for store in self.repositories.values() {
			store.write().refresh()?;
		}
		Ok(())
	}

	fn authorize(&self, operator: &str) -> Result<()> {
		match &self.config.operator {
			Some(allowed) if allowed == operator => Ok(()),
			_ => {
				warn!("refused administrative command from {operator:?}");
				Err(MarkovError::PermissionDenied)
			}
		}
	}

	fn check_target(&self, name: &str) -> Result<String> {
		let target = canonical_name(name);
		if target.is_empty() || target == self.policy.aggregate_name {
			return Err(MarkovError::InvalidName(name.to_owned()));
		}
		Ok(target)
	}

	/// Sources must name an individual corpus, never the aggregate.
	fn check_source(&self, name: &str) -> Result<()> {
		if name == self.policy.aggregate_name {
			return Err(MarkovError::InvalidName(name.to_owned()));
		}
		Ok(())
	}

	/// Renames a corpus. `new` is sanitized first.
	///
	/// # Errors
	/// `PermissionDenied`, `InvalidName` (for the aggregate or a
	/// non-canonical `old`), `FileNotFound` or `NameTaken`.
	pub fn rename(&self, operator: &str, old: &str, new: &str) -> Result<()> {
		self.authorize(operator)?;
		self.check_source(old)?;
		let new = self.check_target(new)?;
		self.store.write().rename(old, &new)?;
		info!("renamed {old} to {new}");
		Ok(())
	}

	/// Combines corpora `a` and `b` into `out` (which may be either of them)
	/// and rebuilds the aggregate.
	pub fn merge(&self, operator: &str, a: &str, b: &str, out: &str) -> Result<()> {
		self.authorize(operator)?;
		self.check_source(a)?;
		self.check_source(b)?;
		let out = self.check_target(out)?;
		let mut store = self.store.write();
		let merged = load_and_combine(&store, &[a, b])?;
		store.put(&out, &merged)?;
		updater::rebuild_aggregate(&mut store, &self.policy)?;
		info!("merged {a} and {b} into {out}");
		Ok(())
	}

	/// Deletes a corpus and rebuilds the aggregate.
	///
	/// Removing the last individual corpus also removes the aggregate.
	pub fn remove(&self, operator: &str, name: &str) -> Result<()> {
		self.authorize(operator)?;
		let mut store = self.store.write();
		store.delete(name)?;
		if name != self.policy.aggregate_name {
			updater::rebuild_aggregate(&mut store, &self.policy)?;
		}
		info!("removed {name}");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn messages_match_the_error_kind() {
		assert_eq!(user_message(&MarkovError::TooManyInputs(11)), "Error: Too many inputs (11).");
		assert_eq!(
			user_message(&MarkovError::AmbiguousInput {
				name: "ali".to_owned(),
				candidates: vec!["alice".to_owned(), "alison".to_owned()],
			}),
			"Error: Input maps to multiple users (\"ali\" -> alice, alison)."
		);
		assert_eq!(user_message(&MarkovError::FileNotFound("bob".to_owned())), "Error: File not found (bob.json).");
		assert_eq!(user_message(&MarkovError::NameNotFound("zzz".to_owned())), "Error: User not found (zzz).");
		assert_eq!(user_message(&MarkovError::InsufficientData), "Error: insufficient data for Markov chain.");
	}

	#[test]
	fn unexpected_faults_stay_generic() {
		let err = MarkovError::Io(std::io::Error::other("disk on fire at /srv/secret"));
		assert_eq!(user_message(&err), "Error: Unknown error.");

		let err = MarkovError::Unknown("model worker thread panicked".to_owned());
		assert_eq!(user_message(&err), "Error: Unknown error.");
	}

	#[test]
	fn unknown_repository_is_named() {
		let err = MarkovError::UnknownRepository("reddit".to_owned());
		assert_eq!(user_message(&err), "Error: Unknown repository (reddit).");
	}
}
