use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{MarkovError, Result};
use crate::io;
use crate::model::{DEFAULT_STATE_SIZE, TextModel};
use crate::store::{CorpusStore, canonical_name};

/// One chat message collected for an update.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Document {
	/// Stable identity of the author (e.g. a user id).
	pub author_id: String,
	/// Display name, sanitized into the corpus name.
	pub author_name: String,
	pub text: String,
	pub timestamp: DateTime<Utc>,
}

/// Ordered batch of documents gathered since the last update.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct UpdateBatch {
	pub documents: Vec<Document>,
}

impl UpdateBatch {
	pub fn new(documents: Vec<Document>) -> Self {
		Self { documents }
	}

	/// Keeps only documents strictly newer than `mark`.
	pub fn since(self, mark: Option<DateTime<Utc>>) -> Self {
		match mark {
			Some(mark) => Self { documents: self.documents.into_iter().filter(|doc| doc.timestamp > mark).collect() },
			None => self,
		}
	}

	/// Timestamp of the newest document.
	pub fn latest(&self) -> Option<DateTime<Utc>> {
		self.documents.iter().map(|doc| doc.timestamp).max()
	}

	pub fn len(&self) -> usize {
		self.documents.len()
	}

	pub fn is_empty(&self) -> bool {
		self.documents.is_empty()
	}
}

/// Outcome of one update run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
	/// Documents in the batch.
	pub messages: usize,
	/// Existing corpora merged with new documents.
	pub updated: usize,
	/// Corpora created by this run.
	pub created: usize,
}

impl UpdateSummary {
	/// Authors whose corpus was written.
	pub fn authors(&self) -> usize {
		self.updated + self.created
	}
}

impl fmt::Display for UpdateSummary {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Processed {} messages: {} updated, {} new.", self.messages, self.updated, self.created)
	}
}

/// How an update run treats authors and the aggregate corpus.
#[derive(Clone, Debug)]
pub struct UpdatePolicy {
	/// Authors need strictly more non-blank messages than this.
	pub min_messages: usize,
	/// Corpus recomputed from every individual corpus.
	pub aggregate_name: String,
	pub state_size: usize,
}

impl Default for UpdatePolicy {
	fn default() -> Self {
		Self { min_messages: 2, aggregate_name: "everyone".to_owned(), state_size: DEFAULT_STATE_SIZE }
	}
}

struct AuthorLines<'a> {
	name: &'a str,
	lines: Vec<&'a str>,
}

/// Folds `batch` into `store`.
///
/// # Behavior
/// - Documents are grouped by author id, in first-seen order; the first
///   display name seen names the corpus.
/// - Authors with more than `min_messages` non-blank messages get a model
///   built from their messages, one line per training sentence.
/// - That model is merged into the existing corpus, or stored as a new one.
/// - The aggregate corpus is then rebuilt from every other corpus.
///
/// # Errors
/// The first load or write failure aborts the run. Corpora written
/// before the failure stay on disk.
pub fn update(batch: &UpdateBatch, store: &mut CorpusStore, policy: &UpdatePolicy) -> Result<UpdateSummary> {
	let mut summary = UpdateSummary { messages: batch.len(), ..UpdateSummary::default() };

	let mut order: Vec<AuthorLines> = Vec::new();
	let mut index: HashMap<&str, usize> = HashMap::new();
	for doc in &batch.documents {
		let slot = *index.entry(doc.author_id.as_str()).or_insert_with(|| {
			order.push(AuthorLines { name: &doc.author_name, lines: Vec::new() });
			order.len() - 1
		});
		if !doc.text.trim().is_empty() {
			order[slot].lines.push(&doc.text);
		}
	}

	for author in &order {
		if author.lines.len() <= policy.min_messages {
			debug!("skipping {}: only {} messages", author.name, author.lines.len());
			continue;
		}

		let name = canonical_name(author.name);
		if name.is_empty() || name == policy.aggregate_name {
			warn!("skipping author {:?}: no usable corpus name", author.name);
			continue;
		}

		let fresh = TextModel::from_text(&author.lines.join("\n"), policy.state_size)?;
		if store.contains(&name) {
			let mut existing = store.get(&name)?;
			existing.merge(&fresh)?;
			store.put(&name, &existing)?;
			summary.updated += 1;
		} else {
			store.put(&name, &fresh)?;
			summary.created += 1;
		}
	}

	rebuild_aggregate(store, policy)?;
	info!("{summary}");
	Ok(summary)
}

/// Recombines every individual corpus into the aggregate one.
///
/// Once the store holds no individual corpus the aggregate is deleted.
pub fn rebuild_aggregate(store: &mut CorpusStore, policy: &UpdatePolicy) -> Result<()> {
	let names: Vec<String> = store.list().iter().filter(|name| **name != policy.aggregate_name).cloned().collect();
	if names.is_empty() {
		if store.contains(&policy.aggregate_name) {
			store.delete(&policy.aggregate_name)?;
			debug!("deleted {}: no corpus left", policy.aggregate_name);
		}
		return Ok(());
	}

	let mut aggregate = TextModel::new(policy.state_size)?;
	for name in &names {
		aggregate.merge(&store.get(name)?)?;
	}
	store.put(&policy.aggregate_name, &aggregate)?;
	debug!("rebuilt {} from {} corpora", policy.aggregate_name, names.len());
	Ok(())
}

/// File holding the timestamp of the newest processed document.
#[derive(Clone, Debug)]
pub struct HighWaterMark {
	path: PathBuf,
}

impl HighWaterMark {
	pub fn new<P: AsRef<Path>>(path: P) -> Self {
		Self { path: path.as_ref().to_path_buf() }
	}

	/// Reads the stored timestamp, `None` if the file does not exist.
	///
	/// Accepts RFC 3339 or `YYYY-MM-DD HH:MM:SS[.ffffff]` (taken as UTC).
	pub fn read(&self) -> Result<Option<DateTime<Utc>>> {
		let text = match io::read_text(&self.path) {
			Ok(text) => text,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e.into()),
		};
		parse_timestamp(text.trim()).map(Some)
	}

	/// Overwrites the file with `timestamp` in RFC 3339.
	pub fn write(&self, timestamp: DateTime<Utc>) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)?;
		}
		fs::write(&self.path, timestamp.to_rfc3339())
			.map_err(|e| MarkovError::storage(self.path.display().to_string(), e))
	}
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
	if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
		return Ok(timestamp.with_timezone(&Utc));
	}
	NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
		.or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
		.map(|naive| naive.and_utc())
		.map_err(|e| MarkovError::Config(format!("invalid timestamp {text:?}: {e}")))
}
