use std::io;

use thiserror::Error;

/// Every failure the command core can report.
///
/// Variants carry structured data (names, candidate lists) so the host can
/// format its own message. `commands::user_message` is the formatting used
/// by the bundled hosts.
#[derive(Debug, Error)]
pub enum MarkovError {
	/// A query substring matched no corpus.
	#[error("no corpus matches \"{0}\"")]
	NameNotFound(String),

	/// A query substring matched several corpora and none exactly.
	#[error("\"{name}\" matches several corpora: {}", .candidates.join(", "))]
	AmbiguousInput { name: String, candidates: Vec<String> },

	/// The `+`-separated query holds more names than allowed.
	#[error("too many names in query ({0})")]
	TooManyInputs(usize),

	/// A corpus file is missing or cannot be decoded.
	#[error("corpus file not found or unreadable: {0}.json")]
	FileNotFound(String),

	/// Sampling exhausted every attempt without a valid sentence.
	#[error("insufficient data to generate a sentence")]
	InsufficientData,

	/// A generation request named a repository that is not configured.
	#[error("unknown corpus repository: {0:?}")]
	UnknownRepository(String),

	/// The caller is not the configured operator.
	#[error("permission denied")]
	PermissionDenied,

	/// A name sanitizes to nothing or holds forbidden characters.
	#[error("invalid corpus name: {0:?}")]
	InvalidName(String),

	/// The target of a rename already exists.
	#[error("corpus already exists: {0}")]
	NameTaken(String),

	/// A strict seed cannot begin any sentence, or the seed is empty.
	#[error("seed {0:?} cannot start a sentence")]
	InvalidSeed(String),

	/// A chain is malformed (state size zero, state tuple of the wrong length).
	#[error("invalid model: {0}")]
	InvalidModel(String),

	/// Two chains with different state sizes cannot be merged.
	#[error("state size mismatch: {0} vs {1}")]
	StateSizeMismatch(usize, usize),

	/// Writing or deleting the file backing a named corpus failed.
	#[error("failed to write {name}: {source}")]
	Storage {
		name: String,
		#[source]
		source: io::Error,
	},

	#[error("configuration error: {0}")]
	Config(String),

	#[error("I/O error: {0}")]
	Io(#[from] io::Error),

	#[error("serialization error: {0}")]
	Json(#[from] serde_json::Error),

	/// Catch-all for faults with no dedicated variant, such as a panicked
	/// worker thread.
	#[error("unknown error: {0}")]
	Unknown(String),
}

impl MarkovError {
	/// Builds a storage error for the file backing `name`.
	pub fn storage(name: impl Into<String>, source: io::Error) -> Self {
		Self::Storage { name: name.into(), source }
	}
}

pub type Result<T> = std::result::Result<T, MarkovError>;
