use log::debug;

use crate::error::Result;
use crate::model::TextModel;
use crate::store::CorpusStore;

/// Loads every named corpus and combines them into one model.
///
/// # Errors
/// - `FileNotFound(name)` for the first corpus that is missing or corrupt.
/// - `StateSizeMismatch` if the corpora were built with different state sizes.
pub fn load_and_combine<S: AsRef<str>>(store: &CorpusStore, names: &[S]) -> Result<TextModel> {
	let models = names.iter().map(|name| store.get(name.as_ref())).collect::<Result<Vec<_>>>()?;
	debug!("combining {} corpora", models.len());
	TextModel::combine(&models)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::MarkovError;

	#[test]
	fn combines_all_named_corpora() {
		let dir = tempfile::tempdir().unwrap();
		let mut store = CorpusStore::open(dir.path()).unwrap();
		store.put("alice", &TextModel::from_lines(["the cat sat"], 2).unwrap()).unwrap();
		store.put("bob", &TextModel::from_lines(["a dog ran"], 2).unwrap()).unwrap();

		let combined = load_and_combine(&store, &["alice", "bob"]).unwrap();
		assert_eq!(combined.sentence_count(), 2);
		assert!(combined.vocabulary().contains("cat"));
		assert!(combined.vocabulary().contains("dog"));
	}

	#[test]
	fn missing_corpus_is_named() {
		let dir = tempfile::tempdir().unwrap();
		let mut store = CorpusStore::open(dir.path()).unwrap();
		store.put("alice", &TextModel::from_lines(["the cat sat"], 2).unwrap()).unwrap();

		assert!(matches!(
			load_and_combine(&store, &["alice", "ghost"]),
			Err(MarkovError::FileNotFound(name)) if name == "ghost"
		));
	}
}
