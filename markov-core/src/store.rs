use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{MarkovError, Result};
use crate::io;
use crate::model::TextModel;

/// Extension of corpus files.
pub const CORPUS_EXTENSION: &str = "json";

/// Sanitizes a display name into a canonical corpus name.
///
/// Drops every character outside `[0-9a-zA-Z_-]`, then lowercases.
///
/// Examples:
/// - `"Bob!!"` → `"bob"`
/// - `"Mr. X-Ray_2"` → `"mrx-ray_2"`
pub fn canonical_name(raw: &str) -> String {
	raw.chars()
		.filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
		.collect::<String>()
		.to_ascii_lowercase()
}

/// Flat directory of `<name>.json` corpora.
///
/// The set of names is listed once on open and kept in sync by every
/// write made through the store. Changes made to the directory by other
/// processes are only picked up by [`CorpusStore::refresh`].
///
/// # Invariants
/// - `names` is sorted and holds no duplicates
/// - Every name in `names` is canonical; other files are ignored
/// - No operation touches a path outside `root`
#[derive(Debug)]
pub struct CorpusStore {
	root: PathBuf,
	names: Vec<String>,
}

impl CorpusStore {
	/// Opens (creating it if needed) the corpus directory at `root`.
	pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
		let root = root.as_ref().to_path_buf();
		fs::create_dir_all(&root)?;
		let names = Self::scan(&root)?;
		debug!("opened corpus store {} with {} corpora", root.display(), names.len());
		Ok(Self { root, names })
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Every known corpus name, sorted.
	pub fn list(&self) -> &[String] {
		&self.names
	}

	pub fn contains(&self, name: &str) -> bool {
		self.names.binary_search_by(|probe| probe.as_str().cmp(name)).is_ok()
	}

	/// Re-reads the name set from the directory.
	pub fn refresh(&mut self) -> Result<()> {
		self.names = Self::scan(&self.root)?;
		Ok(())
	}

	fn scan(root: &Path) -> Result<Vec<String>> {
		let mut names = io::list_files(root, CORPUS_EXTENSION)?;
		names.retain(|name| {
			let canonical = canonical_name(name) == *name;
			if !canonical {
				warn!("ignoring corpus file with non-canonical name {name:?}");
			}
			canonical
		});
		Ok(names)
	}

	fn path_for(&self, name: &str) -> PathBuf {
		self.root.join(format!("{name}.{CORPUS_EXTENSION}"))
	}

	/// Loads the corpus stored under `name`.
	///
	/// # Errors
	/// - `InvalidName` if `name` is not canonical.
	/// - `FileNotFound(name)` if the file is missing or cannot be decoded.
	pub fn get(&self, name: &str) -> Result<TextModel> {
		Self::check_name(name)?;
		let path = self.path_for(name);
		let text = io::read_text(&path).map_err(|e| {
			debug!("cannot read {}: {e}", path.display());
			MarkovError::FileNotFound(name.to_owned())
		})?;
		TextModel::from_json(&text).map_err(|e| {
			warn!("corpus {} is corrupt: {e}", path.display());
			MarkovError::FileNotFound(name.to_owned())
		})
	}

	/// Writes `model` under `name`, replacing any previous corpus.
	///
	/// # Errors
	/// - `InvalidName` if `name` is not canonical.
	/// - `Storage` if the file cannot be written.
	pub fn put(&mut self, name: &str, model: &TextModel) -> Result<()> {
		Self::check_name(name)?;
		let json = model.to_json()?;
		fs::write(self.path_for(name), json).map_err(|e| MarkovError::storage(name, e))?;

		if let Err(index) = self.names.binary_search_by(|probe| probe.as_str().cmp(name)) {
			self.names.insert(index, name.to_owned());
		}
		debug!("stored corpus {name}");
		Ok(())
	}

	/// Deletes the corpus stored under `name`.
	///
	/// # Errors
	/// - `InvalidName` if `name` is not canonical.
	/// - `FileNotFound(name)` if no such corpus exists.
	/// - `Storage` if the file cannot be removed.
	pub fn delete(&mut self, name: &str) -> Result<()> {
		Self::check_name(name)?;
		match fs::remove_file(self.path_for(name)) {
			Ok(()) => {}
			Err(e) if e.kind() == ErrorKind::NotFound => {
				self.forget(name);
				return Err(MarkovError::FileNotFound(name.to_owned()));
			}
			Err(e) => return Err(MarkovError::storage(name, e)),
		}
		self.forget(name);
		debug!("deleted corpus {name}");
		Ok(())
	}

	/// Moves the corpus `old` to `new`.
	///
	/// # Errors
	/// - `InvalidName` if `old` or `new` is not canonical.
	/// - `FileNotFound(old)` if `old` does not exist.
	/// - `NameTaken(new)` if `new` already exists.
	pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
		Self::check_name(old)?;
		Self::check_name(new)?;
		if !self.path_for(old).is_file() {
			return Err(MarkovError::FileNotFound(old.to_owned()));
		}
		if self.contains(new) || self.path_for(new).exists() {
			return Err(MarkovError::NameTaken(new.to_owned()));
		}

		fs::rename(self.path_for(old), self.path_for(new)).map_err(|e| MarkovError::storage(old, e))?;
		self.forget(old);
		if let Err(index) = self.names.binary_search_by(|probe| probe.as_str().cmp(new)) {
			self.names.insert(index, new.to_owned());
		}
		debug!("renamed corpus {old} to {new}");
		Ok(())
	}

	fn forget(&mut self, name: &str) {
		self.names.retain(|known| known != name);
	}

	fn check_name(name: &str) -> Result<()> {
		if name.is_empty() || canonical_name(name) != name {
			return Err(MarkovError::InvalidName(name.to_owned()));
		}
		Ok(())
	}
}
