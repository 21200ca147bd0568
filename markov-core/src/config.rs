use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{MarkovError, Result};
use crate::io;
use crate::model::SentenceOptions;

/// Environment variable naming the TOML configuration file.
pub const CONFIG_ENV: &str = "MARKOV_CONFIG";

/// Name under which `corpus_dir` is addressed next to the extra repositories.
pub const PRIMARY_REPOSITORY: &str = "people";

/// Host-supplied configuration of the command core.
///
/// Every field has a default, so an empty (or absent) file is valid.
///
/// ```toml
/// corpus_dir = "./data/people"
/// operator = "215367025705484289"
///
/// [repositories]
/// reddit = "./data/reddit"
///
/// [limits]
/// max_attempts = 50
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
	/// Directory holding one `<name>.json` corpus per person.
	///
	/// This is the repository the updater and the administrative commands
	/// write to, addressed as [`PRIMARY_REPOSITORY`].
	pub corpus_dir: PathBuf,
	/// Further corpus directories, by name, available for generation and
	/// listing only.
	pub repositories: BTreeMap<String, PathBuf>,
	/// Directory holding `corpus.json` and `characters.txt`.
	pub fanfic_dir: PathBuf,
	/// High-water-mark file of the corpus updater.
	pub timestamp_file: PathBuf,
	/// Identity allowed to run administrative commands.
	pub operator: Option<String>,
	/// Label returned alongside error replies.
	pub default_label: String,
	/// Name of the corpus combining every individual corpus.
	pub aggregate_name: String,
	pub limits: Limits,
	pub fanfic: FanficConfig,
}

/// Retry bounds and size budgets.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Limits {
	/// Maximum `+`-separated names in a query.
	pub max_names: usize,
	/// Outer sampling attempts per request.
	pub max_attempts: usize,
	/// Walks tried inside each model call.
	pub model_tries: usize,
	/// Whether generated sentences must not copy the training text.
	pub check_overlap: bool,
	/// Share of a sentence that may be copied verbatim (0.0..=1.0).
	pub max_overlap_ratio: f64,
	/// Consecutive words that may be copied verbatim.
	pub max_overlap_total: usize,
	/// Character budget of one page of the corpus listing.
	pub page_length: usize,
	/// Character budget of a display label.
	pub label_length: usize,
	/// Authors need strictly more messages than this in a batch.
	pub min_messages: usize,
}

/// Fanfic generator settings.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct FanficConfig {
	/// Character budget of a paragraph.
	pub max_length: usize,
	/// Whole-paragraph restarts before giving up.
	pub restarts: usize,
	/// Consecutive rejected sentences that fail a paragraph.
	pub sentence_tries: usize,
	/// Walks tried inside each model call.
	pub tries: usize,
	/// Whether sentences must not copy the fanfic corpus.
	pub check_overlap: bool,
	pub male_words: Vec<String>,
	pub female_words: Vec<String>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			corpus_dir: PathBuf::from("./data/people"),
			repositories: BTreeMap::new(),
			fanfic_dir: PathBuf::from("./data/fanfic"),
			timestamp_file: PathBuf::from("./data/last_update.txt"),
			operator: None,
			default_label: "MathBot".to_owned(),
			aggregate_name: "everyone".to_owned(),
			limits: Limits::default(),
			fanfic: FanficConfig::default(),
		}
	}
}

impl Default for Limits {
	fn default() -> Self {
		Self {
			max_names: 10,
			max_attempts: 10,
			model_tries: 10,
			check_overlap: true,
			max_overlap_ratio: 0.7,
			max_overlap_total: 15,
			page_length: 1800,
			label_length: 30,
			min_messages: 2,
		}
	}
}

fn words(list: &[&str]) -> Vec<String> {
	list.iter().map(|word| (*word).to_owned()).collect()
}

impl Default for FanficConfig {
	fn default() -> Self {
		Self {
			max_length: 1800,
			restarts: 5,
			sentence_tries: 50,
			tries: 10,
			check_overlap: true,
			male_words: words(&[
				"he", "him", "his", "himself", "man", "men", "boy", "boys", "boyfriend", "husband", "king",
				"prince", "brother", "father", "son", "sir", "mr",
			]),
			female_words: words(&[
				"she", "her", "hers", "herself", "woman", "women", "girl", "girls", "girlfriend", "wife", "queen",
				"princess", "sister", "mother", "daughter", "madam", "mrs", "ms",
			]),
		}
	}
}

impl Config {
	/// Parses a TOML document.
	pub fn from_toml(content: &str) -> Result<Self> {
		toml::from_str::<Config>(content).map_err(|e| MarkovError::Config(format!("TOML parse error: {e}")))
	}

	/// Loads the configuration from a TOML file.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let content = io::read_text(path)
			.map_err(|e| MarkovError::Config(format!("cannot read {}: {e}", path.display())))?;
		Self::from_toml(&content)
	}

	/// Loads the file named by [`CONFIG_ENV`], or the defaults when unset.
	pub fn from_env() -> Result<Self> {
		match env::var_os(CONFIG_ENV) {
			Some(path) => Self::load(PathBuf::from(path)),
			None => Ok(Self::default()),
		}
	}

	/// Sentence options derived from the limits.
	///
	/// # Errors
	/// `Config` if `max_overlap_ratio` lies outside `0.0..=1.0`.
	pub fn sentence_options(&self) -> Result<SentenceOptions> {
		let mut options =
			SentenceOptions::with_tries(self.limits.model_tries).with_output_test(self.limits.check_overlap);
		options.set_max_overlap_ratio(self.limits.max_overlap_ratio)?;
		options.max_overlap_total = self.limits.max_overlap_total;
		Ok(options)
	}
}

impl FanficConfig {
	/// Sentence options of the fanfic generator.
	pub fn sentence_options(&self) -> SentenceOptions {
		SentenceOptions::with_tries(self.tries).with_output_test(self.check_overlap)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		assert_eq!(Config::from_toml("").unwrap(), Config::default());
	}

	#[test]
	fn partial_tables_keep_other_defaults() {
		let config = Config::from_toml(
			r#"
operator = "1234"
corpus_dir = "/srv/people"

[limits]
max_attempts = 50
check_overlap = false
"#,
		)
		.unwrap();

		assert_eq!(config.operator.as_deref(), Some("1234"));
		assert_eq!(config.corpus_dir, PathBuf::from("/srv/people"));
		assert_eq!(config.limits.max_attempts, 50);
		assert_eq!(config.limits.max_names, 10);
		assert_eq!(config.fanfic.restarts, 5);
		assert!(!config.sentence_options().unwrap().test_output);
	}

	#[test]
	fn overlap_limits_reach_sentence_options() {
		let config = Config::from_toml(
			r#"
[limits]
max_overlap_ratio = 0.5
max_overlap_total = 4
model_tries = 3
"#,
		)
		.unwrap();

		let options = config.sentence_options().unwrap();
		assert_eq!(options.max_overlap_ratio(), 0.5);
		assert_eq!(options.max_overlap_total, 4);
		assert_eq!(options.tries, 3);
		assert!(options.test_output);
	}

	#[test]
	fn out_of_range_overlap_ratio_is_a_config_error() {
		let config = Config::from_toml("[limits]\nmax_overlap_ratio = 1.5\n").unwrap();
		assert!(matches!(config.sentence_options(), Err(MarkovError::Config(_))));
	}

	#[test]
	fn repositories_table_maps_names_to_directories() {
		let config = Config::from_toml(
			r#"
[repositories]
reddit = "/srv/reddit"
"#,
		)
		.unwrap();

		assert_eq!(config.repositories.get("reddit"), Some(&PathBuf::from("/srv/reddit")));
		assert_eq!(config.corpus_dir, PathBuf::from("./data/people"));
	}

	#[test]
	fn fanfic_options_follow_fanfic_settings() {
		let config = Config::from_toml("[fanfic]\ntries = 4\ncheck_overlap = false\n").unwrap();
		let options = config.fanfic.sentence_options();
		assert_eq!(options.tries, 4);
		assert!(!options.test_output);
	}

	#[test]
	fn invalid_document_is_a_config_error() {
		assert!(matches!(Config::from_toml("limits = 3"), Err(MarkovError::Config(_))));
	}

	#[test]
	fn missing_file_is_a_config_error() {
		assert!(matches!(Config::load("/nonexistent/markov.toml"), Err(MarkovError::Config(_))));
	}
}
