use crate::error::{MarkovError, Result};

/// Parameters of a single `make_sentence` call.
///
/// # Responsibilities
/// - Bound the number of internal walks (`tries`)
/// - Configure the overlap test rejecting sentences copied from the corpus
/// - Optionally bound the word count of accepted sentences
///
/// # Invariants
/// - `max_overlap_ratio` always lies in `[0.0, 1.0]`
#[derive(Clone, Debug, PartialEq)]
pub struct SentenceOptions {
	/// Number of walks attempted before giving up.
	pub tries: usize,

	/// Maximum share of a sentence that may be copied verbatim.
	///
	/// Set through [`SentenceOptions::set_max_overlap_ratio`] from outside
	/// the crate.
	pub(crate) max_overlap_ratio: f64,

	/// Maximum number of consecutive words that may be copied verbatim.
	pub max_overlap_total: usize,

	/// Whether generated sentences are checked against the training text.
	pub test_output: bool,

	pub min_words: Option<usize>,
	pub max_words: Option<usize>,
}

impl Default for SentenceOptions {
	fn default() -> Self {
		Self {
			tries: 10,
			max_overlap_ratio: 0.7,
			max_overlap_total: 15,
			test_output: true,
			min_words: None,
			max_words: None,
		}
	}
}

impl SentenceOptions {
	/// Default options with a custom number of tries.
	pub fn with_tries(tries: usize) -> Self {
		Self { tries, ..Self::default() }
	}

	/// Turns the overlap test on or off.
	pub fn with_output_test(mut self, test_output: bool) -> Self {
		self.test_output = test_output;
		self
	}

	pub fn max_overlap_ratio(&self) -> f64 {
		self.max_overlap_ratio
	}

	/// Sets the overlap ratio (0.0..1.0).
	///
	/// # Errors
	/// Returns an error if the value is outside the valid range.
	pub fn set_max_overlap_ratio(&mut self, ratio: f64) -> Result<()> {
		if !(0.0..=1.0).contains(&ratio) {
			return Err(MarkovError::Config(format!(
				"max_overlap_ratio must be between 0.0 and 1.0, got {}",
				ratio
			)));
		}
		self.max_overlap_ratio = ratio;
		Ok(())
	}

	/// Whether `count` words satisfy the configured bounds.
	pub(crate) fn accepts_length(&self, count: usize) -> bool {
		self.min_words.is_none_or(|min| count >= min) && self.max_words.is_none_or(|max| count <= max)
	}

	/// Longest verbatim run allowed in a sentence of `count` words.
	pub(crate) fn overlap_max(&self, count: usize) -> usize {
		let by_ratio = (self.max_overlap_ratio * count as f64).round_ties_even() as usize;
		self.max_overlap_total.min(by_ratio)
	}
}
