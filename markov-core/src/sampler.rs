use log::debug;

use crate::error::{MarkovError, Result};
use crate::model::{SentenceOptions, TextModel};

/// Bounded-retry sentence sampling against a (combined) model.
#[derive(Clone, Debug)]
pub struct Sampler {
	/// Outer attempts; each one runs `options.tries` model walks.
	pub max_attempts: usize,
	pub options: SentenceOptions,
}

impl Default for Sampler {
	fn default() -> Self {
		Self { max_attempts: 10, options: SentenceOptions::default() }
	}
}

impl Sampler {
	pub fn new(max_attempts: usize, options: SentenceOptions) -> Self {
		Self { max_attempts, options }
	}

	/// Samples one sentence, beginning with `start` when given.
	///
	/// The start is honoured loosely: when it cannot open a sentence the
	/// model may substitute similar states. A blank start counts as none.
	///
	/// # Errors
	/// `InsufficientData` once every attempt came back empty.
	pub fn sample(&self, model: &TextModel, start: Option<&str>) -> Result<String> {
		let start = start.map(str::trim).filter(|start| !start.is_empty());

		for attempt in 0..self.max_attempts {
			let output = match start {
				None => model.make_sentence(None, &self.options),
				Some(start) => model.make_sentence_with_start(start, false, &self.options)?,
			};
			if let Some(sentence) = output {
				return Ok(sentence);
			}
			debug!("sampling attempt {} of {} came back empty", attempt + 1, self.max_attempts);
		}
		Err(MarkovError::InsufficientData)
	}
}
