use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use rand::seq::IndexedRandom;

use crate::config::FanficConfig;
use crate::error::{MarkovError, Result};
use crate::io;
use crate::model::{SentenceOptions, TextModel};

/// Placeholder replaced by the first participant.
pub const PERSON_1: &str = "$PERSON_1";
/// Placeholder replaced by the second participant.
pub const PERSON_2: &str = "$PERSON_2";

pub const CORPUS_FILE: &str = "corpus.json";
pub const CHARACTERS_FILE: &str = "characters.txt";

/// Relationship configuration a paragraph must stay consistent with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pairing {
	/// No filtering.
	#[default]
	Any,
	/// Sentences with female vocabulary are rejected.
	MaleMale,
	/// Sentences with male vocabulary are rejected.
	FemaleFemale,
	/// Both vocabularies are allowed.
	MaleFemale,
}

impl FromStr for Pairing {
	type Err = MarkovError;

	fn from_str(s: &str) -> Result<Self> {
		match s.to_lowercase().as_str() {
			"" | "any" => Ok(Pairing::Any),
			"mm" => Ok(Pairing::MaleMale),
			"ff" => Ok(Pairing::FemaleFemale),
			"mf" | "fm" => Ok(Pairing::MaleFemale),
			other => Err(MarkovError::Config(format!("unknown pairing {other:?}"))),
		}
	}
}

/// Paragraph generator over one fixed corpus with name substitution.
#[derive(Debug)]
pub struct FanficGenerator {
	model: TextModel,
	characters: Vec<String>,
	male_words: HashSet<String>,
	female_words: HashSet<String>,
	settings: FanficConfig,
	options: SentenceOptions,
}

impl FanficGenerator {
	pub fn new(model: TextModel, characters: Vec<String>, settings: FanficConfig) -> Self {
		let lower = |words: &[String]| words.iter().map(|word| word.to_lowercase()).collect();
		Self {
			male_words: lower(&settings.male_words),
			female_words: lower(&settings.female_words),
			options: settings.sentence_options(),
			model,
			characters,
			settings,
		}
	}

	/// Loads `corpus.json` and `characters.txt` from `dir`.
	///
	/// # Errors
	/// `FileNotFound` naming the missing or unreadable file.
	pub fn load<P: AsRef<Path>>(dir: P, settings: FanficConfig) -> Result<Self> {
		let dir = dir.as_ref();
		let text = io::read_text(dir.join(CORPUS_FILE)).map_err(|_| MarkovError::FileNotFound("corpus".to_owned()))?;
		let model = TextModel::from_json(&text).map_err(|_| MarkovError::FileNotFound("corpus".to_owned()))?;
		let characters =
			io::read_lines(dir.join(CHARACTERS_FILE)).map_err(|_| MarkovError::FileNotFound("characters".to_owned()))?;
		Ok(Self::new(model, characters, settings))
	}

	/// Picks a random character name.
	pub fn assign_name(&self) -> Option<&str> {
		self.characters.choose(&mut rand::rng()).map(String::as_str)
	}

	/// Whether `sentence` fits `pairing`.
	pub fn accepts(&self, sentence: &str, pairing: Pairing) -> bool {
		let denied = match pairing {
			Pairing::MaleMale => &self.female_words,
			Pairing::FemaleFemale => &self.male_words,
			Pairing::Any | Pairing::MaleFemale => return true,
		};
		!sentence
			.split_whitespace()
			.map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
			.any(|word| denied.contains(&word))
	}

	/// Generates a paragraph starring `person1` and `person2`.
	///
	/// Missing participants are drawn from the character list. Sentences
	/// are appended until the next one would exceed `max_length`.
	///
	/// # Errors
	/// `InsufficientData` if no participant can be assigned, or if
	/// `restarts` paragraphs in a row hit `sentence_tries` consecutive
	/// rejected sentences.
	pub fn generate(&self, person1: Option<&str>, person2: Option<&str>, pairing: Pairing) -> Result<String> {
		let person1 = person1.or_else(|| self.assign_name()).ok_or(MarkovError::InsufficientData)?;
		let person2 = person2.or_else(|| self.assign_name()).ok_or(MarkovError::InsufficientData)?;

		for restart in 0..self.settings.restarts {
			if let Some(paragraph) = self.paragraph(pairing) {
				return Ok(paragraph.replace(PERSON_1, person1).replace(PERSON_2, person2).replace('\n', ""));
			}
			debug!("fanfic paragraph {} of {} failed, restarting", restart + 1, self.settings.restarts);
		}
		Err(MarkovError::InsufficientData)
	}

	fn paragraph(&self, pairing: Pairing) -> Option<String> {
		let mut paragraph = String::new();
		let mut length = 0;
		let mut failures = 0;

		while failures < self.settings.sentence_tries {
			let sentence = match self.model.make_sentence(None, &self.options) {
				Some(sentence) if self.accepts(&sentence, pairing) => sentence,
				_ => {
					failures += 1;
					continue;
				}
			};
			failures = 0;

			let sentence_length = sentence.chars().count() + 1;
			if length + sentence_length >= self.settings.max_length {
				return (!paragraph.is_empty()).then(|| paragraph.trim_end().to_owned());
			}
			paragraph.push_str(&sentence);
			paragraph.push(' ');
			length += sentence_length;
		}
		None
	}
}
