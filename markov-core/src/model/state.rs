use std::collections::HashMap;

use rand::Rng;

/// Successor table of a single chain state.
///
/// A `State` is the set of tokens observed right after one state tuple of a
/// word-level chain, each weighted by how many times it was observed.
///
/// ## Responsibilities:
/// - Accumulate transition occurrences during learning
/// - Predict the next token using weighted random sampling
/// - Merge with the table of the same state from another chain
///
/// ## Invariants
/// - Each transition occurrence count is strictly positive
#[derive(Clone, Debug, Default, PartialEq)]
pub struct State {
	/// Example: { "cat" => 42, "dog" => 3 }
	transitions: HashMap<String, u64>,
}

impl State {
	/// Creates a new empty successor table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a table from stored counts, dropping zero counts.
	pub(crate) fn from_counts<M: IntoIterator<Item = (String, u64)>>(counts: M) -> Self {
		let mut state = Self::new();
		for (next, count) in counts {
			state.add_transition(&next, count);
		}
		state
	}

	/// Records `count` occurrences of a transition toward `next`.
	pub fn add_transition(&mut self, next: &str, count: u64) {
		if count == 0 {
			return;
		}
		*self.transitions.entry(next.to_owned()).or_insert(0) += count;
	}

	/// Predicts the next token using weighted random sampling.
	///
	/// The probability of selecting a token is proportional to its
	/// occurrence count.
	///
	/// Returns `None` if the state has no transitions.
	pub fn predict(&self) -> Option<&str> {
		let total: u64 = self.transitions.values().sum();
		if total == 0 {
			return None;
		}

		let mut r = rand::rng().random_range(0..total);

		let mut fallback: Option<&str> = None;
		for (next, occurrence) in &self.transitions {
			if r < *occurrence {
				return Some(next);
			}
			r -= occurrence;
			fallback = Some(next);
		}

		fallback
	}

	/// Merges another successor table into this one, summing counts.
	pub fn merge(&mut self, other: &Self) {
		for (next, occurrence) in &other.transitions {
			*self.transitions.entry(next.clone()).or_insert(0) += *occurrence;
		}
	}

	/// Occurrence count of the transition toward `next`.
	pub fn count(&self, next: &str) -> u64 {
		self.transitions.get(next).copied().unwrap_or(0)
	}

	pub fn transitions(&self) -> impl Iterator<Item = (&str, u64)> {
		self.transitions.iter().map(|(k, v)| (k.as_str(), *v))
	}

	pub fn is_empty(&self) -> bool {
		self.transitions.is_empty()
	}
}
