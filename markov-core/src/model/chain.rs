use std::collections::{HashMap, HashSet};

use super::state::State;
use crate::error::{MarkovError, Result};

/// Marker padding the front of every training run.
pub const BEGIN: &str = "___BEGIN__";

/// Marker closing every training run.
pub const END: &str = "___END__";

/// Upper bound on the tokens a single walk may emit.
pub const MAX_WALK: usize = 500;

/// Word-level Markov chain of a fixed state size.
///
/// A state is the tuple of the last `state_size` tokens; its `State` holds
/// the weighted successors. Runs are padded with `state_size` copies of
/// [`BEGIN`] and terminated with [`END`].
///
/// # Invariants
/// - `state_size` is always >= 1
/// - Every key of `states` holds exactly `state_size` tokens
#[derive(Clone, Debug, PartialEq)]
pub struct Chain {
	state_size: usize,
	states: HashMap<Vec<String>, State>,
}

impl Chain {
	/// Creates an empty chain.
	///
	/// # Errors
	/// Returns an error if `state_size` is 0.
	pub fn new(state_size: usize) -> Result<Self> {
		if state_size == 0 {
			return Err(MarkovError::InvalidModel("state size must be >= 1".to_owned()));
		}
		Ok(Self { state_size, states: HashMap::new() })
	}

	/// Rebuilds a chain from serialized entries.
	///
	/// # Errors
	/// Returns an error if an entry's tuple does not hold `state_size` tokens.
	pub fn from_entries<I, M>(state_size: usize, entries: I) -> Result<Self>
	where
		I: IntoIterator<Item = (Vec<String>, M)>,
		M: IntoIterator<Item = (String, u64)>,
	{
		let mut chain = Self::new(state_size)?;
		for (key, counts) in entries {
			if key.len() != state_size {
				return Err(MarkovError::InvalidModel(format!(
					"state {:?} does not hold {} tokens",
					key, state_size
				)));
			}
			let state = State::from_counts(counts);
			match chain.states.get_mut(&key) {
				Some(existing) => existing.merge(&state),
				None => {
					chain.states.insert(key, state);
				}
			}
		}
		Ok(chain)
	}

	/// Serializes the chain, entries sorted by state tuple then successor.
	pub fn to_entries(&self) -> Vec<(Vec<String>, Vec<(String, u64)>)> {
		let mut entries: Vec<_> = self
			.states
			.iter()
			.map(|(key, state)| {
				let mut successors: Vec<(String, u64)> =
					state.transitions().map(|(next, count)| (next.to_owned(), count)).collect();
				successors.sort();
				(key.clone(), successors)
			})
			.collect();
		entries.sort();
		entries
	}

	pub fn state_size(&self) -> usize {
		self.state_size
	}

	/// The all-[`BEGIN`] state every sentence starts from.
	pub fn begin_state(&self) -> Vec<String> {
		vec![BEGIN.to_owned(); self.state_size]
	}

	/// Adds one training run (a tokenized sentence).
	///
	/// Empty runs are ignored.
	pub fn add_run(&mut self, words: &[String]) {
		if words.is_empty() {
			return;
		}

		let mut items: Vec<&str> = vec![BEGIN; self.state_size];
		items.extend(words.iter().map(String::as_str));
		items.push(END);

		for window in items.windows(self.state_size + 1) {
			let key: Vec<String> = window[..self.state_size].iter().map(|s| (*s).to_owned()).collect();
			self.states.entry(key).or_default().add_transition(window[self.state_size], 1);
		}
	}

	pub fn contains_state(&self, state: &[String]) -> bool {
		self.states.contains_key(state)
	}

	/// All known state tuples.
	pub fn states(&self) -> impl Iterator<Item = &Vec<String>> {
		self.states.keys()
	}

	/// Samples the successor of `state`, `None` for an unknown state.
	pub fn step(&self, state: &[String]) -> Option<&str> {
		self.states.get(state)?.predict()
	}

	/// Walks the chain from `init` (or the begin state) and returns the
	/// emitted tokens.
	///
	/// Stops at [`END`], at a state with no successors, or after
	/// [`MAX_WALK`] tokens. A wrongly sized `init` yields no tokens.
	pub fn walk(&self, init: Option<&[String]>) -> Vec<String> {
		let mut state = match init {
			Some(init) if init.len() != self.state_size => return Vec::new(),
			Some(init) => init.to_vec(),
			None => self.begin_state(),
		};

		let mut words = Vec::new();
		while words.len() < MAX_WALK {
			let next = match self.step(&state) {
				Some(next) if next != END => next.to_owned(),
				_ => break,
			};
			state.remove(0);
			state.push(next.clone());
			words.push(next);
		}
		words
	}

	/// Every token the chain can emit (successors other than [`END`]).
	pub fn vocabulary(&self) -> HashSet<&str> {
		self.states
			.values()
			.flat_map(|state| state.transitions().map(|(next, _)| next))
			.filter(|next| *next != END)
			.collect()
	}

	/// Merges another chain into this one.
	///
	/// Shared states get their counts summed; the other states are cloned.
	///
	/// # Errors
	/// Returns an error if the state sizes differ.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.state_size != other.state_size {
			return Err(MarkovError::StateSizeMismatch(self.state_size, other.state_size));
		}

		for (key, state) in &other.states {
			if let Some(existing) = self.states.get_mut(key) {
				existing.merge(state);
			} else {
				self.states.insert(key.clone(), state.clone());
			}
		}

		Ok(())
	}
}
