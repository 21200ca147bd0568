//! Word-level Markov text model.
//!
//! - Weighted successor tables (`State`)
//! - Fixed state-size chains with begin/end markers (`Chain`)
//! - Sentence generation, merging and the corpus JSON format (`TextModel`)
//! - Per-call generation parameters (`SentenceOptions`)

/// Word chain keyed by state tuples.
///
/// Handles run ingestion, random walks and merging.
pub mod chain;

/// Parameters of a single sentence generation call.
pub mod sentence_options;

/// Successor table of a single chain state.
///
/// Tracks outgoing transitions and supports weighted random sampling.
pub mod state;

/// Sentence-level model built on a `Chain`.
///
/// Supports building from newline text, seeded generation with
/// overlap rejection, combination and (de)serialization.
pub mod text_model;

pub use chain::{BEGIN, Chain, END};
pub use sentence_options::SentenceOptions;
pub use text_model::{DEFAULT_STATE_SIZE, TextModel};
