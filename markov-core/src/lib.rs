//! Markov-chain voice imitation for chat bots.
//!
//! This crate turns stored per-person corpora into generated sentences:
//! - Resolving free-text name queries to corpus names
//! - Combining several corpora into one word-level Markov model
//! - Bounded-retry sentence sampling, optionally seeded
//! - Incremental corpus updates from batches of chat messages
//! - A fanfic paragraph generator with name substitution
//!
//! The chat platform itself is left to the host; [`commands::Commands`]
//! is the surface it talks to.

/// Host-facing command surface and user-facing error messages.
pub mod commands;

/// TOML configuration with defaults.
pub mod config;

pub mod error;

/// Paragraph generator over a fixed corpus.
pub mod fanfic;

/// Display labels and paginated listings.
pub mod label;

pub mod loader;

/// Word-level Markov text model.
///
/// Chains, sentence generation and the corpus file format.
pub mod model;

pub mod resolver;

pub mod sampler;

/// Flat directory of per-name corpora.
pub mod store;

/// Batch updates of the corpus store and the high-water mark.
pub mod updater;

/// File helpers (BOM-tolerant reads, directory listings).
///
/// Not exposed
pub(crate) mod io;

pub use commands::{Commands, Generated, Reply};
pub use config::Config;
pub use error::{MarkovError, Result};
