//! Free-text name queries to canonical corpus names.

use crate::error::{MarkovError, Result};

/// Separator between the names of a query.
pub const NAME_SEPARATOR: char = '+';

/// Splits a person expression such as `"ali+Bob"` into query substrings.
///
/// Parts are trimmed and lowercased; empty parts are kept (an empty part
/// matches every name).
///
/// # Errors
/// `TooManyInputs(count)` if the expression holds more than `max_names` parts.
pub fn split_query(expression: &str, max_names: usize) -> Result<Vec<String>> {
	let parts: Vec<String> = expression.split(NAME_SEPARATOR).map(|part| part.trim().to_lowercase()).collect();
	if parts.len() > max_names {
		return Err(MarkovError::TooManyInputs(parts.len()));
	}
	Ok(parts)
}

/// Resolves every query substring to one of `valid_names`.
///
/// Per substring, in order:
/// - an exact match wins;
/// - otherwise the single name containing the substring is selected;
/// - no containing name fails with `NameNotFound`;
/// - several fail with `AmbiguousInput`, candidates in `valid_names` order.
///
/// Selections keep the order of `queries`. The first failing substring
/// aborts the resolution.
pub fn resolve<S: AsRef<str>>(queries: &[S], valid_names: &[String]) -> Result<Vec<String>> {
	queries.iter().map(|query| resolve_one(query.as_ref(), valid_names)).collect()
}

fn resolve_one(query: &str, valid_names: &[String]) -> Result<String> {
	if let Some(exact) = valid_names.iter().find(|name| *name == query) {
		return Ok(exact.clone());
	}

	let mut candidates: Vec<String> = valid_names.iter().filter(|name| name.contains(query)).cloned().collect();
	match candidates.len() {
		0 => Err(MarkovError::NameNotFound(query.to_owned())),
		1 => Ok(candidates.remove(0)),
		_ => Err(MarkovError::AmbiguousInput { name: query.to_owned(), candidates }),
	}
}
