use std::fs;
use std::io;
use std::path::Path;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Reads a UTF-8 text file, dropping a leading byte-order mark.
pub(crate) fn read_text<P: AsRef<Path>>(filename: P) -> io::Result<String> {
	let contents = fs::read_to_string(filename)?;
	Ok(match contents.strip_prefix(BYTE_ORDER_MARK) {
		Some(stripped) => stripped.to_owned(),
		None => contents,
	})
}

/// Reads a text file and returns its non-blank lines, trimmed.
///
/// - Splits on `\n` / `\r\n`
/// - Blank lines are skipped
pub(crate) fn read_lines<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	Ok(read_text(filename)?
		.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.map(str::to_owned)
		.collect())
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./data/alice.json"` → `"alice"`
/// - `"alice.json"` → `"alice"`
pub(crate) fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	let stem = input_path
		.as_ref()
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	Ok(stem.to_string_lossy().to_string())
}

/// Lists the stems of all files with a given extension in a directory.
///
/// Returns names only (no paths, no extension), sorted.
pub(crate) fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();

		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			files.push(get_filename(&path)?);
		}
	}

	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn read_text_strips_byte_order_mark() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("bom.txt");
		fs::write(&path, "\u{feff}hello").unwrap();
		assert_eq!(read_text(&path).unwrap(), "hello");
	}

	#[test]
	fn list_files_keeps_matching_extension_only() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("bob.json"), "{}").unwrap();
		fs::write(dir.path().join("alice.json"), "{}").unwrap();
		fs::write(dir.path().join("notes.txt"), "").unwrap();
		fs::create_dir(dir.path().join("nested.json")).unwrap();

		assert_eq!(list_files(dir.path(), "json").unwrap(), vec!["alice", "bob"]);
	}

	#[test]
	fn read_lines_skips_blank_lines() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("characters.txt");
		fs::write(&path, "Harry\r\n\n  Hermione \n").unwrap();
		assert_eq!(read_lines(&path).unwrap(), vec!["Harry", "Hermione"]);
	}
}
