//! Display labels and paginated name listings.

/// Builds the label shown next to a generated sentence.
///
/// Names are joined with `+` while the label stays under `budget`
/// characters; a name that does not fit is skipped and counted. The number
/// of skipped names is appended as `+N`. The result is title-cased.
///
/// Examples (budget 30):
/// - `["alice", "bob"]` → `"Alice+Bob"`
/// - five 8-letter names → `"Aaaaaaaa+Aaaaaaaa+Aaaaaaaa+2"`
pub fn display_label<S: AsRef<str>>(names: &[S], budget: usize) -> String {
	let mut label = String::new();
	let mut omitted = 0;

	for name in names {
		let name = name.as_ref();
		if label.chars().count() + name.chars().count() < budget {
			label.push_str(name);
			label.push('+');
		} else {
			omitted += 1;
		}
	}

	if omitted > 0 {
		label.push_str(&omitted.to_string());
	} else {
		label.pop();
	}
	title_case(&label)
}

/// Uppercases every letter that follows a non-letter, lowercases the rest.
pub fn title_case(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	let mut previous_cased = false;
	for c in text.chars() {
		if previous_cased {
			out.extend(c.to_lowercase());
		} else {
			out.extend(c.to_uppercase());
		}
		previous_cased = c.is_alphabetic();
	}
	out
}

/// Splits `names` into `", "`-joined pages shorter than `budget` characters.
///
/// A single name longer than the budget gets a page of its own.
pub fn paginate<S: AsRef<str>>(names: &[S], budget: usize) -> Vec<String> {
	let mut pages = Vec::new();
	let mut page = String::new();

	for name in names {
		let name = name.as_ref();
		if !page.is_empty() && page.chars().count() + name.chars().count() >= budget {
			page.truncate(page.len() - 2);
			pages.push(std::mem::take(&mut page));
		}
		page.push_str(name);
		page.push_str(", ");
	}

	if !page.is_empty() {
		page.truncate(page.len() - 2);
		pages.push(page);
	}
	pages
}
