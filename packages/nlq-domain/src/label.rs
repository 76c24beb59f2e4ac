use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Lowercases, strips accents, and collapses separators so `"Cédula"`, `"cedula"` and
/// `" CEDULA "` compare equal.
pub fn fold_label(raw: &str) -> String {
	let stripped: String = raw
		.nfd()
		.filter(|ch| !is_combining_mark(*ch))
		.map(|ch| if matches!(ch, '_' | '-') { ' ' } else { ch })
		.collect::<String>()
		.to_lowercase();

	stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
