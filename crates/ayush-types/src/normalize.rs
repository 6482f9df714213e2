//! Code and term text normalization.
//!
//! Every stored code and every incoming query code passes through
//! [`normalize`] before it is compared with anything else.

/// Non-breaking space (U+00A0).
pub const NBSP: char = '\u{00A0}';

/// Canonicalizes a code or term string.
///
/// Replaces non-breaking spaces with ordinary spaces, collapses every run of
/// whitespace into a single space and trims both ends.
///
/// # Examples
///
/// ```
/// use ayush_types::normalize;
///
/// assert_eq!(normalize("  SR10 \u{00A0} (TM2) "), "SR10 (TM2)");
/// assert_eq!(normalize(""), "");
/// ```
pub fn normalize(text: &str) -> String {
    text.replace(NBSP, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes an optional value, passing `None` through unchanged.
pub fn normalize_opt(text: Option<&str>) -> Option<String> {
    text.map(normalize)
}

/// Returns true if `text` is already in normalized form.
pub fn is_normalized(text: &str) -> bool {
    !text.contains(NBSP)
        && !text.contains("  ")
        && text.trim() == text
        && !text.chars().any(|c| c.is_whitespace() && c != ' ')
}
