//! Title slugs for provider URL templates.

use unicode_normalization::UnicodeNormalization;

/// Build a URL-safe slug from a media title.
///
/// Lowercases, strips diacritics (NFD + drop combining marks), removes
/// anything outside `[a-z0-9\s-]`, and joins words with single hyphens.
/// Total: an empty or all-symbol title yields `""`.
pub fn make_slug(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();

    cleaned
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

// Combining Diacritical Marks block.
fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}
