//! Input text normalization
//!
//! Typed dialogue arrives with arbitrary punctuation and casing; pattern
//! matching works on the normalized form ("Knock, KNOCK!" -> "knock knock").

/// Lowercased keyword tokens, split on anything non-alphanumeric.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Normalized form of `text`: lowercase tokens joined by single spaces.
pub fn normalize(text: &str) -> String {
    tokenize(text).join(" ")
}
