//! Pattern matching utilities for the `like` filter operator.
//!
//! Provides a single, canonical implementation used by both the full
//! rebuild path and the incremental update path, ensuring identical
//! semantics across both.
//!
//! `like` matching is **case-insensitive** and passes when the pattern
//! occurs either as a substring or as a whole word of the value. Matching
//! operates on Unicode scalar values.

use alloc::string::String;

/// Case-insensitive substring match.
///
/// ```
/// use cubist_core::pattern_match::contains_ci;
/// assert!(contains_ci("New York", "york"));
/// assert!(!contains_ci("New York", "boston"));
/// ```
pub fn contains_ci(value: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    lower(value).contains(&lower(needle))
}

/// Case-insensitive whole-word match.
///
/// Words are maximal runs of alphanumeric characters.
///
/// ```
/// use cubist_core::pattern_match::word_match_ci;
/// assert!(word_match_ci("quarterly sales report", "SALES"));
/// assert!(!word_match_ci("wholesale", "sales"));
/// ```
pub fn word_match_ci(value: &str, needle: &str) -> bool {
    let needle = lower(needle);
    value
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| !word.is_empty() && lower(word) == needle)
}

/// The `like` operator: substring or whole-word match, case-insensitive.
pub fn like(value: &str, pattern: &str) -> bool {
    contains_ci(value, pattern) || word_match_ci(value, pattern)
}

fn lower(s: &str) -> String {
    s.chars().flat_map(|c| c.to_lowercase()).collect()
}
