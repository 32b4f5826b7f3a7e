//! Text utilities shared by feature extraction, signal capture, and bootstrap

use std::collections::HashSet;

/// Minimum token length kept by keyword extraction
pub const MIN_KEYWORD_LEN: usize = 4;

/// Stop words excluded from keyword extraction
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "were", "been", "using", "via", "based", "new", "novel",
    "approach", "method", "study",
];

/// Extract topic keywords from text.
///
/// Lowercases, splits on non-alphanumerics, drops short tokens and stop
/// words. Used by topic features, signal capture, and cold-start bootstrap.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();

    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() >= MIN_KEYWORD_LEN && !stop_words.contains(word))
        .map(|s| s.to_string())
        .collect()
}

/// Keywords capped to the most significant (longest-first) `limit` tokens.
///
/// Longer tokens carry more topical signal than short ones; ties keep
/// their order of first appearance.
pub fn top_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords: Vec<String> = extract_keywords(text)
        .into_iter()
        .filter(|k| seen.insert(k.clone()))
        .collect();
    keywords.sort_by(|a, b| b.len().cmp(&a.len()));
    keywords.truncate(limit);
    keywords
}
