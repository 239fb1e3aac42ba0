//! Lexical scoring primitives.
//!
//! Pure functions, no I/O. Used for the debate-level boost in hybrid search
//! and for the token-overlap fallback when embeddings are unavailable.

use std::collections::HashSet;

/// Boost for a query found verbatim in a debate title.
pub const TLDR_MATCH_BOOST: f32 = 0.9;

/// Boost for a query found verbatim in a debate summary.
pub const SUMMARY_MATCH_BOOST: f32 = 0.6;

/// Weight of the word-overlap ratio against a debate title.
pub const PARTIAL_MATCH_WEIGHT: f32 = 0.5;

/// Lowercased word set of `text`, split on whitespace with surrounding
/// punctuation removed.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|word| !word.is_empty())
        .collect()
}

/// Lexical relevance of a debate for `query`, in `[0, 0.9]`.
///
/// In order: the query inside the title scores [`TLDR_MATCH_BOOST`]; any
/// query words among the title's words score [`PARTIAL_MATCH_WEIGHT`] times
/// the matched fraction; the query inside the summary scores
/// [`SUMMARY_MATCH_BOOST`]. Blank queries score zero.
#[must_use]
pub fn lexical_boost(query: &str, tldr: &str, summary: &str) -> f32 {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return 0.0;
    }

    if tldr.to_lowercase().contains(&query) {
        return TLDR_MATCH_BOOST;
    }

    let query_words = tokenize(&query);
    let tldr_words = tokenize(tldr);
    let matches = query_words.intersection(&tldr_words).count();
    if matches > 0 {
        return PARTIAL_MATCH_WEIGHT * (matches as f32 / query_words.len() as f32);
    }

    if summary.to_lowercase().contains(&query) {
        return SUMMARY_MATCH_BOOST;
    }

    0.0
}

/// Final debate score: lexical signals can raise the vector score, never
/// lower it.
#[inline]
#[must_use]
pub fn fuse(vector_score: f32, lexical_boost: f32) -> f32 {
    vector_score.max(lexical_boost)
}

/// Map a non-negative distance to a similarity in `(0, 1]`.
#[inline]
#[must_use]
pub fn distance_to_similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

/// Token-overlap similarity between a query and a document.
///
/// `matches / (|query| + |text| - matches)`, or `None` when no word matches.
#[must_use]
pub fn jaccard_score(query_words: &HashSet<String>, text: &str) -> Option<f32> {
    let text_words = tokenize(text);
    let matches = query_words.intersection(&text_words).count();
    if matches == 0 {
        return None;
    }

    let union = query_words.len() + text_words.len() - matches;
    Some(matches as f32 / union as f32)
}
