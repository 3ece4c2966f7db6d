//! Search module
//!
//! Scoring primitives shared by the similarity strategies:
//! - Cosine similarity over embedding vectors
//! - Token extraction with stop-word removal
//! - FTS5 query sanitizing
//! - Lexical overlap scoring in [0,1]

mod strategy;

pub use strategy::{
    BackendCapabilities, DefaultSearchStrategy, FallbackSearchStrategy, SimilarityQuery,
    SimilaritySearchStrategy, TextSearchStrategy, VectorSearchStrategy,
};

use std::collections::BTreeSet;

/// Common English stop words excluded from keyword extraction
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "i",
    "in", "is", "it", "its", "my", "of", "on", "or", "our", "so", "that", "the", "their", "them",
    "then", "there", "these", "they", "this", "to", "was", "were", "will", "with", "you", "your",
];

/// Compute cosine similarity between two vectors
///
/// Null, zero, or dimension-mismatched vectors score 0 rather than error.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a * norm_b).sqrt();
    if denominator > 0.0 {
        dot_product / denominator
    } else {
        0.0
    }
}

/// Lowercased alphanumeric tokens of a text, stop words included
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() {
            for lower in c.to_lowercase() {
                current.push(lower);
            }
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Query keywords: tokens minus stop words (falls back to all tokens when
/// everything was a stop word)
pub fn keyword_terms(query: &str) -> Vec<String> {
    let tokens = tokenize(query);
    let kept: Vec<String> = tokens
        .iter()
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .cloned()
        .collect();
    if kept.is_empty() { tokens } else { kept }
}

/// Build a safe FTS5 MATCH expression: each term quoted, OR-joined
pub fn fts5_match_expression(terms: &[String]) -> String {
    terms
        .iter()
        .map(|t| format!("\"{}\"", t.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Fraction of `terms` present in `content`, in [0,1]; monotone in overlap
pub fn term_overlap_score(terms: &[String], content: &str) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }
    let content_tokens: BTreeSet<String> = tokenize(content).into_iter().collect();
    let hits = terms
        .iter()
        .filter(|t| content_tokens.contains(*t))
        .count() as f32;
    hits / terms.len() as f32
}

/// Fraction of `terms` appearing as case-insensitive substrings of `content`
pub fn substring_overlap_score(terms: &[String], content: &str) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }
    let lowered = content.to_lowercase();
    let hits = terms.iter().filter(|t| lowered.contains(*t)).count() as f32;
    hits / terms.len() as f32
}
