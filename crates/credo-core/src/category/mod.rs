//! Deterministic text categorization
//!
//! Maps content onto a fixed category set and extracts tags (emails, URLs,
//! phone numbers, dates, numeric keywords). Confidence reflects the
//! strength of the rule match. The feedback hook records keyword votes that
//! are consulted ahead of the static rules.

use std::collections::HashMap;
use std::sync::RwLock;

use regex::Regex;

use crate::error::Result;
use crate::memory::{CategoryLabel, MemoryMetadata};

/// Classification contract
pub trait Categorizer: Send + Sync {
    /// Classify one piece of content
    fn categorize(&self, text: &str, metadata: Option<&MemoryMetadata>) -> Result<CategoryLabel>;

    /// Classify a batch of texts
    fn categorize_batch(&self, texts: &[String]) -> Result<Vec<CategoryLabel>> {
        texts.iter().map(|t| self.categorize(t, None)).collect()
    }

    /// Ranked alternative labels for ambiguous content
    fn suggest_alternatives(&self, text: &str, k: usize) -> Result<Vec<CategoryLabel>>;

    /// Feedback hook: remember that `text` was confirmed as `label`
    fn learn(&self, text: &str, label: &CategoryLabel);
}

/// The fixed category names, strongest rules first
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "preference",
        &[
            "favorite",
            "favourite",
            "love",
            "like",
            "prefer",
            "enjoy",
            "hate",
            "dislike",
        ],
    ),
    (
        "event",
        &[
            "meeting", "meet", "appointment", "schedule", "yesterday", "tomorrow", "today",
            "happened", "event", "party", "call",
        ],
    ),
    (
        "task",
        &[
            "todo", "task", "need to", "must", "should", "remind", "deadline", "finish",
        ],
    ),
    (
        "contact",
        &[
            "email", "phone", "address", "contact", "reach", "@",
        ],
    ),
    (
        "location",
        &[
            "located", "location", "capital", "city", "country", "street", "place", "where",
        ],
    ),
    (
        "knowledge",
        &[
            "learned", "research", "study", "theory", "algorithm", "definition", "means",
        ],
    ),
    ("fact", &["is", "are", "was", "were", "has", "have"]),
];

struct TagPatterns {
    email: Regex,
    url: Regex,
    phone: Regex,
    date: Regex,
    number: Regex,
}

impl TagPatterns {
    fn new() -> Self {
        Self {
            email: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
                .expect("static pattern"),
            url: Regex::new(r"https?://[^\s]+").expect("static pattern"),
            phone: Regex::new(r"\+?\d[\d\s().-]{7,}\d").expect("static pattern"),
            date: Regex::new(
                r"(?i)\b(\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{2,4}|(january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2})\b",
            )
            .expect("static pattern"),
            number: Regex::new(r"\b\d+(\.\d+)?\b").expect("static pattern"),
        }
    }
}

/// Rule-based categorizer over the fixed category set
pub struct RuleBasedCategorizer {
    patterns: TagPatterns,
    /// keyword -> category votes accumulated through `learn`
    feedback: RwLock<HashMap<String, HashMap<String, u32>>>,
}

impl Default for RuleBasedCategorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleBasedCategorizer {
    /// Build the categorizer with compiled tag patterns
    pub fn new() -> Self {
        Self {
            patterns: TagPatterns::new(),
            feedback: RwLock::new(HashMap::new()),
        }
    }

    /// Score every category for `text`; sorted by descending score
    fn scored_labels(&self, text: &str) -> Vec<(String, f64)> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered.split_whitespace().collect();
        let token_count = tokens.len().max(1) as f64;

        let mut scores: Vec<(String, f64)> = CATEGORIES
            .iter()
            .map(|(name, keywords)| {
                let hits = keywords
                    .iter()
                    .filter(|kw| {
                        if kw.contains(' ') {
                            lowered.contains(*kw)
                        } else {
                            tokens.iter().any(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '@') == **kw)
                        }
                    })
                    .count() as f64;
                // Generic copular keywords score weaker than specific ones
                let weight = if *name == "fact" { 0.35 } else { 1.0 };
                let score = ((hits * weight) / token_count.sqrt()).min(1.0);
                (name.to_string(), score)
            })
            .collect();

        // Learned votes outrank static keyword hits
        if let Ok(feedback) = self.feedback.read() {
            for token in &tokens {
                if let Some(votes) = feedback.get(*token) {
                    for (category, count) in votes {
                        let boost = (*count as f64 * 0.2).min(0.6);
                        if let Some(entry) = scores.iter_mut().find(|(n, _)| n == category) {
                            entry.1 = (entry.1 + boost).min(1.0);
                        }
                    }
                }
            }
        }

        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores
    }

    /// Extract entity tags from the text
    fn extract_tags(&self, text: &str) -> Vec<String> {
        let mut tags = Vec::new();
        if self.patterns.email.is_match(text) {
            tags.push("email".to_string());
        }
        if self.patterns.url.is_match(text) {
            tags.push("url".to_string());
        }
        if self.patterns.phone.is_match(text) && !self.patterns.date.is_match(text) {
            tags.push("phone".to_string());
        }
        if self.patterns.date.is_match(text) {
            tags.push("date".to_string());
        }
        if self.patterns.number.is_match(text) {
            tags.push("numeric".to_string());
        }
        tags
    }
}

impl Categorizer for RuleBasedCategorizer {
    fn categorize(&self, text: &str, metadata: Option<&MemoryMetadata>) -> Result<CategoryLabel> {
        if text.trim().is_empty() {
            return Ok(CategoryLabel::general());
        }

        let scores = self.scored_labels(text);
        let mut tags = self.extract_tags(text);
        if let Some(meta) = metadata {
            for tag in &meta.tags {
                if !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
        }

        let (primary, confidence) = scores
            .first()
            .filter(|(_, score)| *score > 0.0)
            .map(|(name, score)| (name.clone(), *score))
            .unwrap_or_else(|| ("general".to_string(), 0.1));

        let secondary = scores
            .get(1)
            .filter(|(_, score)| *score > 0.0 && primary != "general")
            .map(|(name, _)| name.clone());

        Ok(CategoryLabel {
            primary,
            secondary,
            tags,
            confidence: confidence.clamp(0.0, 1.0),
        })
    }

    fn suggest_alternatives(&self, text: &str, k: usize) -> Result<Vec<CategoryLabel>> {
        let tags = self.extract_tags(text);
        Ok(self
            .scored_labels(text)
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .take(k)
            .map(|(name, score)| CategoryLabel {
                primary: name,
                secondary: None,
                tags: tags.clone(),
                confidence: score.clamp(0.0, 1.0),
            })
            .collect())
    }

    fn learn(&self, text: &str, label: &CategoryLabel) {
        let lowered = text.to_lowercase();
        if let Ok(mut feedback) = self.feedback.write() {
            for token in lowered.split_whitespace().filter(|t| t.len() > 3) {
                let votes = feedback.entry(token.to_string()).or_default();
                *votes.entry(label.primary.clone()).or_insert(0) += 1;
            }
            // Bound the table so feedback cannot grow without limit
            if feedback.len() > 10_000 {
                feedback.clear();
            }
        }
    }
}
