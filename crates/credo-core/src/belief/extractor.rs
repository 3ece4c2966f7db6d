//! Heuristic belief extraction
//!
//! Pattern-based implementation of the extraction provider contract. It
//! canonicalizes preference phrasings onto `prefers ...` / `dislikes ...`
//! statements and copular sentences onto `<subject> is <object>` facts, so
//! that restatements of the same belief normalize to the same form and
//! reinforce each other. Similarity is Jaccard token overlap; contradiction
//! covers same-subject copular clashes, preference opposition, and negation.

use std::collections::BTreeSet;

use regex::Regex;

use crate::belief::{BeliefCandidate, normalize_statement, statement_similarity};
use crate::error::Result;
use crate::providers::BeliefExtractionProvider;

/// Rule-based extractor usable without an LLM-backed provider
pub struct HeuristicExtractor {
    favorite: Regex,
    likes: Regex,
    dislikes: Regex,
    copular: Regex,
}

impl Default for HeuristicExtractor {
    fn default() -> Self {
        Self::new()
    }
}

const INTENSIFIERS: &str = "(?:really |truly |just |absolutely |also |still )*";

impl HeuristicExtractor {
    /// Build the extractor; patterns are static and known-good
    pub fn new() -> Self {
        Self {
            favorite: Regex::new(r"^(?:my|our) favou?rite ([a-z0-9 ]+?) is ([a-z0-9 ]+)$")
                .expect("static pattern"),
            likes: Regex::new(&format!(
                r"^i {INTENSIFIERS}(?:love|like|prefer|enjoy|adore) (.+)$"
            ))
            .expect("static pattern"),
            dislikes: Regex::new(&format!(
                r"^i {INTENSIFIERS}(?:hate|dislike|despise|detest) (.+)$"
            ))
            .expect("static pattern"),
            copular: Regex::new(r"^(.+?) (?:is|are|was|were) (.+)$").expect("static pattern"),
        }
    }

    fn strip_article(phrase: &str) -> &str {
        for prefix in ["the ", "a ", "an "] {
            if let Some(rest) = phrase.strip_prefix(prefix) {
                return rest;
            }
        }
        phrase
    }

    fn candidate_from_sentence(&self, sentence: &str) -> Option<BeliefCandidate> {
        let normalized = normalize_statement(sentence);
        if normalized.is_empty() {
            return None;
        }

        if let Some(caps) = self.favorite.captures(&normalized) {
            let subject = caps.get(1)?.as_str().trim();
            let object = caps.get(2)?.as_str().trim();
            return Some(BeliefCandidate {
                statement: format!("prefers {} {}", subject, object),
                category: "preference".to_string(),
                tags: vec![],
                confidence: 0.9,
                evidence_span: Some(sentence.trim().to_string()),
            });
        }

        if let Some(caps) = self.likes.captures(&normalized) {
            let object = Self::strip_article(caps.get(1)?.as_str().trim());
            return Some(BeliefCandidate {
                statement: format!("prefers {}", object),
                category: "preference".to_string(),
                tags: vec![],
                confidence: 0.8,
                evidence_span: Some(sentence.trim().to_string()),
            });
        }

        if let Some(caps) = self.dislikes.captures(&normalized) {
            let object = Self::strip_article(caps.get(1)?.as_str().trim());
            return Some(BeliefCandidate {
                statement: format!("dislikes {}", object),
                category: "preference".to_string(),
                tags: vec![],
                confidence: 0.8,
                evidence_span: Some(sentence.trim().to_string()),
            });
        }

        if let Some(caps) = self.copular.captures(&normalized) {
            let subject = Self::strip_article(caps.get(1)?.as_str().trim());
            let object = caps.get(2)?.as_str().trim();
            // First-person copulars read poorly as standing facts
            if subject != "i" && !subject.starts_with("i ") {
                return Some(BeliefCandidate {
                    statement: format!("{} is {}", subject, object),
                    category: "fact".to_string(),
                    tags: vec![],
                    confidence: 0.7,
                    evidence_span: Some(sentence.trim().to_string()),
                });
            }
        }

        if normalized.split(' ').count() >= 4 {
            return Some(BeliefCandidate {
                statement: normalized.clone(),
                category: self.extract_category(&normalized),
                tags: vec![],
                confidence: 0.4,
                evidence_span: Some(sentence.trim().to_string()),
            });
        }

        None
    }

    fn copular_parts<'a>(&self, normalized: &'a str) -> Option<(&'a str, &'a str)> {
        let caps = self.copular.captures(normalized)?;
        Some((
            caps.get(1).map(|m| m.as_str().trim())?,
            caps.get(2).map(|m| m.as_str().trim())?,
        ))
    }

    fn without_negation(statement: &str) -> (String, bool) {
        let mut negated = false;
        let kept: Vec<&str> = statement
            .split(' ')
            .filter(|token| {
                if matches!(*token, "not" | "never" | "no" | "dont" | "doesnt" | "isnt") {
                    negated = true;
                    false
                } else {
                    true
                }
            })
            .collect();
        (kept.join(" "), negated)
    }
}

impl BeliefExtractionProvider for HeuristicExtractor {
    fn extract(
        &self,
        content: &str,
        _agent_id: &str,
        category_hint: Option<&str>,
    ) -> Result<Vec<BeliefCandidate>> {
        let mut candidates = Vec::new();
        let mut seen = BTreeSet::new();
        for sentence in content.split(['.', '!', '?', ';', '\n']) {
            if let Some(mut candidate) = self.candidate_from_sentence(sentence) {
                if candidate.confidence < 0.5 {
                    if let Some(hint) = category_hint {
                        // Low-confidence fallbacks inherit the ingestion category
                        candidate.category = hint.to_string();
                    }
                }
                if seen.insert(candidate.statement.clone()) {
                    candidates.push(candidate);
                }
            }
        }
        Ok(candidates)
    }

    fn similarity(&self, a: &str, b: &str) -> f32 {
        statement_similarity(a, b)
    }

    fn contradicts(
        &self,
        a: &str,
        b: &str,
        _category_a: Option<&str>,
        _category_b: Option<&str>,
    ) -> bool {
        let na = normalize_statement(a);
        let nb = normalize_statement(b);
        if na.is_empty() || nb.is_empty() || na == nb {
            return false;
        }

        // Preference opposition: "prefers x" vs "dislikes x"
        if let (Some(pa), Some(pb)) = (na.strip_prefix("prefers "), nb.strip_prefix("dislikes ")) {
            if pa == pb {
                return true;
            }
        }
        if let (Some(pa), Some(pb)) = (na.strip_prefix("dislikes "), nb.strip_prefix("prefers ")) {
            if pa == pb {
                return true;
            }
        }

        // Same-subject copular clash: "capital of x is foo" vs "... is bar"
        if let (Some((sa, oa)), Some((sb, ob))) = (self.copular_parts(&na), self.copular_parts(&nb))
        {
            if sa == sb && oa != ob {
                let (oa_stripped, oa_neg) = Self::without_negation(oa);
                let (ob_stripped, ob_neg) = Self::without_negation(ob);
                // "x is foo" vs "x is not foo" is negation; "foo" vs "bar" a clash
                if oa_stripped == ob_stripped {
                    return oa_neg != ob_neg;
                }
                return true;
            }
        }

        // Whole-statement negation
        let (stripped_a, neg_a) = Self::without_negation(&na);
        let (stripped_b, neg_b) = Self::without_negation(&nb);
        stripped_a == stripped_b && neg_a != neg_b
    }

    fn extract_category(&self, statement: &str) -> String {
        let normalized = normalize_statement(statement);
        if normalized.starts_with("prefers ") || normalized.starts_with("dislikes ") {
            "preference".to_string()
        } else if normalized.contains(" is ") || normalized.contains(" are ") {
            "fact".to_string()
        } else {
            "general".to_string()
        }
    }

    fn rescore(&self, content: &str, statement: &str, _context: Option<&str>) -> f64 {
        let content_tokens: BTreeSet<String> = normalize_statement(content)
            .split(' ')
            .map(str::to_string)
            .collect();
        let statement_tokens: Vec<String> = normalize_statement(statement)
            .split(' ')
            .map(str::to_string)
            .collect();
        if statement_tokens.is_empty() {
            return 0.0;
        }
        let supported = statement_tokens
            .iter()
            .filter(|t| content_tokens.contains(*t))
            .count() as f64;
        (supported / statement_tokens.len() as f64).clamp(0.0, 1.0)
    }

    fn merge(&self, a: &str, b: &str) -> Option<String> {
        let na = normalize_statement(a);
        let nb = normalize_statement(b);
        if na.is_empty() {
            return Some(nb);
        }
        if nb.is_empty() {
            return Some(na);
        }
        // Keep the richer statement
        if nb.split(' ').count() > na.split(' ').count() {
            Some(nb)
        } else {
            Some(na)
        }
    }
}
