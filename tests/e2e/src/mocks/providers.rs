//! Mock providers
//!
//! The embedding mock hashes tokens into a fixed-dimension bag-of-words
//! vector, so cosine similarity tracks lexical overlap deterministically -
//! no model downloads, no nondeterminism, and vector-strategy tests agree
//! with their lexical counterparts.

use credo_core::{BeliefCandidate, BeliefExtractionProvider, EmbeddingProvider, EngineError};

/// Deterministic bag-of-words embedding
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    /// Build for the system-wide dimension
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn fnv1a(token: &str) -> u64 {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in token.as_bytes() {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }
}

impl EmbeddingProvider for MockEmbeddingProvider {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> credo_core::Result<Option<Vec<f32>>> {
        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();
        if tokens.is_empty() {
            return Ok(None);
        }

        let mut vector = vec![0.0_f32; self.dimension];
        for token in &tokens {
            let slot = (Self::fnv1a(token) % self.dimension as u64) as usize;
            vector[slot] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        Ok(Some(vector))
    }
}

/// Extraction provider that always fails, for degraded-path tests
pub struct FailingExtractor;

impl BeliefExtractionProvider for FailingExtractor {
    fn extract(
        &self,
        _content: &str,
        _agent_id: &str,
        _category_hint: Option<&str>,
    ) -> credo_core::Result<Vec<BeliefCandidate>> {
        Err(EngineError::BackendUnavailable(
            "extraction provider offline".into(),
        ))
    }

    fn similarity(&self, _a: &str, _b: &str) -> f32 {
        0.0
    }

    fn contradicts(
        &self,
        _a: &str,
        _b: &str,
        _category_a: Option<&str>,
        _category_b: Option<&str>,
    ) -> bool {
        false
    }

    fn extract_category(&self, _statement: &str) -> String {
        "general".to_string()
    }

    fn rescore(&self, _content: &str, _statement: &str, _context: Option<&str>) -> f64 {
        0.0
    }
}
