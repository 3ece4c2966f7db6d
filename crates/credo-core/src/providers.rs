//! Injected capabilities
//!
//! The engine never reaches for wall-clock time, id generation, embedding
//! models, or belief extraction directly. Each is a trait implemented by the
//! host; the defaults here cover standalone use.

use chrono::{DateTime, Utc};

use crate::belief::BeliefCandidate;
use crate::error::Result;

// ============================================================================
// CLOCK & IDS
// ============================================================================

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current instant in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of opaque unique identifiers
pub trait IdGenerator: Send + Sync {
    /// Produce a fresh id
    fn generate(&self) -> String;
}

/// UUID v4 identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

// ============================================================================
// EMBEDDINGS
// ============================================================================

/// Produces fixed-dimension vectors for text
///
/// `embed` returning `Ok(None)` means the provider declined (model cold,
/// text unsupported); callers treat that as "no embedding", never as an
/// error.
pub trait EmbeddingProvider: Send + Sync {
    /// Vector dimension this provider emits
    fn dimension(&self) -> usize;

    /// Embed a piece of text
    fn embed(&self, text: &str) -> Result<Option<Vec<f32>>>;
}

// ============================================================================
// BELIEF EXTRACTION
// ============================================================================

/// Distills candidate belief statements from content and scores statement
/// pairs
pub trait BeliefExtractionProvider: Send + Sync {
    /// Extract candidate beliefs from free-form content
    fn extract(
        &self,
        content: &str,
        agent_id: &str,
        category_hint: Option<&str>,
    ) -> Result<Vec<BeliefCandidate>>;

    /// Pairwise statement similarity in [0,1]
    fn similarity(&self, a: &str, b: &str) -> f32;

    /// Whether two statements contradict each other
    fn contradicts(&self, a: &str, b: &str, category_a: Option<&str>, category_b: Option<&str>)
    -> bool;

    /// Best-guess category for a lone statement
    fn extract_category(&self, statement: &str) -> String;

    /// Re-score a statement against the content it came from
    fn rescore(&self, content: &str, statement: &str, context: Option<&str>) -> f64;

    /// Merge two statements into one, if this provider can
    fn merge(&self, _a: &str, _b: &str) -> Option<String> {
        None
    }
}
