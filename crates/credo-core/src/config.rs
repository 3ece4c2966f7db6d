//! Engine configuration
//!
//! A single `EngineConfig` value is constructed at startup and handed to the
//! components that need it. There is no global mutable state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::belief::ResolutionStrategy;
use crate::error::{EngineError, Result};

/// Which similarity strategy the memory store should run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Probe the backend and pick the most capable strategy
    #[default]
    Auto,
    /// Cosine k-NN over stored embeddings
    Vector,
    /// Full-text keyword search
    Text,
    /// Case-insensitive substring scan
    Fallback,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Auto => write!(f, "auto"),
            StrategyKind::Vector => write!(f, "vector"),
            StrategyKind::Text => write!(f, "text"),
            StrategyKind::Fallback => write!(f, "fallback"),
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(StrategyKind::Auto),
            "vector" => Ok(StrategyKind::Vector),
            "text" => Ok(StrategyKind::Text),
            "fallback" => Ok(StrategyKind::Fallback),
            _ => Err(format!("Unknown strategy: {}", s)),
        }
    }
}

/// Memory store options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryConfig {
    /// Backend similarity strategy
    pub strategy: StrategyKind,
    /// Chunk size for bulk operations
    pub batch_size: usize,
    /// Hard cap on similarity query results
    pub max_similarity_results: usize,
    /// Minimum similarity score retained
    pub similarity_threshold: f32,
    /// System-wide embedding vector dimension
    pub embedding_dimension: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Auto,
            batch_size: 100,
            max_similarity_results: 50,
            similarity_threshold: 0.0,
            embedding_dimension: 256,
        }
    }
}

/// Belief analysis options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BeliefConfig {
    /// Toggles the analyzer phase of ingestion
    pub enable_analysis: bool,
    /// Candidates below this confidence are dropped
    pub min_candidate_confidence: f64,
    /// Similarity at or above which a candidate reinforces an existing belief
    pub reinforce_threshold: f32,
    /// Similarity at or above which a new belief is linked to its peer
    pub related_threshold: f32,
    /// Per-category conflict resolution overrides
    pub resolution_strategy_by_category: HashMap<String, ResolutionStrategy>,
    /// Resolution used when no category override applies
    pub default_resolution: ResolutionStrategy,
}

impl Default for BeliefConfig {
    fn default() -> Self {
        Self {
            enable_analysis: true,
            min_candidate_confidence: 0.3,
            reinforce_threshold: 0.85,
            related_threshold: 0.6,
            resolution_strategy_by_category: HashMap::new(),
            default_resolution: ResolutionStrategy::NewerWins,
        }
    }
}

impl BeliefConfig {
    /// Resolution strategy for a category
    pub fn resolution_for(&self, category: &str) -> ResolutionStrategy {
        self.resolution_strategy_by_category
            .get(category)
            .copied()
            .unwrap_or(self.default_resolution)
    }
}

/// Ingestion pipeline options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngestionConfig {
    /// Maximum accepted content length in characters
    pub max_content_length: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_content_length: 10_000,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Memory store options
    pub memory: MemoryConfig,
    /// Belief analysis options
    pub belief: BeliefConfig,
    /// Ingestion options
    pub ingestion: IngestionConfig,
}

impl EngineConfig {
    /// Reject configurations that would violate operation contracts
    pub fn validate(&self) -> Result<()> {
        if self.memory.batch_size == 0 {
            return Err(EngineError::InvalidInput(
                "memory.batchSize must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.memory.similarity_threshold) {
            return Err(EngineError::InvalidInput(
                "memory.similarityThreshold must be within [0,1]".into(),
            ));
        }
        for (name, value) in [
            (
                "belief.minCandidateConfidence",
                self.belief.min_candidate_confidence,
            ),
            (
                "belief.reinforceThreshold",
                self.belief.reinforce_threshold as f64,
            ),
            (
                "belief.relatedThreshold",
                self.belief.related_threshold as f64,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::InvalidInput(format!(
                    "{} must be within [0,1]",
                    name
                )));
            }
        }
        if self.ingestion.max_content_length == 0 {
            return Err(EngineError::InvalidInput(
                "ingestion.maxContentLength must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
