//! # Credo Core
//!
//! Cognitive ingestion and belief formation engine for autonomous agents:
//!
//! - **Ingestion pipeline**: validate -> categorize -> embed -> store ->
//!   analyze, with dry-run and cooperative cancellation
//! - **Memory store**: per-agent durable records over SQLite with hybrid
//!   similarity retrieval
//! - **Similarity strategies**: a probing selector that delegates to
//!   vector (cosine over embeddings), text (FTS5), or lexical fallback
//! - **Belief analyzer**: distills statements from content, reinforces
//!   duplicates, detects contradictions, and resolves them by strategy
//! - **Relationship graph**: typed, weighted, temporally-bounded edges
//!   between beliefs with traversal, snapshot, export, and validation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use credo_core::{BeliefStore, Engine, EngineConfig, IngestionInput, MemoryStore};
//!
//! # fn main() -> credo_core::Result<()> {
//! let engine = Engine::new(None, EngineConfig::default())?;
//!
//! let result = engine.ingest(IngestionInput::new("agent-1", "I love pizza"))?;
//! assert!(result.encoded_successfully);
//!
//! let memories = engine.memory().for_agent("agent-1", 10)?;
//! let beliefs = engine.beliefs().for_agent("agent-1", false)?;
//! println!("{} memories, {} beliefs", memories.len(), beliefs.len());
//! # Ok(())
//! # }
//! ```
//!
//! External capabilities (embedding models, LLM-backed belief extraction,
//! clock, id generation) are injected through the traits in [`providers`];
//! the built-in [`belief::HeuristicExtractor`] and
//! [`category::RuleBasedCategorizer`] cover standalone use.

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod analyzer;
pub mod belief;
pub mod category;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod memory;
pub mod pipeline;
pub mod providers;
pub mod search;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Errors
pub use error::{EngineError, ErrorKind, ErrorReport, Result};

// Configuration
pub use config::{BeliefConfig, EngineConfig, IngestionConfig, MemoryConfig, StrategyKind};

// Providers
pub use providers::{
    BeliefExtractionProvider, Clock, EmbeddingProvider, IdGenerator, SystemClock, UuidGenerator,
};

// Memory types and store contract
pub use memory::{
    CategoryLabel, MemoryMetadata, MemoryRecord, MemoryStats, MemoryStore, OperationCounts,
};

// Categorization
pub use category::{Categorizer, RuleBasedCategorizer};

// Search strategies
pub use search::{
    BackendCapabilities, DefaultSearchStrategy, FallbackSearchStrategy, SimilarityQuery,
    SimilaritySearchStrategy, TextSearchStrategy, VectorSearchStrategy, cosine_similarity,
};

// Beliefs
pub use belief::{
    Belief, BeliefCandidate, BeliefConflict, BeliefStore, ConflictSeverity, ConflictType,
    HeuristicExtractor, ResolutionStrategy, normalize_statement, statement_similarity,
};

// Analyzer
pub use analyzer::{BeliefAnalyzer, BeliefUpdateResult};

// Graph
pub use graph::{
    BeliefKnowledgeGraph, BeliefRelationship, EdgeState, ExportFormat, GraphValidationIssue,
    NewEdgeOptions, RelationshipGraph, RelationshipType, RelationshipUpdate,
};

// Pipeline
pub use pipeline::{
    CancelToken, IngestionInput, IngestionPipeline, IngestionResult, IngestionStatus,
};

// Storage
pub use storage::{SqliteBackend, SqliteBeliefStore, SqliteMemoryStore};

// Engine assembly
pub use engine::{Engine, EngineBuilder};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Belief, BeliefStore, BeliefUpdateResult, CancelToken, CategoryLabel, Engine,
        EngineConfig, EngineError, IngestionInput, IngestionResult, IngestionStatus,
        MemoryMetadata, MemoryRecord, MemoryStore, RelationshipGraph, RelationshipType, Result,
    };
}
