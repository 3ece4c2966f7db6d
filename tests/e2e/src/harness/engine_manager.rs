//! Isolated engine instances for testing
//!
//! Each `TestEngine` owns a temporary directory holding its database; the
//! directory (and database) disappear when the value is dropped, so tests
//! cannot interfere with each other.

use std::sync::Arc;

use credo_core::{Engine, EngineConfig, StrategyKind};
use tempfile::TempDir;

use crate::mocks::MockEmbeddingProvider;

/// An engine over a throwaway database
pub struct TestEngine {
    /// The engine under test
    pub engine: Engine,
    /// Temporary directory, kept alive to prevent premature deletion
    _temp_dir: TempDir,
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEngine {
    /// Engine with the mock embedding provider attached (vector strategy
    /// under `auto`)
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default(), true)
    }

    /// Engine without an embedding provider (text strategy under `auto`)
    pub fn lexical() -> Self {
        Self::with_config(EngineConfig::default(), false)
    }

    /// Engine forced onto one similarity strategy
    pub fn with_strategy(strategy: StrategyKind, with_embedder: bool) -> Self {
        let mut config = EngineConfig::default();
        config.memory.strategy = strategy;
        Self::with_config(config, with_embedder)
    }

    /// Engine with a custom configuration
    pub fn with_config(config: EngineConfig, with_embedder: bool) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let dimension = config.memory.embedding_dimension;

        let mut builder = Engine::builder()
            .db_path(temp_dir.path().join("credo-test.db"))
            .config(config);
        if with_embedder {
            builder = builder.embedding_provider(Arc::new(MockEmbeddingProvider::new(dimension)));
        }

        Self {
            engine: builder.build().expect("failed to build test engine"),
            _temp_dir: temp_dir,
        }
    }
}
