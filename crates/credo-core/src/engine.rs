//! Engine assembly
//!
//! The composition root: one `EngineConfig` value, injected providers, and
//! the wiring between backend, stores, graph, analyzer, and pipeline. No
//! global state; everything hangs off the `Engine` value.

use std::path::PathBuf;
use std::sync::Arc;

use crate::analyzer::BeliefAnalyzer;
use crate::belief::HeuristicExtractor;
use crate::category::{Categorizer, RuleBasedCategorizer};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::graph::RelationshipGraph;
use crate::pipeline::{CancelToken, IngestionInput, IngestionPipeline, IngestionResult};
use crate::providers::{
    BeliefExtractionProvider, Clock, EmbeddingProvider, IdGenerator, SystemClock, UuidGenerator,
};
use crate::storage::{SqliteBackend, SqliteBeliefStore, SqliteMemoryStore};

/// A fully wired ingestion and belief formation engine
pub struct Engine {
    config: EngineConfig,
    memory: Arc<SqliteMemoryStore>,
    beliefs: Arc<SqliteBeliefStore>,
    graph: Arc<RelationshipGraph>,
    pipeline: IngestionPipeline,
}

impl Engine {
    /// Open an engine with default providers at `db_path` (platform data
    /// directory when `None`)
    pub fn new(db_path: Option<PathBuf>, config: EngineConfig) -> Result<Self> {
        let mut builder = Engine::builder().config(config);
        if let Some(path) = db_path {
            builder = builder.db_path(path);
        }
        builder.build()
    }

    /// Start configuring an engine
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Ingest one observation
    pub fn ingest(&self, input: IngestionInput) -> Result<IngestionResult> {
        self.pipeline.ingest(input)
    }

    /// Categorize and preview without persisting
    pub fn dry_run(&self, input: IngestionInput) -> Result<IngestionResult> {
        self.pipeline.dry_run(input)
    }

    /// Ingest with a cooperative cancellation token
    pub fn ingest_with_cancel(
        &self,
        input: IngestionInput,
        cancel: &CancelToken,
    ) -> Result<IngestionResult> {
        self.pipeline.ingest_with_cancel(input, cancel)
    }

    /// The memory store
    pub fn memory(&self) -> &Arc<SqliteMemoryStore> {
        &self.memory
    }

    /// The belief store
    pub fn beliefs(&self) -> &Arc<SqliteBeliefStore> {
        &self.beliefs
    }

    /// The relationship graph
    pub fn graph(&self) -> &Arc<RelationshipGraph> {
        &self.graph
    }

    /// The configuration the engine was built with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Builder for an `Engine` with custom providers
pub struct EngineBuilder {
    db_path: Option<PathBuf>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    extractor: Arc<dyn BeliefExtractionProvider>,
    categorizer: Arc<dyn Categorizer>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            db_path: None,
            config: EngineConfig::default(),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidGenerator),
            embedder: None,
            extractor: Arc::new(HeuristicExtractor::new()),
            categorizer: Arc::new(RuleBasedCategorizer::new()),
        }
    }
}

impl EngineBuilder {
    /// Database file location
    pub fn db_path(mut self, path: PathBuf) -> Self {
        self.db_path = Some(path);
        self
    }

    /// Engine configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Time source
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Id source
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Embedding provider; without one the lexical strategies carry search
    pub fn embedding_provider(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Belief extraction provider
    pub fn extraction_provider(mut self, extractor: Arc<dyn BeliefExtractionProvider>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Categorizer implementation
    pub fn categorizer(mut self, categorizer: Arc<dyn Categorizer>) -> Self {
        self.categorizer = categorizer;
        self
    }

    /// Wire everything together
    pub fn build(self) -> Result<Engine> {
        self.config.validate()?;

        let backend = Arc::new(SqliteBackend::open(self.db_path)?);
        let memory = Arc::new(SqliteMemoryStore::new(
            backend.clone(),
            self.config.memory.clone(),
            self.embedder.clone(),
            self.clock.clone(),
            self.ids.clone(),
        )?);
        let beliefs = Arc::new(SqliteBeliefStore::new(backend.clone(), self.clock.clone()));
        let graph = Arc::new(RelationshipGraph::new(
            backend.clone(),
            beliefs.clone(),
            self.clock.clone(),
            self.ids.clone(),
        ));
        let analyzer = Arc::new(BeliefAnalyzer::new(
            backend,
            self.extractor,
            beliefs.clone(),
            graph.clone(),
            self.config.belief.clone(),
            self.clock,
            self.ids,
        ));
        let pipeline = IngestionPipeline::new(
            self.categorizer,
            self.embedder,
            memory.clone(),
            Some(analyzer),
            self.config.ingestion.clone(),
            self.config.belief.clone(),
        );

        Ok(Engine {
            config: self.config,
            memory,
            beliefs,
            graph,
            pipeline,
        })
    }
}
