//! Ingestion pipeline
//!
//! Fixed orchestration for one observation:
//! validate -> categorize -> embed -> store -> analyze.
//!
//! Failure ladder:
//! - validation failures are terminal and have no side effects
//! - categorization failures degrade to the `general` label
//! - embedding failures mean "no embedding", never fatal
//! - storage failures are fatal and the analyzer is never invoked
//! - analyzer failures leave the stored memory in place and surface as
//!   partial success

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzer::{BeliefAnalyzer, BeliefUpdateResult};
use crate::category::Categorizer;
use crate::config::{BeliefConfig, IngestionConfig};
use crate::error::{EngineError, Result};
use crate::memory::{CategoryLabel, MemoryMetadata, MemoryStore};
use crate::providers::EmbeddingProvider;

/// One observation to ingest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IngestionInput {
    /// Owner partition
    pub agent_id: String,
    /// Free-form textual observation
    pub content: String,
    /// Where the observation came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// When the observation was made, if not "now"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Caller-supplied metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MemoryMetadata>,
    /// Categorize and preview without persisting
    #[serde(default)]
    pub dry_run: bool,
}

impl IngestionInput {
    /// Minimal input for an agent and content
    pub fn new(agent_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            content: content.into(),
            source: None,
            timestamp: None,
            metadata: None,
            dry_run: false,
        }
    }
}

/// Terminal pipeline status for a non-failed ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IngestionStatus {
    /// Every stage ran clean
    Success,
    /// A non-fatal stage degraded; see the notes
    PartialSuccess,
}

/// Outcome of one ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResult {
    /// Stored memory id; absent on dry runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_id: Option<String>,
    /// Owner partition
    pub agent_id: String,
    /// Category assigned to the content
    pub category: CategoryLabel,
    /// Whether a memory record was persisted
    pub encoded_successfully: bool,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Belief impact; on dry runs the ids are previews
    #[serde(skip_serializing_if = "Option::is_none")]
    pub belief_update: Option<BeliefUpdateResult>,
    /// Wall-clock processing time
    pub processing_time_ms: u64,
    /// Terminal status
    pub status: IngestionStatus,
    /// Degradations encountered along the way
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Cooperative cancellation signal checked between pipeline stages
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that never fires unless cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Orchestrates one ingestion end to end
pub struct IngestionPipeline {
    categorizer: Arc<dyn Categorizer>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    memory: Arc<dyn MemoryStore>,
    analyzer: Option<Arc<BeliefAnalyzer>>,
    config: IngestionConfig,
    belief_config: BeliefConfig,
}

impl IngestionPipeline {
    /// Build the pipeline. Passing no analyzer (or disabling analysis in
    /// the config) skips the belief phase entirely.
    pub fn new(
        categorizer: Arc<dyn Categorizer>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        memory: Arc<dyn MemoryStore>,
        analyzer: Option<Arc<BeliefAnalyzer>>,
        config: IngestionConfig,
        belief_config: BeliefConfig,
    ) -> Self {
        Self {
            categorizer,
            embedder,
            memory,
            analyzer,
            config,
            belief_config,
        }
    }

    /// Ingest one observation
    pub fn ingest(&self, input: IngestionInput) -> Result<IngestionResult> {
        self.ingest_with_cancel(input, &CancelToken::new())
    }

    /// Equivalent to `ingest` with `dry_run` forced on: categorize and
    /// preview belief impact without persisting anything
    pub fn dry_run(&self, mut input: IngestionInput) -> Result<IngestionResult> {
        input.dry_run = true;
        self.ingest_with_cancel(input, &CancelToken::new())
    }

    /// Ingest with a cooperative cancellation token. Cancellation before
    /// storage leaves no side effects; cancellation after storage keeps the
    /// memory and skips analysis.
    pub fn ingest_with_cancel(
        &self,
        input: IngestionInput,
        cancel: &CancelToken,
    ) -> Result<IngestionResult> {
        let started = Instant::now();
        self.validate(&input)?;

        let mut notes: Vec<String> = Vec::new();
        let mut degraded = false;

        // Stage 1: categorize; failures degrade to the default label
        let metadata = self.build_metadata(&input);
        let category = match self.categorizer.categorize(&input.content, Some(&metadata)) {
            Ok(label) => label,
            Err(e) => {
                tracing::warn!("categorization failed: {}", e);
                notes.push(format!("categorization failed: {}", e));
                degraded = true;
                CategoryLabel::general()
            }
        };

        if cancel.is_cancelled() {
            notes.push("cancelled before storage".to_string());
            return Ok(self.finish(
                &input, None, category, None, notes, true, started,
            ));
        }

        // Stage 2: embed; a missing embedding is never fatal
        let embedding = match &self.embedder {
            Some(embedder) => match embedder.embed(&input.content) {
                Ok(vector) => vector,
                Err(e) => {
                    tracing::warn!("embedding failed: {}", e);
                    notes.push(format!("embedding failed: {}", e));
                    degraded = true;
                    None
                }
            },
            None => None,
        };

        if input.dry_run {
            // Best-effort belief preview without persistence
            let belief_update = match self.preview_beliefs(&input, &category) {
                Ok(update) => update,
                Err(e) => {
                    notes.push(format!("belief preview failed: {}", e));
                    degraded = true;
                    None
                }
            };
            return Ok(self.finish(
                &input,
                None,
                category,
                belief_update,
                notes,
                degraded,
                started,
            ));
        }

        if cancel.is_cancelled() {
            notes.push("cancelled before storage".to_string());
            return Ok(self.finish(&input, None, category, None, notes, true, started));
        }

        // Stage 3: store; failures are fatal and the analyzer never runs
        let record = self.memory.encode_and_store(
            &input.agent_id,
            &input.content,
            category.clone(),
            metadata,
            embedding,
        )?;

        // Stage 4: analyze; failures keep the stored memory
        let mut belief_update = None;
        if cancel.is_cancelled() {
            notes.push("cancelled after storage; belief analysis skipped".to_string());
            degraded = true;
        } else if self.belief_config.enable_analysis {
            if let Some(analyzer) = &self.analyzer {
                match analyzer.analyze(&record) {
                    Ok(update) => belief_update = Some(update),
                    Err(e) => {
                        tracing::warn!("belief analysis failed for {}: {}", record.id, e);
                        notes.push(format!("belief analysis failed: {}", e));
                        degraded = true;
                    }
                }
            }
        }

        Ok(self.finish(
            &input,
            Some(record.id),
            category,
            belief_update,
            notes,
            degraded,
            started,
        ))
    }

    fn validate(&self, input: &IngestionInput) -> Result<()> {
        if input.agent_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("agentId must not be blank".into()));
        }
        if input.content.trim().is_empty() {
            return Err(EngineError::InvalidInput("content must not be blank".into()));
        }
        let length = input.content.chars().count();
        if length > self.config.max_content_length {
            return Err(EngineError::InvalidInput(format!(
                "content length {} exceeds maximum {}",
                length, self.config.max_content_length
            )));
        }
        Ok(())
    }

    fn build_metadata(&self, input: &IngestionInput) -> MemoryMetadata {
        let mut metadata = input.metadata.clone().unwrap_or_default();
        if metadata.source.is_none() {
            metadata.source = input.source.clone();
        }
        if let Some(ts) = input.timestamp {
            metadata.extra.insert(
                "observedAt".to_string(),
                ts.to_rfc3339_opts(SecondsFormat::Micros, true),
            );
        }
        metadata
    }

    fn preview_beliefs(
        &self,
        input: &IngestionInput,
        category: &CategoryLabel,
    ) -> Result<Option<BeliefUpdateResult>> {
        if !self.belief_config.enable_analysis {
            return Ok(None);
        }
        let Some(analyzer) = &self.analyzer else {
            return Ok(None);
        };
        analyzer
            .preview(&input.agent_id, &input.content, Some(&category.primary))
            .map(Some)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        input: &IngestionInput,
        memory_id: Option<String>,
        category: CategoryLabel,
        belief_update: Option<BeliefUpdateResult>,
        notes: Vec<String>,
        degraded: bool,
        started: Instant,
    ) -> IngestionResult {
        IngestionResult {
            encoded_successfully: memory_id.is_some(),
            memory_id,
            agent_id: input.agent_id.clone(),
            category,
            dry_run: input.dry_run,
            belief_update,
            processing_time_ms: started.elapsed().as_millis() as u64,
            status: if degraded {
                IngestionStatus::PartialSuccess
            } else {
                IngestionStatus::Success
            },
            notes,
        }
    }
}
