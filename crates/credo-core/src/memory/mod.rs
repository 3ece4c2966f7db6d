//! Memory module - record types and the store contract

mod record;

pub use record::{CategoryLabel, MemoryMetadata, MemoryRecord};

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Read-only statistics for a memory store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    /// Total persisted records
    pub total: i64,
    /// Record counts per agent
    pub per_agent: HashMap<String, i64>,
    /// Record counts per primary category
    pub per_category: HashMap<String, i64>,
    /// Records that carry an embedding
    pub with_embeddings: i64,
    /// Operation counters since the store was opened
    pub operation_counts: OperationCounts,
    /// Seconds since the store was opened
    pub uptime_seconds: u64,
}

/// Counter snapshot; counters use atomic increments and may lag slightly
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationCounts {
    pub stores: u64,
    pub reads: u64,
    pub updates: u64,
    pub removals: u64,
    pub searches: u64,
}

/// Backend-agnostic memory store contract
///
/// Implementations are `Send + Sync`; all methods take `&self` so a store can
/// be shared behind `Arc` across ingestion and read paths.
pub trait MemoryStore: Send + Sync {
    /// Persist a new record. Assigns id, timestamps, initial relevance, and
    /// `version = 1`. The write is atomic; on success the record is visible
    /// to subsequent reads within the same agent.
    fn encode_and_store(
        &self,
        agent_id: &str,
        content: &str,
        category: CategoryLabel,
        metadata: MemoryMetadata,
        embedding: Option<Vec<f32>>,
    ) -> Result<MemoryRecord>;

    /// Fetch one record; bumps `last_accessed` and the access count.
    fn get(&self, id: &str) -> Result<Option<MemoryRecord>>;

    /// Fetch many records; missing ids are simply absent from the map.
    fn get_many(&self, ids: &[String]) -> Result<HashMap<String, MemoryRecord>>;

    /// Replace an existing record. Bumps `version` via compare-and-swap; a
    /// concurrent writer surfaces as `StorageFailure`. Re-embeds when the
    /// content changed and no embedding was supplied.
    fn update(&self, record: &MemoryRecord) -> Result<MemoryRecord>;

    /// Delete one record. Idempotent; `false` when the id was absent.
    fn remove(&self, id: &str) -> Result<bool>;

    /// Delete many records in `batch_size` chunks; a failing chunk rolls
    /// back that chunk only. Returns the ids actually removed.
    fn remove_many(&self, ids: &[String]) -> Result<HashSet<String>>;

    /// All records for an agent, newest first. `limit = 0` means unbounded.
    fn for_agent(&self, agent_id: &str, limit: usize) -> Result<Vec<MemoryRecord>>;

    /// Records whose primary or secondary category matches.
    fn in_category(
        &self,
        category: &str,
        agent_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>>;

    /// Records at least `seconds` old.
    fn older_than(
        &self,
        seconds: i64,
        agent_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>>;

    /// Similarity search via the active strategy. Results are ordered by
    /// descending score; scores below the configured threshold are dropped.
    /// `limit = 0` returns an empty list; negative limits are rejected.
    fn search_similar(
        &self,
        query: &str,
        agent_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<(MemoryRecord, f32)>>;

    /// Read-only statistics.
    fn stats(&self) -> Result<MemoryStats>;
}
