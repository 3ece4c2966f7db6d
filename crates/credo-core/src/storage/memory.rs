//! SQLite memory store

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use lru::LruCache;
use rusqlite::{Connection, OptionalExtension, params};

use crate::config::MemoryConfig;
use crate::error::{EngineError, Result};
use crate::memory::{
    CategoryLabel, MemoryMetadata, MemoryRecord, MemoryStats, MemoryStore, OperationCounts,
};
use crate::providers::{Clock, EmbeddingProvider, IdGenerator};
use crate::search::{DefaultSearchStrategy, SimilarityQuery, SimilaritySearchStrategy};
use crate::storage::backend::{SqliteBackend, embedding_to_bytes};

/// Format a timestamp for storage; fixed-width so SQL string comparison
/// orders chronologically
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC3339 timestamp column
pub(crate) fn parse_ts(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Invalid {} timestamp '{}': {}", field_name, value, e),
                )),
            )
        })
}

/// Convert a row to a MemoryRecord (embedding not loaded)
pub(crate) fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<MemoryRecord> {
    let category_tags: String = row.get("category_tags")?;
    let tags: String = row.get("tags")?;
    let extra: String = row.get("extra")?;

    let created_at: String = row.get("created_at")?;
    let last_accessed: String = row.get("last_accessed")?;

    Ok(MemoryRecord {
        id: row.get("id")?,
        agent_id: row.get("agent_id")?,
        content: row.get("content")?,
        category: CategoryLabel {
            primary: row.get("category_primary")?,
            secondary: row.get("category_secondary")?,
            tags: serde_json::from_str(&category_tags).unwrap_or_default(),
            confidence: row.get("category_confidence")?,
        },
        metadata: MemoryMetadata {
            source: row.get("source")?,
            importance: row.get("importance")?,
            confidence: row.get("confidence")?,
            tags: serde_json::from_str(&tags).unwrap_or_default(),
            access_count: row.get("access_count")?,
            extra: serde_json::from_str(&extra).unwrap_or_default(),
        },
        embedding: None,
        created_at: parse_ts(&created_at, "created_at")?,
        last_accessed: parse_ts(&last_accessed, "last_accessed")?,
        relevance_score: row.get("relevance_score")?,
        version: row.get("version")?,
    })
}

#[derive(Default)]
struct OpCounters {
    stores: AtomicU64,
    reads: AtomicU64,
    updates: AtomicU64,
    removals: AtomicU64,
    searches: AtomicU64,
}

impl OpCounters {
    fn snapshot(&self) -> OperationCounts {
        OperationCounts {
            stores: self.stores.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
        }
    }
}

/// Memory store over the shared SQLite backend
///
/// Similarity queries go through the probing strategy selector; query
/// embeddings are cached in an LRU so repeated queries skip the provider.
pub struct SqliteMemoryStore {
    backend: Arc<SqliteBackend>,
    config: MemoryConfig,
    strategy: RwLock<DefaultSearchStrategy>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    query_cache: Mutex<LruCache<String, Vec<f32>>>,
    counters: OpCounters,
    started_at: Instant,
}

impl SqliteMemoryStore {
    /// Build the store and probe the backend for the best strategy
    pub fn new(
        backend: Arc<SqliteBackend>,
        config: MemoryConfig,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        let mut strategy = DefaultSearchStrategy::new(
            config.strategy,
            config.embedding_dimension,
            embedder.is_some(),
        );
        backend.read(|conn| strategy.initialize(conn))?;

        Ok(Self {
            backend,
            config,
            strategy: RwLock::new(strategy),
            embedder,
            clock,
            ids,
            // SAFETY: 100 is always non-zero, this cannot fail
            query_cache: Mutex::new(LruCache::new(NonZeroUsize::new(100).expect("non-zero"))),
            counters: OpCounters::default(),
            started_at: Instant::now(),
        })
    }

    /// Name of the strategy the selector settled on
    pub fn strategy_name(&self) -> &'static str {
        self.strategy
            .read()
            .map(|s| s.name())
            .unwrap_or("unavailable")
    }

    /// Re-probe the backend, e.g. after a schema change at runtime
    pub fn reinitialize_strategy(&self) -> Result<()> {
        let mut strategy = self
            .strategy
            .write()
            .map_err(|_| EngineError::BackendUnavailable("strategy lock poisoned".into()))?;
        self.backend.read(|conn| strategy.reinitialize(conn))
    }

    fn read_record(conn: &Connection, id: &str) -> Result<Option<MemoryRecord>> {
        let mut stmt = conn.prepare("SELECT * FROM memories WHERE id = ?1")?;
        let record = stmt.query_row(params![id], row_to_record).optional()?;

        let Some(mut record) = record else {
            return Ok(None);
        };
        let blob: Option<Vec<u8>> = conn
            .query_row(
                "SELECT embedding FROM memory_embeddings WHERE memory_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        record.embedding = blob.and_then(|b| super::backend::embedding_from_bytes(&b));
        Ok(Some(record))
    }

    fn validate_new(&self, agent_id: &str, content: &str, metadata: &MemoryMetadata) -> Result<()> {
        if agent_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("agentId must not be blank".into()));
        }
        if content.trim().is_empty() {
            return Err(EngineError::InvalidInput("content must not be blank".into()));
        }
        for (name, value) in [
            ("importance", metadata.importance),
            ("confidence", metadata.confidence),
        ] {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return Err(EngineError::InvalidInput(format!(
                        "{} must be within [0,1]",
                        name
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_dimension(&self, embedding: &Option<Vec<f32>>) -> Result<()> {
        if let Some(vector) = embedding {
            if vector.len() != self.config.embedding_dimension {
                return Err(EngineError::InvalidInput(format!(
                    "embedding dimension {} does not match system dimension {}",
                    vector.len(),
                    self.config.embedding_dimension
                )));
            }
        }
        Ok(())
    }

    fn embed_query(&self, query: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;

        if let Ok(mut cache) = self.query_cache.lock() {
            if let Some(vector) = cache.get(query) {
                return Some(vector.clone());
            }
        }

        match embedder.embed(query) {
            Ok(Some(vector)) => {
                if let Ok(mut cache) = self.query_cache.lock() {
                    cache.put(query.to_string(), vector.clone());
                }
                Some(vector)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("query embedding failed: {}", e);
                None
            }
        }
    }

    fn insert_record(conn: &Connection, record: &MemoryRecord) -> Result<()> {
        conn.execute(
            "INSERT INTO memories (
                id, agent_id, content,
                category_primary, category_secondary, category_tags, category_confidence,
                source, importance, confidence, tags, access_count, extra,
                created_at, last_accessed, relevance_score, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                record.id,
                record.agent_id,
                record.content,
                record.category.primary,
                record.category.secondary,
                serde_json::to_string(&record.category.tags).unwrap_or_else(|_| "[]".into()),
                record.category.confidence,
                record.metadata.source,
                record.metadata.importance,
                record.metadata.confidence,
                serde_json::to_string(&record.metadata.tags).unwrap_or_else(|_| "[]".into()),
                record.metadata.access_count,
                serde_json::to_string(&record.metadata.extra).unwrap_or_else(|_| "{}".into()),
                fmt_ts(record.created_at),
                fmt_ts(record.last_accessed),
                record.relevance_score,
                record.version,
            ],
        )?;

        if let Some(vector) = &record.embedding {
            conn.execute(
                "INSERT OR REPLACE INTO memory_embeddings (memory_id, embedding, dimensions, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id,
                    embedding_to_bytes(vector),
                    vector.len() as i64,
                    fmt_ts(record.created_at),
                ],
            )?;
        }
        Ok(())
    }

    fn query_records(
        &self,
        sql: &str,
        bind: impl FnOnce(&mut rusqlite::Statement<'_>) -> rusqlite::Result<Vec<MemoryRecord>>,
    ) -> Result<Vec<MemoryRecord>> {
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        self.backend.read(|conn| {
            let mut stmt = conn.prepare(sql)?;
            Ok(bind(&mut stmt)?)
        })
    }
}

impl MemoryStore for SqliteMemoryStore {
    fn encode_and_store(
        &self,
        agent_id: &str,
        content: &str,
        category: CategoryLabel,
        metadata: MemoryMetadata,
        embedding: Option<Vec<f32>>,
    ) -> Result<MemoryRecord> {
        self.validate_new(agent_id, content, &metadata)?;
        self.check_dimension(&embedding)?;

        let now = self.clock.now();
        let record = MemoryRecord {
            id: self.ids.generate(),
            agent_id: agent_id.to_string(),
            content: content.to_string(),
            relevance_score: MemoryRecord::initial_relevance(&metadata),
            category,
            metadata,
            embedding,
            created_at: now,
            last_accessed: now,
            version: 1,
        };

        self.backend.write(|conn| {
            // Savepoints nest inside an analyzer unit where BEGIN would not
            let sp = conn.savepoint()?;
            Self::insert_record(&sp, &record)?;
            sp.commit()?;
            Ok(())
        })?;

        self.counters.stores.fetch_add(1, Ordering::Relaxed);
        Ok(record)
    }

    fn get(&self, id: &str) -> Result<Option<MemoryRecord>> {
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        let record = self.backend.read(|conn| Self::read_record(conn, id))?;

        let Some(mut record) = record else {
            return Ok(None);
        };

        // Access side effects: bump last_accessed, access count, relevance
        let now = self.clock.now();
        record.last_accessed = now;
        record.metadata.access_count += 1;
        record.relevance_score = (record.relevance_score + 0.01).min(1.0);
        self.backend.write(|conn| {
            conn.execute(
                "UPDATE memories
                 SET last_accessed = ?1, access_count = access_count + 1,
                     relevance_score = MIN(relevance_score + 0.01, 1.0)
                 WHERE id = ?2",
                params![fmt_ts(now), id],
            )?;
            Ok(())
        })?;

        Ok(Some(record))
    }

    fn get_many(&self, ids: &[String]) -> Result<HashMap<String, MemoryRecord>> {
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        self.backend.read(|conn| {
            let mut found = HashMap::new();
            for id in ids {
                if let Some(record) = Self::read_record(conn, id)? {
                    found.insert(id.clone(), record);
                }
            }
            Ok(found)
        })
    }

    fn update(&self, record: &MemoryRecord) -> Result<MemoryRecord> {
        let existing = self
            .backend
            .read(|conn| Self::read_record(conn, &record.id))?
            .ok_or_else(|| EngineError::NotFound(record.id.clone()))?;

        let content_changed = existing.content != record.content;
        let embedding = match (&record.embedding, content_changed, &self.embedder) {
            (Some(vector), _, _) => Some(vector.clone()),
            // Content changed without a supplied embedding: re-embed
            (None, true, Some(embedder)) => match embedder.embed(&record.content) {
                Ok(vector) => vector,
                Err(e) => {
                    tracing::warn!("re-embedding failed for {}: {}", record.id, e);
                    None
                }
            },
            (None, _, _) => existing.embedding.clone(),
        };
        self.check_dimension(&embedding)?;

        let now = self.clock.now();
        let updated = self.backend.write(|conn| {
            let sp = conn.savepoint()?;
            // Optimistic concurrency: the caller's version must still be
            // current
            let changed = sp.execute(
                "UPDATE memories SET
                    content = ?1,
                    category_primary = ?2, category_secondary = ?3,
                    category_tags = ?4, category_confidence = ?5,
                    source = ?6, importance = ?7, confidence = ?8,
                    tags = ?9, extra = ?10,
                    last_accessed = ?11, relevance_score = ?12,
                    version = version + 1
                 WHERE id = ?13 AND version = ?14",
                params![
                    record.content,
                    record.category.primary,
                    record.category.secondary,
                    serde_json::to_string(&record.category.tags).unwrap_or_else(|_| "[]".into()),
                    record.category.confidence,
                    record.metadata.source,
                    record.metadata.importance,
                    record.metadata.confidence,
                    serde_json::to_string(&record.metadata.tags).unwrap_or_else(|_| "[]".into()),
                    serde_json::to_string(&record.metadata.extra).unwrap_or_else(|_| "{}".into()),
                    fmt_ts(now),
                    record.relevance_score,
                    record.id,
                    record.version,
                ],
            )?;
            if changed == 0 {
                return Err(EngineError::StorageFailure(format!(
                    "concurrent update of {}: version {} is stale",
                    record.id, record.version
                )));
            }

            if let Some(vector) = &embedding {
                sp.execute(
                    "INSERT OR REPLACE INTO memory_embeddings
                        (memory_id, embedding, dimensions, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        record.id,
                        embedding_to_bytes(vector),
                        vector.len() as i64,
                        fmt_ts(now),
                    ],
                )?;
            }
            sp.commit()?;

            let mut updated = record.clone();
            updated.embedding = embedding.clone();
            updated.last_accessed = now;
            updated.version = record.version + 1;
            Ok(updated)
        })?;

        self.counters.updates.fetch_add(1, Ordering::Relaxed);
        Ok(updated)
    }

    fn remove(&self, id: &str) -> Result<bool> {
        let removed = self.backend.write(|conn| {
            let changed = conn.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })?;
        if removed {
            self.counters.removals.fetch_add(1, Ordering::Relaxed);
        }
        Ok(removed)
    }

    fn remove_many(&self, ids: &[String]) -> Result<HashSet<String>> {
        let mut removed = HashSet::new();
        for chunk in ids.chunks(self.config.batch_size.max(1)) {
            // One transaction per chunk; a failure rolls back that chunk only
            let chunk_removed = self.backend.write(|conn| {
                let sp = conn.savepoint()?;
                let mut done = Vec::new();
                for id in chunk {
                    let changed = sp.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
                    if changed > 0 {
                        done.push(id.clone());
                    }
                }
                sp.commit()?;
                Ok(done)
            })?;
            self.counters
                .removals
                .fetch_add(chunk_removed.len() as u64, Ordering::Relaxed);
            removed.extend(chunk_removed);
        }
        Ok(removed)
    }

    fn for_agent(&self, agent_id: &str, limit: usize) -> Result<Vec<MemoryRecord>> {
        let effective = if limit == 0 { -1 } else { limit as i64 };
        self.query_records(
            "SELECT * FROM memories WHERE agent_id = ?1
             ORDER BY created_at DESC LIMIT ?2",
            |stmt| {
                stmt.query_map(params![agent_id, effective], row_to_record)?
                    .collect()
            },
        )
    }

    fn in_category(
        &self,
        category: &str,
        agent_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>> {
        let effective = if limit == 0 { -1 } else { limit as i64 };
        self.query_records(
            "SELECT * FROM memories
             WHERE (category_primary = ?1 OR category_secondary = ?1)
             AND (?2 IS NULL OR agent_id = ?2)
             ORDER BY created_at DESC LIMIT ?3",
            |stmt| {
                stmt.query_map(params![category, agent_id, effective], row_to_record)?
                    .collect()
            },
        )
    }

    fn older_than(
        &self,
        seconds: i64,
        agent_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>> {
        let cutoff = fmt_ts(self.clock.now() - Duration::seconds(seconds));
        let effective = if limit == 0 { -1 } else { limit as i64 };
        self.query_records(
            "SELECT * FROM memories
             WHERE created_at <= ?1
             AND (?2 IS NULL OR agent_id = ?2)
             ORDER BY created_at DESC LIMIT ?3",
            |stmt| {
                stmt.query_map(params![cutoff, agent_id, effective], row_to_record)?
                    .collect()
            },
        )
    }

    fn search_similar(
        &self,
        query: &str,
        agent_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<(MemoryRecord, f32)>> {
        if limit < 0 {
            return Err(EngineError::InvalidInput(
                "search limit must not be negative".into(),
            ));
        }
        self.counters.searches.fetch_add(1, Ordering::Relaxed);
        if limit == 0 {
            return Ok(vec![]);
        }

        let similarity_query = SimilarityQuery {
            agent_id: agent_id.map(str::to_string),
            text: query.to_string(),
            vector: self.embed_query(query),
            limit: limit as usize,
            max_results: self.config.max_similarity_results,
            threshold: self.config.similarity_threshold,
        };

        let strategy = self
            .strategy
            .read()
            .map_err(|_| EngineError::BackendUnavailable("strategy lock poisoned".into()))?;
        self.backend
            .read(|conn| strategy.search(conn, &similarity_query))
    }

    fn stats(&self) -> Result<MemoryStats> {
        self.backend.read(|conn| {
            let total: i64 = conn.query_row("SELECT count(*) FROM memories", [], |r| r.get(0))?;
            let with_embeddings: i64 =
                conn.query_row("SELECT count(*) FROM memory_embeddings", [], |r| r.get(0))?;

            let mut per_agent = HashMap::new();
            let mut stmt = conn.prepare("SELECT agent_id, count(*) FROM memories GROUP BY agent_id")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (agent, count) = row?;
                per_agent.insert(agent, count);
            }

            let mut per_category = HashMap::new();
            let mut stmt =
                conn.prepare("SELECT category_primary, count(*) FROM memories GROUP BY category_primary")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (category, count) = row?;
                per_category.insert(category, count);
            }

            Ok(MemoryStats {
                total,
                per_agent,
                per_category,
                with_embeddings,
                operation_counts: self.counters.snapshot(),
                uptime_seconds: self.started_at.elapsed().as_secs(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{SystemClock, UuidGenerator};
    use tempfile::TempDir;

    fn temp_store() -> (SqliteMemoryStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(SqliteBackend::open(Some(dir.path().join("test.db"))).unwrap());
        let store = SqliteMemoryStore::new(
            backend,
            MemoryConfig::default(),
            None,
            Arc::new(SystemClock),
            Arc::new(UuidGenerator),
        )
        .unwrap();
        (store, dir)
    }

    fn store_one(store: &SqliteMemoryStore, agent: &str, content: &str) -> MemoryRecord {
        store
            .encode_and_store(
                agent,
                content,
                CategoryLabel::general(),
                MemoryMetadata::default(),
                None,
            )
            .unwrap()
    }

    #[test]
    fn test_store_and_get_roundtrip() {
        let (store, _dir) = temp_store();
        let record = store_one(&store, "u1", "I love pizza");

        assert_eq!(record.version, 1);
        let fetched = store.get(&record.id).unwrap().unwrap();
        assert_eq!(fetched.content, "I love pizza");
        assert_eq!(fetched.agent_id, "u1");
        assert_eq!(fetched.metadata.access_count, 1);
    }

    #[test]
    fn test_blank_agent_rejected() {
        let (store, _dir) = temp_store();
        let result = store.encode_and_store(
            "  ",
            "content",
            CategoryLabel::general(),
            MemoryMetadata::default(),
            None,
        );
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_wrong_dimension_rejected() {
        let (store, _dir) = temp_store();
        let result = store.encode_and_store(
            "u1",
            "content",
            CategoryLabel::general(),
            MemoryMetadata::default(),
            Some(vec![1.0, 2.0]),
        );
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (store, _dir) = temp_store();
        let record = store_one(&store, "u1", "short lived");
        assert!(store.remove(&record.id).unwrap());
        assert!(!store.remove(&record.id).unwrap());
    }

    #[test]
    fn test_update_bumps_version_and_stale_version_fails() {
        let (store, _dir) = temp_store();
        let mut record = store_one(&store, "u1", "original");
        record.content = "revised".to_string();

        let updated = store.update(&record).unwrap();
        assert_eq!(updated.version, 2);

        // The caller's copy is now stale
        let stale = store.update(&record);
        assert!(matches!(stale, Err(EngineError::StorageFailure(_))));
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let (store, _dir) = temp_store();
        let mut record = store_one(&store, "u1", "content");
        store.remove(&record.id).unwrap();
        record.content = "revised".to_string();
        assert!(matches!(
            store.update(&record),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn test_for_agent_ordering_and_limit() {
        let (store, _dir) = temp_store();
        for i in 0..5 {
            store_one(&store, "u1", &format!("note {}", i));
        }
        store_one(&store, "u2", "other agent");

        let all = store.for_agent("u1", 0).unwrap();
        assert_eq!(all.len(), 5);
        for pair in all.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }

        let limited = store.for_agent("u1", 2).unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_search_limit_zero_and_negative() {
        let (store, _dir) = temp_store();
        store_one(&store, "u1", "anything at all");

        assert!(store.search_similar("anything", None, 0).unwrap().is_empty());
        assert!(matches!(
            store.search_similar("anything", None, -1),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_search_without_embedder_uses_text_strategy() {
        let (store, _dir) = temp_store();
        assert_eq!(store.strategy_name(), "text");

        store_one(&store, "u1", "machine learning with neural networks");
        store_one(&store, "u1", "relational database systems");

        let results = store
            .search_similar("neural networks", Some("u1"), 5)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].0.content.contains("neural"));
    }

    #[test]
    fn test_remove_many_reports_removed_set() {
        let (store, _dir) = temp_store();
        let a = store_one(&store, "u1", "a");
        let b = store_one(&store, "u1", "b");

        let removed = store
            .remove_many(&[a.id.clone(), "missing".to_string(), b.id.clone()])
            .unwrap();
        assert_eq!(removed.len(), 2);
        assert!(removed.contains(&a.id));
        assert!(!removed.contains("missing"));
    }

    #[test]
    fn test_stats_counts() {
        let (store, _dir) = temp_store();
        store_one(&store, "u1", "one");
        store_one(&store, "u2", "two");

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.per_agent.get("u1"), Some(&1));
        assert!(stats.operation_counts.stores >= 2);
    }
}
