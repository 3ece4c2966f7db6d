//! Similarity-search strategies
//!
//! One interface, three concrete strategies, and a probing selector:
//!
//! | Backend probe result                  | Strategy  |
//! |---------------------------------------|-----------|
//! | Embedding provider + dimension set    | vector    |
//! | FTS5 table usable, no vector support  | text      |
//! | Neither                               | fallback  |
//!
//! The selector (`DefaultSearchStrategy`) encapsulates the probe and
//! forwards every call to whichever strategy it chose. A strategy that
//! advertises vector support still degrades to its own lexical path within
//! a single call when the query vector is absent - never across strategies.

use rusqlite::Connection;

use crate::config::StrategyKind;
use crate::error::{EngineError, Result};
use crate::memory::MemoryRecord;
use crate::search::{
    cosine_similarity, fts5_match_expression, keyword_terms, substring_overlap_score,
    term_overlap_score,
};
use crate::storage::{embedding_from_bytes, row_to_record};

/// How many candidate rows a scan considers before scoring
const SCAN_WINDOW: usize = 1000;

/// One similarity request
#[derive(Debug, Clone)]
pub struct SimilarityQuery {
    /// Restrict results to one agent
    pub agent_id: Option<String>,
    /// Free-text query
    pub text: String,
    /// Optional query embedding
    pub vector: Option<Vec<f32>>,
    /// Per-query result cap
    pub limit: usize,
    /// Strategy-level result cap; the tighter of the two wins
    pub max_results: usize,
    /// Minimum similarity retained
    pub threshold: f32,
}

impl SimilarityQuery {
    /// The tighter of the per-query and strategy-level caps
    pub fn effective_limit(&self) -> usize {
        self.limit.min(self.max_results)
    }
}

/// Capability-described similarity delegate
pub trait SimilaritySearchStrategy: Send + Sync {
    /// Strategy name for logs and stats
    fn name(&self) -> &'static str;

    /// Whether this strategy can rank by query vector
    fn supports_vector_search(&self) -> bool;

    /// Capability probe against the backend
    fn initialize(&mut self, conn: &Connection) -> Result<()>;

    /// Verify the schema objects this strategy needs exist
    fn validate_schema(&self, conn: &Connection) -> Result<()>;

    /// Run the search; results ordered by descending similarity
    fn search(
        &self,
        conn: &Connection,
        query: &SimilarityQuery,
    ) -> Result<Vec<(MemoryRecord, f32)>>;
}

/// What the backend probe found
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendCapabilities {
    /// FTS5 virtual table is present and queryable
    pub fts5: bool,
    /// Query vectors can be produced and compared
    pub vector: bool,
}

impl BackendCapabilities {
    /// Probe the connection
    pub fn probe(conn: &Connection, has_embedder: bool, dimension: usize) -> Self {
        let fts5 = conn
            .prepare("SELECT count(*) FROM memories_fts")
            .and_then(|mut stmt| stmt.query_row([], |row| row.get::<_, i64>(0)))
            .is_ok();
        Self {
            fts5,
            vector: has_embedder && dimension > 0,
        }
    }
}

// ============================================================================
// SHARED SCANS
// ============================================================================

fn sort_and_cap(
    mut scored: Vec<(MemoryRecord, f32)>,
    query: &SimilarityQuery,
) -> Vec<(MemoryRecord, f32)> {
    scored.retain(|(_, score)| *score > 0.0 && *score >= query.threshold);
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.0.created_at.cmp(&a.0.created_at))
    });
    scored.truncate(query.effective_limit());
    scored
}

/// Case-insensitive substring scan with recency tiebreak
fn lexical_scan(conn: &Connection, query: &SimilarityQuery) -> Result<Vec<(MemoryRecord, f32)>> {
    let terms = keyword_terms(&query.text);
    if terms.is_empty() {
        return Ok(vec![]);
    }

    let mut stmt = conn.prepare(
        "SELECT * FROM memories
         WHERE ?1 IS NULL OR agent_id = ?1
         ORDER BY created_at DESC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(
        rusqlite::params![query.agent_id, SCAN_WINDOW as i64],
        row_to_record,
    )?;

    let mut scored = Vec::new();
    for row in rows {
        let record = row?;
        let score = substring_overlap_score(&terms, &record.content);
        scored.push((record, score));
    }
    Ok(sort_and_cap(scored, query))
}

// ============================================================================
// VECTOR STRATEGY
// ============================================================================

/// Cosine k-NN over stored embeddings
pub struct VectorSearchStrategy {
    dimension: usize,
}

impl VectorSearchStrategy {
    /// Create for the system-wide embedding dimension
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl SimilaritySearchStrategy for VectorSearchStrategy {
    fn name(&self) -> &'static str {
        "vector"
    }

    fn supports_vector_search(&self) -> bool {
        true
    }

    fn initialize(&mut self, conn: &Connection) -> Result<()> {
        self.validate_schema(conn)
    }

    fn validate_schema(&self, conn: &Connection) -> Result<()> {
        conn.prepare("SELECT count(*) FROM memory_embeddings")
            .map(|_| ())
            .map_err(|e| EngineError::BackendUnavailable(format!("embedding table: {}", e)))
    }

    fn search(
        &self,
        conn: &Connection,
        query: &SimilarityQuery,
    ) -> Result<Vec<(MemoryRecord, f32)>> {
        let Some(query_vector) = query.vector.as_deref() else {
            // No query vector: degrade to the lexical path within this call
            return lexical_scan(conn, query);
        };

        let mut stmt = conn.prepare(
            "SELECT m.*, e.embedding AS embedding_blob
             FROM memories m
             JOIN memory_embeddings e ON e.memory_id = m.id
             WHERE ?1 IS NULL OR m.agent_id = ?1",
        )?;
        let rows = stmt.query_map(rusqlite::params![query.agent_id], |row| {
            let record = row_to_record(row)?;
            let blob: Vec<u8> = row.get("embedding_blob")?;
            Ok((record, blob))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (mut record, blob) = row?;
            let score = match embedding_from_bytes(&blob) {
                Some(stored) if stored.len() == self.dimension => {
                    cosine_similarity(query_vector, &stored)
                }
                // Mismatched or undecodable vectors score 0 rather than error
                _ => 0.0,
            };
            record.embedding = embedding_from_bytes(&blob);
            scored.push((record, score));
        }
        Ok(sort_and_cap(scored, query))
    }
}

// ============================================================================
// TEXT STRATEGY
// ============================================================================

/// FTS5 keyword search scored by token overlap
pub struct TextSearchStrategy;

impl SimilaritySearchStrategy for TextSearchStrategy {
    fn name(&self) -> &'static str {
        "text"
    }

    fn supports_vector_search(&self) -> bool {
        false
    }

    fn initialize(&mut self, conn: &Connection) -> Result<()> {
        self.validate_schema(conn)
    }

    fn validate_schema(&self, conn: &Connection) -> Result<()> {
        conn.prepare("SELECT count(*) FROM memories_fts")
            .map(|_| ())
            .map_err(|e| EngineError::BackendUnavailable(format!("fts5 table: {}", e)))
    }

    fn search(
        &self,
        conn: &Connection,
        query: &SimilarityQuery,
    ) -> Result<Vec<(MemoryRecord, f32)>> {
        let terms = keyword_terms(&query.text);
        if terms.is_empty() {
            return Ok(vec![]);
        }
        let match_expr = fts5_match_expression(&terms);

        let mut stmt = conn.prepare(
            "SELECT m.* FROM memories m
             JOIN memories_fts ON m.id = memories_fts.id
             WHERE memories_fts MATCH ?1
             AND (?2 IS NULL OR m.agent_id = ?2)
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![match_expr, query.agent_id, SCAN_WINDOW as i64],
            row_to_record,
        )?;

        let mut scored = Vec::new();
        for row in rows {
            let record = row?;
            let score = term_overlap_score(&terms, &record.content);
            scored.push((record, score));
        }
        Ok(sort_and_cap(scored, query))
    }
}

// ============================================================================
// FALLBACK STRATEGY
// ============================================================================

/// Case-insensitive substring scan, recency tiebreak
pub struct FallbackSearchStrategy;

impl SimilaritySearchStrategy for FallbackSearchStrategy {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn supports_vector_search(&self) -> bool {
        false
    }

    fn initialize(&mut self, conn: &Connection) -> Result<()> {
        self.validate_schema(conn)
    }

    fn validate_schema(&self, conn: &Connection) -> Result<()> {
        conn.prepare("SELECT count(*) FROM memories")
            .map(|_| ())
            .map_err(|e| EngineError::BackendUnavailable(format!("memories table: {}", e)))
    }

    fn search(
        &self,
        conn: &Connection,
        query: &SimilarityQuery,
    ) -> Result<Vec<(MemoryRecord, f32)>> {
        lexical_scan(conn, query)
    }
}

// ============================================================================
// SELECTOR
// ============================================================================

enum ActiveStrategy {
    Vector(VectorSearchStrategy),
    Text(TextSearchStrategy),
    Fallback(FallbackSearchStrategy),
}

impl ActiveStrategy {
    fn as_strategy(&self) -> &dyn SimilaritySearchStrategy {
        match self {
            ActiveStrategy::Vector(s) => s,
            ActiveStrategy::Text(s) => s,
            ActiveStrategy::Fallback(s) => s,
        }
    }
}

/// Probes the backend once and delegates every call to the chosen strategy
pub struct DefaultSearchStrategy {
    preferred: StrategyKind,
    dimension: usize,
    has_embedder: bool,
    capabilities: BackendCapabilities,
    active: ActiveStrategy,
}

impl DefaultSearchStrategy {
    /// Build an unprobed selector; call `initialize` before searching
    pub fn new(preferred: StrategyKind, dimension: usize, has_embedder: bool) -> Self {
        Self {
            preferred,
            dimension,
            has_embedder,
            capabilities: BackendCapabilities::default(),
            active: ActiveStrategy::Fallback(FallbackSearchStrategy),
        }
    }

    /// What the last probe found
    pub fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    /// Probe again, e.g. after a schema change at runtime
    pub fn reinitialize(&mut self, conn: &Connection) -> Result<()> {
        self.initialize(conn)
    }

    fn select(&self) -> Result<ActiveStrategy> {
        let chosen = match self.preferred {
            StrategyKind::Vector => StrategyKind::Vector,
            StrategyKind::Text => {
                if !self.capabilities.fts5 {
                    return Err(EngineError::BackendUnavailable(
                        "text strategy requested but FTS5 is unavailable".into(),
                    ));
                }
                StrategyKind::Text
            }
            StrategyKind::Fallback => StrategyKind::Fallback,
            StrategyKind::Auto => {
                if self.capabilities.vector {
                    StrategyKind::Vector
                } else if self.capabilities.fts5 {
                    StrategyKind::Text
                } else {
                    StrategyKind::Fallback
                }
            }
        };

        Ok(match chosen {
            StrategyKind::Vector => {
                if !self.capabilities.vector {
                    tracing::warn!(
                        "vector strategy active without an embedding provider; \
                         queries will use the lexical path"
                    );
                }
                ActiveStrategy::Vector(VectorSearchStrategy::new(self.dimension))
            }
            StrategyKind::Text => ActiveStrategy::Text(TextSearchStrategy),
            _ => ActiveStrategy::Fallback(FallbackSearchStrategy),
        })
    }
}

impl SimilaritySearchStrategy for DefaultSearchStrategy {
    fn name(&self) -> &'static str {
        self.active.as_strategy().name()
    }

    fn supports_vector_search(&self) -> bool {
        self.active.as_strategy().supports_vector_search()
    }

    fn initialize(&mut self, conn: &Connection) -> Result<()> {
        self.capabilities = BackendCapabilities::probe(conn, self.has_embedder, self.dimension);
        let mut active = self.select()?;
        match &mut active {
            ActiveStrategy::Vector(s) => s.initialize(conn)?,
            ActiveStrategy::Text(s) => s.initialize(conn)?,
            ActiveStrategy::Fallback(s) => s.initialize(conn)?,
        }
        tracing::debug!(strategy = active.as_strategy().name(), "similarity strategy selected");
        self.active = active;
        Ok(())
    }

    fn validate_schema(&self, conn: &Connection) -> Result<()> {
        self.active.as_strategy().validate_schema(conn)
    }

    fn search(
        &self,
        conn: &Connection,
        query: &SimilarityQuery,
    ) -> Result<Vec<(MemoryRecord, f32)>> {
        self.active.as_strategy().search(conn, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_limit_is_the_tighter_cap() {
        let query = SimilarityQuery {
            agent_id: None,
            text: "q".into(),
            vector: None,
            limit: 10,
            max_results: 3,
            threshold: 0.0,
        };
        assert_eq!(query.effective_limit(), 3);
    }

    #[test]
    fn test_selector_prefers_vector_when_capable() {
        let mut selector = DefaultSearchStrategy::new(StrategyKind::Auto, 8, true);
        selector.capabilities = BackendCapabilities {
            fts5: true,
            vector: true,
        };
        let active = selector.select().unwrap();
        assert_eq!(active.as_strategy().name(), "vector");
    }

    #[test]
    fn test_selector_falls_back_without_capabilities() {
        let mut selector = DefaultSearchStrategy::new(StrategyKind::Auto, 8, false);
        selector.capabilities = BackendCapabilities {
            fts5: false,
            vector: false,
        };
        let active = selector.select().unwrap();
        assert_eq!(active.as_strategy().name(), "fallback");
    }

    #[test]
    fn test_forced_text_without_fts_is_unavailable() {
        let mut selector = DefaultSearchStrategy::new(StrategyKind::Text, 8, false);
        selector.capabilities = BackendCapabilities {
            fts5: false,
            vector: false,
        };
        assert!(selector.select().is_err());
    }
}
