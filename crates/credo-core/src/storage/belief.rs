//! SQLite belief store

use std::collections::BTreeSet;
use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension, params};

use crate::belief::{
    Belief, BeliefConflict, BeliefStore, ConflictSeverity, ConflictType, ResolutionStrategy,
    normalize_statement, statement_similarity,
};
use crate::error::{EngineError, Result};
use crate::providers::Clock;
use crate::search::keyword_terms;
use crate::storage::backend::SqliteBackend;
use crate::storage::memory::{fmt_ts, parse_ts};

fn row_to_belief(row: &rusqlite::Row) -> rusqlite::Result<Belief> {
    let created_at: String = row.get("created_at")?;
    let last_updated: String = row.get("last_updated")?;
    Ok(Belief {
        id: row.get("id")?,
        agent_id: row.get("agent_id")?,
        statement: row.get("statement")?,
        confidence: row.get("confidence")?,
        category: row.get("category")?,
        tags: vec![],
        evidence_memory_ids: BTreeSet::new(),
        reinforcement_count: row.get("reinforcement_count")?,
        active: row.get::<_, i64>("active")? == 1,
        created_at: parse_ts(&created_at, "created_at")?,
        last_updated: parse_ts(&last_updated, "last_updated")?,
        version: row.get("version")?,
    })
}

fn load_children(conn: &Connection, belief: &mut Belief) -> Result<()> {
    let mut stmt = conn.prepare("SELECT memory_id FROM belief_evidence WHERE belief_id = ?1")?;
    let rows = stmt.query_map(params![belief.id], |row| row.get::<_, String>(0))?;
    for row in rows {
        belief.evidence_memory_ids.insert(row?);
    }

    let mut stmt = conn.prepare("SELECT tag FROM belief_tags WHERE belief_id = ?1 ORDER BY tag")?;
    let rows = stmt.query_map(params![belief.id], |row| row.get::<_, String>(0))?;
    for row in rows {
        belief.tags.push(row?);
    }
    Ok(())
}

fn read_belief(conn: &Connection, id: &str) -> Result<Option<Belief>> {
    let mut stmt = conn.prepare("SELECT * FROM beliefs WHERE id = ?1")?;
    let belief = stmt.query_row(params![id], row_to_belief).optional()?;
    let Some(mut belief) = belief else {
        return Ok(None);
    };
    load_children(conn, &mut belief)?;
    Ok(Some(belief))
}

fn write_children(conn: &Connection, belief: &Belief) -> Result<()> {
    conn.execute(
        "DELETE FROM belief_evidence WHERE belief_id = ?1",
        params![belief.id],
    )?;
    conn.execute(
        "DELETE FROM belief_tags WHERE belief_id = ?1",
        params![belief.id],
    )?;
    for memory_id in &belief.evidence_memory_ids {
        conn.execute(
            "INSERT OR IGNORE INTO belief_evidence (belief_id, memory_id) VALUES (?1, ?2)",
            params![belief.id, memory_id],
        )?;
    }
    for tag in &belief.tags {
        conn.execute(
            "INSERT OR IGNORE INTO belief_tags (belief_id, tag) VALUES (?1, ?2)",
            params![belief.id, tag],
        )?;
    }
    Ok(())
}

fn upsert_row(conn: &Connection, belief: &Belief, normalized: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO beliefs (
            id, agent_id, statement, normalized_statement, confidence, category,
            reinforcement_count, active, created_at, last_updated, version
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(id) DO UPDATE SET
            statement = excluded.statement,
            normalized_statement = excluded.normalized_statement,
            confidence = excluded.confidence,
            category = excluded.category,
            reinforcement_count = excluded.reinforcement_count,
            active = excluded.active,
            last_updated = excluded.last_updated,
            version = excluded.version",
        params![
            belief.id,
            belief.agent_id,
            belief.statement,
            normalized,
            belief.confidence,
            belief.category,
            belief.reinforcement_count,
            belief.active as i64,
            fmt_ts(belief.created_at),
            fmt_ts(belief.last_updated),
            belief.version,
        ],
    )?;
    write_children(conn, belief)?;
    Ok(())
}

/// Belief store over the shared SQLite backend
pub struct SqliteBeliefStore {
    backend: Arc<SqliteBackend>,
    clock: Arc<dyn Clock>,
}

impl SqliteBeliefStore {
    /// Build the store
    pub fn new(backend: Arc<SqliteBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    fn validate(belief: &Belief) -> Result<()> {
        if belief.agent_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("agentId must not be blank".into()));
        }
        if normalize_statement(&belief.statement).is_empty() {
            return Err(EngineError::InvalidInput(
                "statement must not be blank".into(),
            ));
        }
        if !(0.0..=1.0).contains(&belief.confidence) {
            return Err(EngineError::InvalidInput(
                "confidence must be within [0,1]".into(),
            ));
        }
        Ok(())
    }

    fn query_beliefs(
        &self,
        sql: &str,
        bind: impl FnOnce(&mut rusqlite::Statement<'_>) -> rusqlite::Result<Vec<Belief>>,
    ) -> Result<Vec<Belief>> {
        self.backend.read(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let mut beliefs = bind(&mut stmt)?;
            drop(stmt);
            for belief in &mut beliefs {
                load_children(conn, belief)?;
            }
            Ok(beliefs)
        })
    }
}

impl BeliefStore for SqliteBeliefStore {
    fn store(&self, belief: &Belief) -> Result<Belief> {
        Self::validate(belief)?;
        let normalized = normalize_statement(&belief.statement);
        let now = self.clock.now();

        self.backend.write(|conn| {
            let tx = conn.savepoint()?;

            // Lazy convergence: an active duplicate of the same normalized
            // statement absorbs this belief instead of violating uniqueness
            let duplicate_id: Option<String> = if belief.active {
                tx.query_row(
                    "SELECT id FROM beliefs
                     WHERE agent_id = ?1 AND normalized_statement = ?2
                     AND active = 1 AND id != ?3",
                    params![belief.agent_id, normalized, belief.id],
                    |row| row.get(0),
                )
                .optional()?
            } else {
                None
            };

            let stored = if let Some(dup_id) = duplicate_id {
                let mut survivor = read_belief(&tx, &dup_id)?
                    .ok_or_else(|| EngineError::NotFound(dup_id.clone()))?;
                survivor
                    .evidence_memory_ids
                    .extend(belief.evidence_memory_ids.iter().cloned());
                for tag in &belief.tags {
                    if !survivor.tags.contains(tag) {
                        survivor.tags.push(tag.clone());
                    }
                }
                survivor.reinforcement_count = survivor
                    .reinforcement_count
                    .max(survivor.evidence_memory_ids.len() as i64);
                survivor.confidence = survivor.confidence.max(belief.confidence);
                survivor.last_updated = now;
                survivor.version += 1;
                upsert_row(&tx, &survivor, &normalize_statement(&survivor.statement))?;
                survivor
            } else {
                let mut stored = belief.clone();
                if let Some(existing) = read_belief(&tx, &belief.id)? {
                    stored.version = existing.version + 1;
                }
                stored.last_updated = now;
                upsert_row(&tx, &stored, &normalized)?;
                stored
            };

            tx.commit()?;
            Ok(stored)
        })
    }

    fn store_many(&self, beliefs: &[Belief]) -> Result<Vec<Belief>> {
        beliefs.iter().map(|b| self.store(b)).collect()
    }

    fn get(&self, id: &str) -> Result<Option<Belief>> {
        self.backend.read(|conn| read_belief(conn, id))
    }

    fn for_agent(&self, agent_id: &str, include_inactive: bool) -> Result<Vec<Belief>> {
        self.query_beliefs(
            "SELECT * FROM beliefs
             WHERE agent_id = ?1 AND (?2 OR active = 1)
             ORDER BY created_at DESC",
            |stmt| {
                stmt.query_map(params![agent_id, include_inactive], row_to_belief)?
                    .collect()
            },
        )
    }

    fn in_category(
        &self,
        category: &str,
        agent_id: &str,
        include_inactive: bool,
    ) -> Result<Vec<Belief>> {
        self.query_beliefs(
            "SELECT * FROM beliefs
             WHERE agent_id = ?1 AND category = ?2 AND (?3 OR active = 1)
             ORDER BY created_at DESC",
            |stmt| {
                stmt.query_map(params![agent_id, category, include_inactive], row_to_belief)?
                    .collect()
            },
        )
    }

    fn search(&self, text: &str, agent_id: &str, limit: usize) -> Result<Vec<Belief>> {
        let terms = keyword_terms(text);
        if terms.is_empty() {
            return Ok(vec![]);
        }
        let mut scored: Vec<(Belief, f32)> = self
            .for_agent(agent_id, false)?
            .into_iter()
            .filter_map(|belief| {
                let lowered = belief.statement.to_lowercase();
                let hits = terms.iter().filter(|t| lowered.contains(*t)).count() as f32;
                if hits > 0.0 {
                    let score = hits / terms.len() as f32;
                    Some((belief, score))
                } else {
                    None
                }
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored.into_iter().map(|(belief, _)| belief).collect())
    }

    fn find_similar(
        &self,
        statement: &str,
        agent_id: &str,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<(Belief, f32)>> {
        let mut scored: Vec<(Belief, f32)> = self
            .for_agent(agent_id, false)?
            .into_iter()
            .map(|belief| {
                let score = statement_similarity(statement, &belief.statement);
                (belief, score)
            })
            .filter(|(_, score)| *score >= threshold && *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    fn deactivate(&self, id: &str) -> Result<bool> {
        let now = fmt_ts(self.clock.now());
        self.backend.write(|conn| {
            let changed = conn.execute(
                "UPDATE beliefs SET active = 0, last_updated = ?1, version = version + 1
                 WHERE id = ?2 AND active = 1",
                params![now, id],
            )?;
            Ok(changed > 0)
        })
    }

    fn reactivate(&self, id: &str) -> Result<bool> {
        let now = fmt_ts(self.clock.now());
        self.backend.write(|conn| {
            let target: Option<(String, String)> = conn
                .query_row(
                    "SELECT agent_id, normalized_statement FROM beliefs
                     WHERE id = ?1 AND active = 0",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((agent_id, normalized)) = target else {
                return Ok(false);
            };

            let clash: Option<String> = conn
                .query_row(
                    "SELECT id FROM beliefs
                     WHERE agent_id = ?1 AND normalized_statement = ?2 AND active = 1",
                    params![agent_id, normalized],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(clash_id) = clash {
                return Err(EngineError::InvalidInput(format!(
                    "active belief {} already holds this statement",
                    clash_id
                )));
            }

            let changed = conn.execute(
                "UPDATE beliefs SET active = 1, last_updated = ?1, version = version + 1
                 WHERE id = ?2",
                params![now, id],
            )?;
            Ok(changed > 0)
        })
    }

    fn delete(&self, id: &str) -> Result<bool> {
        self.backend.write(|conn| {
            let changed = conn.execute("DELETE FROM beliefs WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
    }

    fn store_conflict(&self, conflict: &BeliefConflict) -> Result<()> {
        if conflict.belief_ids.len() < 2 {
            return Err(EngineError::InvalidInput(
                "a conflict involves at least two beliefs".into(),
            ));
        }
        self.backend.write(|conn| {
            let tx = conn.savepoint()?;
            tx.execute(
                "INSERT OR REPLACE INTO belief_conflicts (
                    id, agent_id, new_evidence_memory_id, description, conflict_type,
                    severity, detected_at, resolved, resolved_at, resolution_strategy,
                    auto_resolvable
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    conflict.id,
                    conflict.agent_id,
                    conflict.new_evidence_memory_id,
                    conflict.description,
                    conflict.conflict_type.as_str(),
                    conflict.severity.as_str(),
                    fmt_ts(conflict.detected_at),
                    conflict.resolved as i64,
                    conflict.resolved_at.map(fmt_ts),
                    conflict.resolution_strategy.map(|s| s.as_str()),
                    conflict.auto_resolvable as i64,
                ],
            )?;
            tx.execute(
                "DELETE FROM conflict_beliefs WHERE conflict_id = ?1",
                params![conflict.id],
            )?;
            for belief_id in &conflict.belief_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO conflict_beliefs (conflict_id, belief_id) VALUES (?1, ?2)",
                    params![conflict.id, belief_id],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn get_conflict(&self, id: &str) -> Result<Option<BeliefConflict>> {
        self.backend.read(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM belief_conflicts WHERE id = ?1")?;
            let conflict = stmt
                .query_row(params![id], row_to_conflict)
                .optional()?;
            let Some(mut conflict) = conflict else {
                return Ok(None);
            };
            load_conflict_beliefs(conn, &mut conflict)?;
            Ok(Some(conflict))
        })
    }

    fn conflicts_for_agent(
        &self,
        agent_id: &str,
        unresolved_only: bool,
    ) -> Result<Vec<BeliefConflict>> {
        self.backend.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM belief_conflicts
                 WHERE agent_id = ?1 AND (?2 = 0 OR resolved = 0)
                 ORDER BY detected_at DESC",
            )?;
            let mut conflicts: Vec<BeliefConflict> = stmt
                .query_map(params![agent_id, unresolved_only as i64], row_to_conflict)?
                .collect::<rusqlite::Result<_>>()?;
            drop(stmt);
            for conflict in &mut conflicts {
                load_conflict_beliefs(conn, conflict)?;
            }
            Ok(conflicts)
        })
    }

    fn resolve_conflict(&self, id: &str, strategy: ResolutionStrategy) -> Result<bool> {
        let now = fmt_ts(self.clock.now());
        self.backend.write(|conn| {
            let changed = conn.execute(
                "UPDATE belief_conflicts
                 SET resolved = 1, resolved_at = ?1, resolution_strategy = ?2
                 WHERE id = ?3 AND resolved = 0",
                params![now, strategy.as_str(), id],
            )?;
            Ok(changed > 0)
        })
    }

    fn delete_conflict(&self, id: &str) -> Result<bool> {
        self.backend.write(|conn| {
            let changed =
                conn.execute("DELETE FROM belief_conflicts WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
    }
}

fn row_to_conflict(row: &rusqlite::Row) -> rusqlite::Result<BeliefConflict> {
    let detected_at: String = row.get("detected_at")?;
    let resolved_at: Option<String> = row.get("resolved_at")?;
    let conflict_type: String = row.get("conflict_type")?;
    let severity: String = row.get("severity")?;
    let strategy: Option<String> = row.get("resolution_strategy")?;

    Ok(BeliefConflict {
        id: row.get("id")?,
        agent_id: row.get("agent_id")?,
        belief_ids: vec![],
        new_evidence_memory_id: row.get("new_evidence_memory_id")?,
        description: row.get("description")?,
        conflict_type: ConflictType::parse_name(&conflict_type),
        severity: ConflictSeverity::parse_name(&severity),
        detected_at: parse_ts(&detected_at, "detected_at")?,
        resolved: row.get::<_, i64>("resolved")? == 1,
        resolved_at: resolved_at
            .map(|s| parse_ts(&s, "resolved_at"))
            .transpose()?,
        resolution_strategy: strategy.map(|s| ResolutionStrategy::parse_name(&s)),
        auto_resolvable: row.get::<_, i64>("auto_resolvable")? == 1,
    })
}

fn load_conflict_beliefs(conn: &Connection, conflict: &mut BeliefConflict) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT belief_id FROM conflict_beliefs WHERE conflict_id = ?1 ORDER BY belief_id",
    )?;
    let rows = stmt.query_map(params![conflict.id], |row| row.get::<_, String>(0))?;
    for row in rows {
        conflict.belief_ids.push(row?);
    }
    Ok(())
}
