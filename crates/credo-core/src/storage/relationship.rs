//! Relationship row access
//!
//! Row-level SQL for belief relationship edges. Only the graph service in
//! `crate::graph` calls into this module; going through the service is what
//! guarantees the edge invariants.

use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;
use crate::graph::{BeliefRelationship, RelationshipType};
use crate::storage::memory::{fmt_ts, parse_ts};

pub(crate) fn row_to_relationship(row: &rusqlite::Row) -> rusqlite::Result<BeliefRelationship> {
    let relationship_type: String = row.get("relationship_type")?;
    let created_at: String = row.get("created_at")?;
    let last_updated: String = row.get("last_updated")?;
    let effective_from: Option<String> = row.get("effective_from")?;
    let effective_until: Option<String> = row.get("effective_until")?;

    Ok(BeliefRelationship {
        id: row.get("id")?,
        source_belief_id: row.get("source_belief_id")?,
        target_belief_id: row.get("target_belief_id")?,
        agent_id: row.get("agent_id")?,
        relationship_type: RelationshipType::parse_name(&relationship_type)
            .unwrap_or(RelationshipType::Custom),
        strength: row.get("strength")?,
        effective_from: effective_from
            .map(|s| parse_ts(&s, "effective_from"))
            .transpose()?,
        effective_until: effective_until
            .map(|s| parse_ts(&s, "effective_until"))
            .transpose()?,
        deprecation_reason: row.get("deprecation_reason")?,
        priority: row.get("priority")?,
        created_at: parse_ts(&created_at, "created_at")?,
        last_updated: parse_ts(&last_updated, "last_updated")?,
        active: row.get::<_, i64>("active")? == 1,
        metadata: BTreeMap::new(),
    })
}

pub(crate) fn load_metadata(conn: &Connection, edge: &mut BeliefRelationship) -> Result<()> {
    let mut stmt = conn
        .prepare("SELECT key, value FROM relationship_metadata WHERE relationship_id = ?1")?;
    let rows = stmt.query_map(params![edge.id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (key, value) = row?;
        edge.metadata.insert(key, value);
    }
    Ok(())
}

pub(crate) fn write_metadata(conn: &Connection, edge: &BeliefRelationship) -> Result<()> {
    conn.execute(
        "DELETE FROM relationship_metadata WHERE relationship_id = ?1",
        params![edge.id],
    )?;
    for (key, value) in &edge.metadata {
        conn.execute(
            "INSERT INTO relationship_metadata (relationship_id, key, value) VALUES (?1, ?2, ?3)",
            params![edge.id, key, value],
        )?;
    }
    Ok(())
}

pub(crate) fn upsert_edge(conn: &Connection, edge: &BeliefRelationship) -> Result<()> {
    conn.execute(
        "INSERT INTO belief_relationships (
            id, source_belief_id, target_belief_id, agent_id, relationship_type,
            strength, effective_from, effective_until, deprecation_reason,
            priority, created_at, last_updated, active
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        ON CONFLICT(id) DO UPDATE SET
            strength = excluded.strength,
            effective_from = excluded.effective_from,
            effective_until = excluded.effective_until,
            deprecation_reason = excluded.deprecation_reason,
            priority = excluded.priority,
            last_updated = excluded.last_updated,
            active = excluded.active",
        params![
            edge.id,
            edge.source_belief_id,
            edge.target_belief_id,
            edge.agent_id,
            edge.relationship_type.as_str(),
            edge.strength,
            edge.effective_from.map(fmt_ts),
            edge.effective_until.map(fmt_ts),
            edge.deprecation_reason,
            edge.priority,
            fmt_ts(edge.created_at),
            fmt_ts(edge.last_updated),
            edge.active as i64,
        ],
    )?;
    write_metadata(conn, edge)?;
    Ok(())
}

pub(crate) fn read_edge(conn: &Connection, id: &str) -> Result<Option<BeliefRelationship>> {
    let mut stmt = conn.prepare("SELECT * FROM belief_relationships WHERE id = ?1")?;
    let edge = stmt
        .query_row(params![id], row_to_relationship)
        .optional()?;
    let Some(mut edge) = edge else {
        return Ok(None);
    };
    load_metadata(conn, &mut edge)?;
    Ok(Some(edge))
}

pub(crate) fn query_edges(
    conn: &Connection,
    sql: &str,
    bind: impl FnOnce(&mut rusqlite::Statement<'_>) -> rusqlite::Result<Vec<BeliefRelationship>>,
) -> Result<Vec<BeliefRelationship>> {
    let mut stmt = conn.prepare(sql)?;
    let mut edges = bind(&mut stmt)?;
    drop(stmt);
    for edge in &mut edges {
        load_metadata(conn, edge)?;
    }
    Ok(edges)
}

/// Deactivate the active edge holding the `(source, target, type, agent)`
/// slot, if any; relationship creation is last-writer-wins on that slot
pub(crate) fn release_active_slot(
    conn: &Connection,
    source: &str,
    target: &str,
    relationship_type: RelationshipType,
    agent_id: &str,
    now: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE belief_relationships SET active = 0, last_updated = ?1
         WHERE source_belief_id = ?2 AND target_belief_id = ?3
         AND relationship_type = ?4 AND agent_id = ?5 AND active = 1",
        params![now, source, target, relationship_type.as_str(), agent_id],
    )?;
    Ok(())
}
