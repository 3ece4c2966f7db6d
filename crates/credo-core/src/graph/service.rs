//! Relationship graph service
//!
//! Sole mutator of belief relationship edges. Creation validates the graph
//! invariants (existing same-agent endpoints, no self-loops, ordered
//! temporal bounds) and is last-writer-wins on the active
//! `(source, target, type, agent)` slot. Traversal queries operate over
//! currently-effective edges only.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::belief::{Belief, BeliefStore};
use crate::error::{EngineError, Result};
use crate::graph::{BeliefKnowledgeGraph, BeliefRelationship, ExportFormat, RelationshipType};
use crate::providers::{Clock, IdGenerator};
use crate::storage::relationship as rows;
use crate::storage::{SqliteBackend, fmt_ts};

/// Everything `create_detailed` accepts beyond the required fields
#[derive(Debug, Clone, Default)]
pub struct RelationshipUpdate {
    /// New strength, 0.0 to 1.0
    pub strength: Option<f64>,
    /// Replacement metadata map
    pub metadata: Option<BTreeMap<String, String>>,
    /// New priority
    pub priority: Option<i32>,
    /// New closing bound
    pub effective_until: Option<DateTime<Utc>>,
}

/// A validation finding for one edge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphValidationIssue {
    /// The offending relationship
    pub relationship_id: String,
    /// Human-readable description
    pub message: String,
}

/// Optional fields for edge creation
#[derive(Debug, Clone, Default)]
pub struct NewEdgeOptions {
    pub metadata: BTreeMap<String, String>,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_until: Option<DateTime<Utc>>,
    pub deprecation_reason: Option<String>,
    pub priority: i32,
}

/// Directed, temporally-annotated relationship graph over beliefs
pub struct RelationshipGraph {
    backend: Arc<SqliteBackend>,
    beliefs: Arc<dyn BeliefStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl RelationshipGraph {
    /// Build the service
    pub fn new(
        backend: Arc<SqliteBackend>,
        beliefs: Arc<dyn BeliefStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            backend,
            beliefs,
            clock,
            ids,
        }
    }

    // ========================================================================
    // MUTATION
    // ========================================================================

    /// Create an edge with default options
    pub fn create(
        &self,
        source: &str,
        target: &str,
        relationship_type: RelationshipType,
        strength: f64,
        agent_id: &str,
    ) -> Result<BeliefRelationship> {
        self.create_detailed(
            source,
            target,
            relationship_type,
            strength,
            agent_id,
            NewEdgeOptions::default(),
        )
    }

    /// Create an edge, validating every invariant
    pub fn create_detailed(
        &self,
        source: &str,
        target: &str,
        relationship_type: RelationshipType,
        strength: f64,
        agent_id: &str,
        options: NewEdgeOptions,
    ) -> Result<BeliefRelationship> {
        for endpoint in [source, target] {
            let belief = self
                .beliefs
                .get(endpoint)?
                .ok_or_else(|| EngineError::InvalidEdge(format!("belief {} not found", endpoint)))?;
            if belief.agent_id != agent_id {
                return Err(EngineError::InvalidEdge(format!(
                    "belief {} belongs to a different agent",
                    endpoint
                )));
            }
        }
        self.create_in_unit(source, target, relationship_type, strength, agent_id, options)
    }

    /// Edge creation for the analyzer, which runs inside a per-candidate
    /// savepoint: the endpoints were written on the writer connection
    /// moments ago and are not yet visible to the reader, so the existence
    /// check is the caller's responsibility. Structural invariants are
    /// still enforced.
    pub(crate) fn create_in_unit(
        &self,
        source: &str,
        target: &str,
        relationship_type: RelationshipType,
        strength: f64,
        agent_id: &str,
        options: NewEdgeOptions,
    ) -> Result<BeliefRelationship> {
        if !(0.0..=1.0).contains(&strength) {
            return Err(EngineError::InvalidInput(
                "strength must be within [0,1]".into(),
            ));
        }
        if source == target {
            return Err(EngineError::InvalidEdge(
                "an edge cannot relate a belief to itself".into(),
            ));
        }
        if let (Some(from), Some(until)) = (options.effective_from, options.effective_until) {
            if from > until {
                return Err(EngineError::InvalidEdge(
                    "effectiveFrom must not be after effectiveUntil".into(),
                ));
            }
        }

        let now = self.clock.now();
        let edge = BeliefRelationship {
            id: self.ids.generate(),
            source_belief_id: source.to_string(),
            target_belief_id: target.to_string(),
            agent_id: agent_id.to_string(),
            relationship_type,
            strength,
            effective_from: options.effective_from,
            effective_until: options.effective_until,
            deprecation_reason: options.deprecation_reason,
            priority: options.priority,
            created_at: now,
            last_updated: now,
            active: true,
            metadata: options.metadata,
        };

        self.backend.write(|conn| {
            let tx = conn.savepoint()?;
            rows::release_active_slot(
                &tx,
                source,
                target,
                relationship_type,
                agent_id,
                &fmt_ts(now),
            )?;
            rows::upsert_edge(&tx, &edge)?;
            tx.commit()?;
            Ok(())
        })?;

        Ok(edge)
    }

    /// Fetch one edge
    pub fn find_by_id(&self, id: &str) -> Result<Option<BeliefRelationship>> {
        self.backend.read(|conn| rows::read_edge(conn, id))
    }

    /// Update mutable fields of an edge
    pub fn update(&self, id: &str, update: RelationshipUpdate) -> Result<BeliefRelationship> {
        let mut edge = self
            .find_by_id(id)?
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;

        if let Some(strength) = update.strength {
            if !(0.0..=1.0).contains(&strength) {
                return Err(EngineError::InvalidInput(
                    "strength must be within [0,1]".into(),
                ));
            }
            edge.strength = strength;
        }
        if let Some(metadata) = update.metadata {
            edge.metadata = metadata;
        }
        if let Some(priority) = update.priority {
            edge.priority = priority;
        }
        if let Some(until) = update.effective_until {
            if edge.effective_from.is_some_and(|from| from > until) {
                return Err(EngineError::InvalidEdge(
                    "effectiveFrom must not be after effectiveUntil".into(),
                ));
            }
            edge.effective_until = Some(until);
        }
        edge.last_updated = self.clock.now();

        self.backend.write(|conn| {
            let tx = conn.savepoint()?;
            rows::upsert_edge(&tx, &edge)?;
            tx.commit()?;
            Ok(())
        })?;
        Ok(edge)
    }

    /// Deactivate an edge. Idempotent; `false` when already inactive or
    /// absent.
    pub fn deactivate(&self, id: &str) -> Result<bool> {
        let now = fmt_ts(self.clock.now());
        self.backend.write(|conn| {
            let changed = conn.execute(
                "UPDATE belief_relationships SET active = 0, last_updated = ?1
                 WHERE id = ?2 AND active = 1",
                params![now, id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Reactivate an edge; fails with `InvalidEdge` when another active
    /// edge now occupies its slot
    pub fn reactivate(&self, id: &str) -> Result<bool> {
        let Some(edge) = self.find_by_id(id)? else {
            return Ok(false);
        };
        if edge.active {
            return Ok(false);
        }

        let now = fmt_ts(self.clock.now());
        self.backend.write(|conn| {
            let occupied: Option<String> = {
                use rusqlite::OptionalExtension;
                conn.query_row(
                    "SELECT id FROM belief_relationships
                     WHERE source_belief_id = ?1 AND target_belief_id = ?2
                     AND relationship_type = ?3 AND agent_id = ?4 AND active = 1",
                    params![
                        edge.source_belief_id,
                        edge.target_belief_id,
                        edge.relationship_type.as_str(),
                        edge.agent_id
                    ],
                    |row| row.get(0),
                )
                .optional()?
            };
            if let Some(other) = occupied {
                return Err(EngineError::InvalidEdge(format!(
                    "active edge {} already holds this slot",
                    other
                )));
            }

            let changed = conn.execute(
                "UPDATE belief_relationships SET active = 1, last_updated = ?1 WHERE id = ?2",
                params![now, id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Hard-delete an edge. Idempotent.
    pub fn delete(&self, id: &str) -> Result<bool> {
        self.backend.write(|conn| {
            let changed =
                conn.execute("DELETE FROM belief_relationships WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Active edges leaving a belief
    pub fn outgoing(&self, belief_id: &str) -> Result<Vec<BeliefRelationship>> {
        self.backend.read(|conn| {
            rows::query_edges(
                conn,
                "SELECT * FROM belief_relationships
                 WHERE source_belief_id = ?1 AND active = 1
                 ORDER BY created_at DESC",
                |stmt| {
                    stmt.query_map(params![belief_id], rows::row_to_relationship)?
                        .collect()
                },
            )
        })
    }

    /// Active edges arriving at a belief
    pub fn incoming(&self, belief_id: &str) -> Result<Vec<BeliefRelationship>> {
        self.backend.read(|conn| {
            rows::query_edges(
                conn,
                "SELECT * FROM belief_relationships
                 WHERE target_belief_id = ?1 AND active = 1
                 ORDER BY created_at DESC",
                |stmt| {
                    stmt.query_map(params![belief_id], rows::row_to_relationship)?
                        .collect()
                },
            )
        })
    }

    /// Active edges of one type for an agent
    pub fn by_type(
        &self,
        relationship_type: RelationshipType,
        agent_id: &str,
    ) -> Result<Vec<BeliefRelationship>> {
        self.backend.read(|conn| {
            rows::query_edges(
                conn,
                "SELECT * FROM belief_relationships
                 WHERE agent_id = ?1 AND relationship_type = ?2 AND active = 1
                 ORDER BY created_at DESC",
                |stmt| {
                    stmt.query_map(
                        params![agent_id, relationship_type.as_str()],
                        rows::row_to_relationship,
                    )?
                    .collect()
                },
            )
        })
    }

    /// Active edges between two beliefs, either direction
    pub fn between(&self, a: &str, b: &str, agent_id: &str) -> Result<Vec<BeliefRelationship>> {
        self.backend.read(|conn| {
            rows::query_edges(
                conn,
                "SELECT * FROM belief_relationships
                 WHERE agent_id = ?1 AND active = 1
                 AND ((source_belief_id = ?2 AND target_belief_id = ?3)
                   OR (source_belief_id = ?3 AND target_belief_id = ?2))
                 ORDER BY created_at DESC",
                |stmt| {
                    stmt.query_map(params![agent_id, a, b], rows::row_to_relationship)?
                        .collect()
                },
            )
        })
    }

    fn agent_edges(&self, agent_id: &str, include_inactive: bool) -> Result<Vec<BeliefRelationship>> {
        self.backend.read(|conn| {
            rows::query_edges(
                conn,
                "SELECT * FROM belief_relationships
                 WHERE agent_id = ?1 AND (?2 OR active = 1)
                 ORDER BY created_at DESC",
                |stmt| {
                    stmt.query_map(params![agent_id, include_inactive], rows::row_to_relationship)?
                        .collect()
                },
            )
        })
    }

    fn effective_edges(&self, agent_id: &str) -> Result<Vec<BeliefRelationship>> {
        let now = self.clock.now();
        Ok(self
            .agent_edges(agent_id, false)?
            .into_iter()
            .filter(|edge| edge.is_currently_effective(now))
            .collect())
    }

    /// BFS shortest path over currently-effective edges, honoring edge
    /// direction. Ties on hop count break toward higher cumulative
    /// strength. `shortest_path(a, a)` is the empty path; `None` when the
    /// target is unreachable.
    pub fn shortest_path(
        &self,
        source: &str,
        target: &str,
        agent_id: &str,
    ) -> Result<Option<Vec<BeliefRelationship>>> {
        if source == target {
            return Ok(Some(vec![]));
        }

        let mut adjacency: HashMap<String, Vec<BeliefRelationship>> = HashMap::new();
        for edge in self.effective_edges(agent_id)? {
            adjacency
                .entry(edge.source_belief_id.clone())
                .or_default()
                .push(edge);
        }

        let mut visited: HashSet<String> = HashSet::from([source.to_string()]);
        let mut frontier: HashMap<String, (f64, Vec<BeliefRelationship>)> =
            HashMap::from([(source.to_string(), (0.0, vec![]))]);

        while !frontier.is_empty() {
            let mut next: HashMap<String, (f64, Vec<BeliefRelationship>)> = HashMap::new();
            for (node, (strength, path)) in &frontier {
                let Some(edges) = adjacency.get(node) else {
                    continue;
                };
                for edge in edges {
                    if visited.contains(&edge.target_belief_id) {
                        continue;
                    }
                    let candidate_strength = strength + edge.strength;
                    let replace = match next.get(&edge.target_belief_id) {
                        Some((existing, _)) => candidate_strength > *existing,
                        None => true,
                    };
                    if replace {
                        let mut candidate_path = path.clone();
                        candidate_path.push(edge.clone());
                        next.insert(
                            edge.target_belief_id.clone(),
                            (candidate_strength, candidate_path),
                        );
                    }
                }
            }

            if let Some((_, path)) = next.get(target) {
                return Ok(Some(path.clone()));
            }
            visited.extend(next.keys().cloned());
            frontier = next;
        }

        Ok(None)
    }

    /// Beliefs reachable within `max_depth` hops, ignoring edge direction.
    /// The start belief is excluded; depth 0 returns the empty set.
    pub fn related_within_depth(
        &self,
        belief_id: &str,
        agent_id: &str,
        max_depth: usize,
    ) -> Result<Vec<String>> {
        if max_depth == 0 {
            return Ok(vec![]);
        }

        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
        for edge in self.effective_edges(agent_id)? {
            adjacency
                .entry(edge.source_belief_id.clone())
                .or_default()
                .push(edge.target_belief_id.clone());
            adjacency
                .entry(edge.target_belief_id)
                .or_default()
                .push(edge.source_belief_id);
        }

        let mut visited: HashSet<String> = HashSet::from([belief_id.to_string()]);
        let mut frontier: Vec<String> = vec![belief_id.to_string()];
        let mut related: Vec<String> = Vec::new();

        for _ in 0..max_depth {
            let mut next = Vec::new();
            for node in &frontier {
                let Some(neighbors) = adjacency.get(node) else {
                    continue;
                };
                for neighbor in neighbors {
                    if visited.insert(neighbor.clone()) {
                        related.push(neighbor.clone());
                        next.push(neighbor.clone());
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        related.sort();
        Ok(related)
    }

    /// Connected components over currently-effective edges with
    /// `strength >= min_strength`, ignoring direction
    pub fn clusters_by_strength(
        &self,
        agent_id: &str,
        min_strength: f64,
    ) -> Result<Vec<Vec<String>>> {
        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
        for edge in self.effective_edges(agent_id)? {
            if edge.strength < min_strength {
                continue;
            }
            adjacency
                .entry(edge.source_belief_id.clone())
                .or_default()
                .push(edge.target_belief_id.clone());
            adjacency
                .entry(edge.target_belief_id)
                .or_default()
                .push(edge.source_belief_id);
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut clusters = Vec::new();
        let mut nodes: Vec<&String> = adjacency.keys().collect();
        nodes.sort();

        for start in nodes {
            if seen.contains(start) {
                continue;
            }
            let mut component = Vec::new();
            let mut stack = vec![start.clone()];
            while let Some(node) = stack.pop() {
                if !seen.insert(node.clone()) {
                    continue;
                }
                component.push(node.clone());
                if let Some(neighbors) = adjacency.get(&node) {
                    stack.extend(neighbors.iter().cloned());
                }
            }
            component.sort();
            clusters.push(component);
        }

        Ok(clusters)
    }

    /// Transitive supersession back-pointers starting at a belief: the
    /// first edge points at `belief_id`, each following edge points at the
    /// previous superseder. Cycle-guarded.
    pub fn deprecation_chain(
        &self,
        belief_id: &str,
        agent_id: &str,
    ) -> Result<Vec<BeliefRelationship>> {
        let edges = self.effective_edges(agent_id)?;
        let mut chain = Vec::new();
        let mut current = belief_id.to_string();
        let mut visited: HashSet<String> = HashSet::from([current.clone()]);

        loop {
            let next = edges
                .iter()
                .filter(|edge| {
                    edge.relationship_type.is_deprecating() && edge.target_belief_id == current
                })
                .max_by(|a, b| {
                    a.priority
                        .cmp(&b.priority)
                        .then(a.strength.partial_cmp(&b.strength).unwrap_or(std::cmp::Ordering::Equal))
                        .then(a.created_at.cmp(&b.created_at))
                });
            let Some(edge) = next else {
                break;
            };
            if !visited.insert(edge.source_belief_id.clone()) {
                break;
            }
            chain.push(edge.clone());
            current = edge.source_belief_id.clone();
        }

        Ok(chain)
    }

    /// Beliefs currently deprecated: targets of currently-effective edges
    /// in the supersession subset
    pub fn deprecated_beliefs(&self, agent_id: &str) -> Result<Vec<String>> {
        let mut deprecated: Vec<String> = self
            .effective_edges(agent_id)?
            .into_iter()
            .filter(|edge| edge.relationship_type.is_deprecating())
            .map(|edge| edge.target_belief_id)
            .collect();
        deprecated.sort();
        deprecated.dedup();
        Ok(deprecated)
    }

    // ========================================================================
    // SNAPSHOTS
    // ========================================================================

    /// Materialize the agent's beliefs and relationships
    pub fn snapshot(&self, agent_id: &str, include_inactive: bool) -> Result<BeliefKnowledgeGraph> {
        let beliefs: HashMap<String, Belief> = self
            .beliefs
            .for_agent(agent_id, include_inactive)?
            .into_iter()
            .map(|belief| (belief.id.clone(), belief))
            .collect();
        let relationships: HashMap<String, BeliefRelationship> = self
            .agent_edges(agent_id, include_inactive)?
            .into_iter()
            .map(|edge| (edge.id.clone(), edge))
            .collect();

        Ok(BeliefKnowledgeGraph {
            agent_id: agent_id.to_string(),
            beliefs,
            relationships,
        })
    }

    /// Snapshot restricted to chosen beliefs and edge types. Belief ids are
    /// paged first, then hydrated, so `max_beliefs` bounds the work even for
    /// large graphs.
    pub fn filtered_snapshot(
        &self,
        agent_id: &str,
        belief_ids: Option<&[String]>,
        types: Option<&[RelationshipType]>,
        max_beliefs: usize,
    ) -> Result<BeliefKnowledgeGraph> {
        // Phase one: page the ids
        let mut ids: Vec<String> = self.backend.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM beliefs WHERE agent_id = ?1 AND active = 1
                 ORDER BY created_at DESC LIMIT ?2",
            )?;
            let limit = if max_beliefs == 0 { -1 } else { max_beliefs as i64 };
            let found = stmt
                .query_map(params![agent_id, limit], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(found)
        })?;
        if let Some(filter) = belief_ids {
            let wanted: HashSet<&String> = filter.iter().collect();
            ids.retain(|id| wanted.contains(id));
        }
        let id_set: HashSet<String> = ids.iter().cloned().collect();

        // Phase two: hydrate
        let mut beliefs = HashMap::new();
        for id in &ids {
            if let Some(belief) = self.beliefs.get(id)? {
                beliefs.insert(id.clone(), belief);
            }
        }

        let relationships: HashMap<String, BeliefRelationship> = self
            .agent_edges(agent_id, false)?
            .into_iter()
            .filter(|edge| {
                id_set.contains(&edge.source_belief_id) && id_set.contains(&edge.target_belief_id)
            })
            .filter(|edge| {
                types
                    .map(|wanted| wanted.contains(&edge.relationship_type))
                    .unwrap_or(true)
            })
            .map(|edge| (edge.id.clone(), edge))
            .collect();

        Ok(BeliefKnowledgeGraph {
            agent_id: agent_id.to_string(),
            beliefs,
            relationships,
        })
    }

    /// Serialize an agent's graph
    pub fn export(&self, agent_id: &str, format: ExportFormat) -> Result<String> {
        let snapshot = self.snapshot(agent_id, false)?;
        match format {
            ExportFormat::Json => serde_json::to_string_pretty(&snapshot)
                .map_err(|e| EngineError::StorageFailure(format!("export failed: {}", e))),
            ExportFormat::Dot => {
                let mut out = String::from("digraph beliefs {\n");
                let mut beliefs: Vec<&Belief> = snapshot.beliefs.values().collect();
                beliefs.sort_by(|a, b| a.id.cmp(&b.id));
                for belief in beliefs {
                    let label: String = belief.statement.chars().take(40).collect();
                    let _ = writeln!(
                        out,
                        "    \"{}\" [label=\"{}\"];",
                        belief.id,
                        label.replace('"', "'")
                    );
                }
                let mut edges: Vec<&BeliefRelationship> = snapshot.relationships.values().collect();
                edges.sort_by(|a, b| a.id.cmp(&b.id));
                for edge in edges {
                    let _ = writeln!(
                        out,
                        "    \"{}\" -> \"{}\" [label=\"{} ({:.2})\"];",
                        edge.source_belief_id,
                        edge.target_belief_id,
                        edge.relationship_type,
                        edge.strength
                    );
                }
                out.push_str("}\n");
                Ok(out)
            }
        }
    }

    /// Parse an export format name; anything unknown is `UnsupportedFormat`
    pub fn parse_format(name: &str) -> Result<ExportFormat> {
        match name.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "dot" => Ok(ExportFormat::Dot),
            other => Err(EngineError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Recreate a JSON-exported graph under `agent_id` with fresh ids.
    /// Returns the resulting snapshot.
    pub fn import(&self, agent_id: &str, payload: &str) -> Result<BeliefKnowledgeGraph> {
        let parsed: BeliefKnowledgeGraph = serde_json::from_str(payload)
            .map_err(|e| EngineError::InvalidInput(format!("import failed: {}", e)))?;

        let mut id_map: HashMap<String, String> = HashMap::new();
        let mut imported: Vec<Belief> = parsed.beliefs.into_values().collect();
        imported.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        for mut belief in imported {
            let new_id = self.ids.generate();
            id_map.insert(belief.id.clone(), new_id.clone());
            belief.id = new_id;
            belief.agent_id = agent_id.to_string();
            let stored = self.beliefs.store(&belief)?;
            // The store may have merged into an existing statement
            for mapped in id_map.values_mut() {
                if *mapped == belief.id && stored.id != belief.id {
                    *mapped = stored.id.clone();
                }
            }
        }

        let mut edges: Vec<BeliefRelationship> = parsed.relationships.into_values().collect();
        edges.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        for edge in edges {
            let (Some(source), Some(target)) = (
                id_map.get(&edge.source_belief_id),
                id_map.get(&edge.target_belief_id),
            ) else {
                tracing::warn!("skipping edge {} with unknown endpoints", edge.id);
                continue;
            };
            self.create_detailed(
                source,
                target,
                edge.relationship_type,
                edge.strength,
                agent_id,
                NewEdgeOptions {
                    metadata: edge.metadata,
                    effective_from: edge.effective_from,
                    effective_until: edge.effective_until,
                    deprecation_reason: edge.deprecation_reason,
                    priority: edge.priority,
                },
            )?;
        }

        self.snapshot(agent_id, false)
    }

    // ========================================================================
    // VALIDATION
    // ========================================================================

    /// Report invariant violations among the agent's active edges
    pub fn validate(&self, agent_id: &str) -> Result<Vec<GraphValidationIssue>> {
        let beliefs: HashMap<String, bool> = self
            .beliefs
            .for_agent(agent_id, true)?
            .into_iter()
            .map(|belief| (belief.id, belief.active))
            .collect();
        let edges = self.agent_edges(agent_id, false)?;

        let mut issues = Vec::new();
        let mut slots: HashMap<(String, String, RelationshipType), u32> = HashMap::new();

        for edge in &edges {
            if edge.source_belief_id == edge.target_belief_id {
                issues.push(GraphValidationIssue {
                    relationship_id: edge.id.clone(),
                    message: "edge relates a belief to itself".to_string(),
                });
            }
            if let (Some(from), Some(until)) = (edge.effective_from, edge.effective_until) {
                if from > until {
                    issues.push(GraphValidationIssue {
                        relationship_id: edge.id.clone(),
                        message: "effectiveFrom is after effectiveUntil".to_string(),
                    });
                }
            }
            // Supersession and contradiction edges legitimately point at
            // deactivated beliefs; they record why the deactivation happened
            let tolerates_inactive = edge.relationship_type.is_deprecating()
                || matches!(
                    edge.relationship_type,
                    RelationshipType::Contradicts | RelationshipType::ConflictsWith
                );
            for endpoint in [&edge.source_belief_id, &edge.target_belief_id] {
                match beliefs.get(endpoint) {
                    None => issues.push(GraphValidationIssue {
                        relationship_id: edge.id.clone(),
                        message: format!("orphaned edge: belief {} does not exist", endpoint),
                    }),
                    Some(false) if !tolerates_inactive => issues.push(GraphValidationIssue {
                        relationship_id: edge.id.clone(),
                        message: format!("orphaned edge: belief {} is inactive", endpoint),
                    }),
                    _ => {}
                }
            }
            *slots
                .entry((
                    edge.source_belief_id.clone(),
                    edge.target_belief_id.clone(),
                    edge.relationship_type,
                ))
                .or_insert(0) += 1;
        }

        for edge in &edges {
            let key = (
                edge.source_belief_id.clone(),
                edge.target_belief_id.clone(),
                edge.relationship_type,
            );
            if slots.get(&key).copied().unwrap_or(0) > 1 {
                issues.push(GraphValidationIssue {
                    relationship_id: edge.id.clone(),
                    message: format!(
                        "duplicate active {} edge between {} and {}",
                        edge.relationship_type, edge.source_belief_id, edge.target_belief_id
                    ),
                });
            }
        }

        Ok(issues)
    }
}
