//! Belief analyzer
//!
//! Turns one memory record into belief updates: extracts candidates,
//! classifies each against its closest existing peer (reinforce /
//! contradict / related / new), resolves contradictions per the configured
//! strategy, and emits relationship edges. Every candidate is applied in
//! its own storage unit; a failing candidate is rolled back and noted
//! without aborting the rest.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::belief::{
    Belief, BeliefCandidate, BeliefConflict, BeliefStore, ConflictSeverity, ConflictType,
    ResolutionStrategy, normalize_statement,
};
use crate::config::BeliefConfig;
use crate::error::Result;
use crate::graph::{NewEdgeOptions, RelationshipGraph, RelationshipType};
use crate::memory::MemoryRecord;
use crate::providers::{BeliefExtractionProvider, Clock, IdGenerator};
use crate::storage::SqliteBackend;

/// How many peers to consider per candidate
const PEER_LIMIT: usize = 8;

/// Belief impact of one ingested memory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeliefUpdateResult {
    /// Beliefs created
    pub new_belief_ids: Vec<String>,
    /// Beliefs whose evidence grew
    pub reinforced_belief_ids: Vec<String>,
    /// Beliefs deactivated by conflict resolution
    pub deprecated_belief_ids: Vec<String>,
    /// Conflicts recorded
    pub conflict_ids: Vec<String>,
    /// Degradations and skipped candidates
    pub notes: Vec<String>,
}

impl BeliefUpdateResult {
    /// Whether the analysis changed anything
    pub fn is_empty(&self) -> bool {
        self.new_belief_ids.is_empty()
            && self.reinforced_belief_ids.is_empty()
            && self.deprecated_belief_ids.is_empty()
            && self.conflict_ids.is_empty()
    }
}

enum CandidateOutcome {
    Reinforced {
        belief_id: String,
    },
    Created {
        belief_id: String,
    },
    Conflicted {
        conflict_id: String,
        new_belief_id: Option<String>,
        deprecated: Vec<String>,
        reinforced: Vec<String>,
    },
}

/// Distills and reconciles beliefs from ingested memories
pub struct BeliefAnalyzer {
    backend: Arc<SqliteBackend>,
    extractor: Arc<dyn BeliefExtractionProvider>,
    beliefs: Arc<dyn BeliefStore>,
    graph: Arc<RelationshipGraph>,
    config: BeliefConfig,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl BeliefAnalyzer {
    /// Build the analyzer
    pub fn new(
        backend: Arc<SqliteBackend>,
        extractor: Arc<dyn BeliefExtractionProvider>,
        beliefs: Arc<dyn BeliefStore>,
        graph: Arc<RelationshipGraph>,
        config: BeliefConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            backend,
            extractor,
            beliefs,
            graph,
            config,
            clock,
            ids,
        }
    }

    /// Analyze one stored memory. Candidates are processed sequentially;
    /// each one commits or rolls back as a unit.
    pub fn analyze(&self, record: &MemoryRecord) -> Result<BeliefUpdateResult> {
        let candidates = self.extractor.extract(
            &record.content,
            &record.agent_id,
            Some(&record.category.primary),
        )?;

        let mut result = BeliefUpdateResult::default();
        for candidate in candidates {
            if candidate.confidence < self.config.min_candidate_confidence {
                result.notes.push(format!(
                    "dropped low-confidence candidate: {}",
                    candidate.statement
                ));
                continue;
            }

            let outcome = self
                .backend
                .with_unit(|| self.process_candidate(record, &candidate));
            match outcome {
                Ok(CandidateOutcome::Reinforced { belief_id }) => {
                    if !result.reinforced_belief_ids.contains(&belief_id) {
                        result.reinforced_belief_ids.push(belief_id);
                    }
                }
                Ok(CandidateOutcome::Created { belief_id }) => {
                    result.new_belief_ids.push(belief_id);
                }
                Ok(CandidateOutcome::Conflicted {
                    conflict_id,
                    new_belief_id,
                    deprecated,
                    reinforced,
                }) => {
                    result.conflict_ids.push(conflict_id);
                    if let Some(id) = new_belief_id {
                        result.new_belief_ids.push(id);
                    }
                    result.deprecated_belief_ids.extend(deprecated);
                    for id in reinforced {
                        if !result.reinforced_belief_ids.contains(&id) {
                            result.reinforced_belief_ids.push(id);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "candidate '{}' failed and was rolled back: {}",
                        candidate.statement,
                        e
                    );
                    result
                        .notes
                        .push(format!("candidate failed: {}: {}", candidate.statement, e));
                }
            }
        }
        Ok(result)
    }

    /// Classify candidates without persisting anything, for dry runs
    pub fn preview(
        &self,
        agent_id: &str,
        content: &str,
        category_hint: Option<&str>,
    ) -> Result<BeliefUpdateResult> {
        let candidates = self.extractor.extract(content, agent_id, category_hint)?;
        let mut result = BeliefUpdateResult::default();

        for candidate in candidates {
            if candidate.confidence < self.config.min_candidate_confidence {
                continue;
            }
            let peers =
                self.beliefs
                    .find_similar(&candidate.statement, agent_id, 0.0, PEER_LIMIT)?;
            match peers.first() {
                Some((peer, similarity)) => {
                    let contradicts = self.extractor.contradicts(
                        &candidate.statement,
                        &peer.statement,
                        Some(&candidate.category),
                        Some(&peer.category),
                    );
                    if *similarity >= self.config.reinforce_threshold && !contradicts {
                        result.reinforced_belief_ids.push(peer.id.clone());
                    } else if contradicts {
                        result.conflict_ids.push(peer.id.clone());
                        result
                            .new_belief_ids
                            .push(normalize_statement(&candidate.statement));
                        if self.resolution_for(&candidate.category) != ResolutionStrategy::ManualReview
                        {
                            result.deprecated_belief_ids.push(peer.id.clone());
                        }
                    } else {
                        result
                            .new_belief_ids
                            .push(normalize_statement(&candidate.statement));
                    }
                }
                None => {
                    result
                        .new_belief_ids
                        .push(normalize_statement(&candidate.statement));
                }
            }
        }
        Ok(result)
    }

    fn resolution_for(&self, category: &str) -> ResolutionStrategy {
        self.config.resolution_for(category)
    }

    fn process_candidate(
        &self,
        record: &MemoryRecord,
        candidate: &BeliefCandidate,
    ) -> Result<CandidateOutcome> {
        let peers = self.beliefs.find_similar(
            &candidate.statement,
            &record.agent_id,
            0.0,
            PEER_LIMIT,
        )?;

        let best = peers.into_iter().next();
        match best {
            Some((peer, similarity)) => {
                let contradicts = self.extractor.contradicts(
                    &candidate.statement,
                    &peer.statement,
                    Some(&candidate.category),
                    Some(&peer.category),
                );

                if similarity >= self.config.reinforce_threshold && !contradicts {
                    self.reinforce(&peer, record, candidate)
                } else if contradicts {
                    self.resolve_conflict(record, candidate, &peer)
                } else if similarity >= self.config.related_threshold {
                    let (belief, merged) = self.materialize(record, candidate)?;
                    if merged {
                        return Ok(CandidateOutcome::Reinforced {
                            belief_id: belief.id,
                        });
                    }
                    self.graph.create_in_unit(
                        &belief.id,
                        &peer.id,
                        RelationshipType::RelatesTo,
                        similarity as f64,
                        &record.agent_id,
                        NewEdgeOptions::default(),
                    )?;
                    Ok(CandidateOutcome::Created {
                        belief_id: belief.id,
                    })
                } else {
                    let (belief, merged) = self.materialize(record, candidate)?;
                    if merged {
                        return Ok(CandidateOutcome::Reinforced {
                            belief_id: belief.id,
                        });
                    }
                    Ok(CandidateOutcome::Created {
                        belief_id: belief.id,
                    })
                }
            }
            None => {
                let (belief, merged) = self.materialize(record, candidate)?;
                if merged {
                    return Ok(CandidateOutcome::Reinforced {
                        belief_id: belief.id,
                    });
                }
                Ok(CandidateOutcome::Created {
                    belief_id: belief.id,
                })
            }
        }
    }

    /// Add the memory as evidence for an existing belief. Re-analyzing a
    /// memory already in the evidence set is a no-op.
    fn reinforce(
        &self,
        peer: &Belief,
        record: &MemoryRecord,
        candidate: &BeliefCandidate,
    ) -> Result<CandidateOutcome> {
        if peer.evidence_memory_ids.contains(&record.id) {
            return Ok(CandidateOutcome::Reinforced {
                belief_id: peer.id.clone(),
            });
        }

        let mut updated = peer.clone();
        updated.evidence_memory_ids.insert(record.id.clone());
        updated.reinforcement_count = (updated.reinforcement_count + 1)
            .max(updated.evidence_memory_ids.len() as i64);
        // Bounded moving average that never lowers confidence
        let n = peer.reinforcement_count.max(1) as f64;
        let blended = (peer.confidence * n + candidate.confidence) / (n + 1.0);
        updated.confidence = peer.confidence.max(blended).min(1.0);
        updated.last_updated = self.clock.now();

        let stored = self.beliefs.store(&updated)?;
        Ok(CandidateOutcome::Reinforced { belief_id: stored.id })
    }

    /// Create a belief for the candidate; `true` when the store merged it
    /// into an existing statement instead
    fn materialize(
        &self,
        record: &MemoryRecord,
        candidate: &BeliefCandidate,
    ) -> Result<(Belief, bool)> {
        let now = self.clock.now();
        let category = if candidate.category.is_empty() {
            self.extractor.extract_category(&candidate.statement)
        } else {
            candidate.category.clone()
        };
        let belief = Belief {
            id: self.ids.generate(),
            agent_id: record.agent_id.clone(),
            statement: normalize_statement(&candidate.statement),
            confidence: candidate.confidence.clamp(0.0, 1.0),
            category,
            tags: candidate.tags.clone(),
            evidence_memory_ids: BTreeSet::from([record.id.clone()]),
            reinforcement_count: 1,
            active: true,
            created_at: now,
            last_updated: now,
            version: 1,
        };
        let stored = self.beliefs.store(&belief)?;
        let merged = stored.id != belief.id;
        Ok((stored, merged))
    }

    fn conflict_severity(a: f64, b: f64) -> ConflictSeverity {
        if a >= 0.7 && b >= 0.7 {
            ConflictSeverity::High
        } else if a >= 0.4 || b >= 0.4 {
            ConflictSeverity::Medium
        } else {
            ConflictSeverity::Low
        }
    }

    /// Record the contradiction and apply the configured resolution
    fn resolve_conflict(
        &self,
        record: &MemoryRecord,
        candidate: &BeliefCandidate,
        peer: &Belief,
    ) -> Result<CandidateOutcome> {
        let strategy = self.resolution_for(&candidate.category);
        let now = self.clock.now();

        let (new_belief, _) = self.materialize(record, candidate)?;
        self.graph.create_in_unit(
            &new_belief.id,
            &peer.id,
            RelationshipType::Contradicts,
            0.9,
            &record.agent_id,
            NewEdgeOptions::default(),
        )?;

        let description = format!(
            "'{}' contradicts '{}'",
            new_belief.statement, peer.statement
        );
        let mut deprecated = Vec::new();
        let mut reinforced = Vec::new();
        let mut surviving_new = Some(new_belief.id.clone());
        let mut resolved = true;

        match strategy {
            ResolutionStrategy::NewerWins => {
                self.beliefs.deactivate(&peer.id)?;
                self.graph.create_in_unit(
                    &new_belief.id,
                    &peer.id,
                    RelationshipType::Supersedes,
                    1.0,
                    &record.agent_id,
                    NewEdgeOptions {
                        effective_from: Some(now),
                        deprecation_reason: Some(description.clone()),
                        ..Default::default()
                    },
                )?;
                deprecated.push(peer.id.clone());
            }
            ResolutionStrategy::HigherConfidence => {
                let (winner, loser) = if new_belief.confidence >= peer.confidence {
                    (&new_belief.id, &peer.id)
                } else {
                    (&peer.id, &new_belief.id)
                };
                self.beliefs.deactivate(loser)?;
                self.graph.create_in_unit(
                    winner,
                    loser,
                    RelationshipType::Supersedes,
                    1.0,
                    &record.agent_id,
                    NewEdgeOptions {
                        effective_from: Some(now),
                        deprecation_reason: Some(description.clone()),
                        ..Default::default()
                    },
                )?;
                deprecated.push(loser.clone());
                if loser == &new_belief.id {
                    surviving_new = None;
                }
            }
            ResolutionStrategy::Merge => {
                let merged_statement = self
                    .extractor
                    .merge(&peer.statement, &new_belief.statement)
                    .unwrap_or_else(|| {
                        format!("{}; {}", peer.statement, new_belief.statement)
                    });
                let mut merged = peer.clone();
                merged.statement = normalize_statement(&merged_statement);
                merged
                    .evidence_memory_ids
                    .extend(new_belief.evidence_memory_ids.iter().cloned());
                merged.reinforcement_count = merged
                    .reinforcement_count
                    .max(merged.evidence_memory_ids.len() as i64);
                merged.confidence = merged.confidence.max(new_belief.confidence);
                merged.last_updated = now;
                self.beliefs.deactivate(&new_belief.id)?;
                let stored = self.beliefs.store(&merged)?;
                reinforced.push(stored.id);
                deprecated.push(new_belief.id.clone());
                surviving_new = None;
            }
            ResolutionStrategy::ManualReview => {
                resolved = false;
            }
        }

        let conflict = BeliefConflict {
            id: self.ids.generate(),
            agent_id: record.agent_id.clone(),
            belief_ids: vec![new_belief.id.clone(), peer.id.clone()],
            new_evidence_memory_id: Some(record.id.clone()),
            description,
            conflict_type: ConflictType::DirectContradiction,
            severity: Self::conflict_severity(new_belief.confidence, peer.confidence),
            detected_at: now,
            resolved,
            resolved_at: resolved.then_some(now),
            resolution_strategy: resolved.then_some(strategy),
            auto_resolvable: strategy != ResolutionStrategy::ManualReview,
        };
        self.beliefs.store_conflict(&conflict)?;

        Ok(CandidateOutcome::Conflicted {
            conflict_id: conflict.id,
            new_belief_id: surviving_new,
            deprecated,
            reinforced,
        })
    }
}
