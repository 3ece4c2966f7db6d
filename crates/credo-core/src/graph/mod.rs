//! Belief relationship graph - edge types and records
//!
//! A directed multigraph over beliefs with typed, weighted, temporally
//! bounded edges. Edge rows are stored like any other record; the
//! `RelationshipGraph` service in this module's `service` submodule is their
//! sole mutator.

mod service;

pub use service::{GraphValidationIssue, NewEdgeOptions, RelationshipGraph, RelationshipUpdate};

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::belief::Belief;

// ============================================================================
// RELATIONSHIP TYPES
// ============================================================================

/// Typed relationship between two beliefs (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    Supersedes,
    Updates,
    Deprecates,
    Replaces,
    Supports,
    Contradicts,
    Implies,
    Reinforces,
    Weakens,
    RelatesTo,
    Specializes,
    Generalizes,
    Extends,
    DerivesFrom,
    Causes,
    CausedBy,
    Enables,
    Prevents,
    DependsOn,
    Precedes,
    Follows,
    ContextFor,
    EvidencedBy,
    ProvidesEvidenceFor,
    ConflictsWith,
    SimilarTo,
    AnalogousTo,
    ContrastsWith,
    Custom,
}

impl RelationshipType {
    /// Every variant, in declaration order
    pub const ALL: &'static [RelationshipType] = &[
        RelationshipType::Supersedes,
        RelationshipType::Updates,
        RelationshipType::Deprecates,
        RelationshipType::Replaces,
        RelationshipType::Supports,
        RelationshipType::Contradicts,
        RelationshipType::Implies,
        RelationshipType::Reinforces,
        RelationshipType::Weakens,
        RelationshipType::RelatesTo,
        RelationshipType::Specializes,
        RelationshipType::Generalizes,
        RelationshipType::Extends,
        RelationshipType::DerivesFrom,
        RelationshipType::Causes,
        RelationshipType::CausedBy,
        RelationshipType::Enables,
        RelationshipType::Prevents,
        RelationshipType::DependsOn,
        RelationshipType::Precedes,
        RelationshipType::Follows,
        RelationshipType::ContextFor,
        RelationshipType::EvidencedBy,
        RelationshipType::ProvidesEvidenceFor,
        RelationshipType::ConflictsWith,
        RelationshipType::SimilarTo,
        RelationshipType::AnalogousTo,
        RelationshipType::ContrastsWith,
        RelationshipType::Custom,
    ];

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Supersedes => "SUPERSEDES",
            RelationshipType::Updates => "UPDATES",
            RelationshipType::Deprecates => "DEPRECATES",
            RelationshipType::Replaces => "REPLACES",
            RelationshipType::Supports => "SUPPORTS",
            RelationshipType::Contradicts => "CONTRADICTS",
            RelationshipType::Implies => "IMPLIES",
            RelationshipType::Reinforces => "REINFORCES",
            RelationshipType::Weakens => "WEAKENS",
            RelationshipType::RelatesTo => "RELATES_TO",
            RelationshipType::Specializes => "SPECIALIZES",
            RelationshipType::Generalizes => "GENERALIZES",
            RelationshipType::Extends => "EXTENDS",
            RelationshipType::DerivesFrom => "DERIVES_FROM",
            RelationshipType::Causes => "CAUSES",
            RelationshipType::CausedBy => "CAUSED_BY",
            RelationshipType::Enables => "ENABLES",
            RelationshipType::Prevents => "PREVENTS",
            RelationshipType::DependsOn => "DEPENDS_ON",
            RelationshipType::Precedes => "PRECEDES",
            RelationshipType::Follows => "FOLLOWS",
            RelationshipType::ContextFor => "CONTEXT_FOR",
            RelationshipType::EvidencedBy => "EVIDENCED_BY",
            RelationshipType::ProvidesEvidenceFor => "PROVIDES_EVIDENCE_FOR",
            RelationshipType::ConflictsWith => "CONFLICTS_WITH",
            RelationshipType::SimilarTo => "SIMILAR_TO",
            RelationshipType::AnalogousTo => "ANALOGOUS_TO",
            RelationshipType::ContrastsWith => "CONTRASTS_WITH",
            RelationshipType::Custom => "CUSTOM",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Option<Self> {
        let upper = s.to_uppercase();
        Self::ALL.iter().copied().find(|t| t.as_str() == upper)
    }

    /// Whether a currently-effective edge of this type deprecates its target
    pub fn is_deprecating(&self) -> bool {
        matches!(
            self,
            RelationshipType::Supersedes
                | RelationshipType::Updates
                | RelationshipType::Deprecates
                | RelationshipType::Replaces
        )
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse_name(s).ok_or_else(|| format!("Unknown relationship type: {}", s))
    }
}

// ============================================================================
// EDGE STATE
// ============================================================================

/// Time- and activity-derived state of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeState {
    /// Not yet within its effective window
    Pending,
    /// Active and within bounds
    Effective,
    /// Past its effective window
    Expired,
    /// Deactivated, regardless of bounds
    Inactive,
}

// ============================================================================
// RELATIONSHIPS
// ============================================================================

/// A directed, typed, weighted edge between two beliefs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeliefRelationship {
    /// Unique identifier
    pub id: String,
    /// Edge tail
    pub source_belief_id: String,
    /// Edge head
    pub target_belief_id: String,
    /// Owner partition; both endpoints belong to it
    pub agent_id: String,
    /// Relationship type
    pub relationship_type: RelationshipType,
    /// Edge weight, 0.0 to 1.0
    pub strength: f64,
    /// When the relationship starts holding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_from: Option<DateTime<Utc>>,
    /// When the relationship stops holding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_until: Option<DateTime<Utc>>,
    /// Why the target was deprecated, for supersession edges
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
    /// Tiebreak priority between competing edges
    pub priority: i32,
    /// When the edge was created
    pub created_at: DateTime<Utc>,
    /// When the edge last changed
    pub last_updated: DateTime<Utc>,
    /// Deactivated edges are retained for history
    pub active: bool,
    /// Bounded key/value annotations
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl BeliefRelationship {
    /// Whether the edge holds at `now`: active and within temporal bounds
    pub fn is_currently_effective(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.effective_from.is_none_or(|from| from <= now)
            && self.effective_until.is_none_or(|until| until > now)
    }

    /// Derived edge state at `now`
    pub fn state(&self, now: DateTime<Utc>) -> EdgeState {
        if !self.active {
            return EdgeState::Inactive;
        }
        if self.effective_from.is_some_and(|from| from > now) {
            return EdgeState::Pending;
        }
        if self.effective_until.is_some_and(|until| until <= now) {
            return EdgeState::Expired;
        }
        EdgeState::Effective
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Materialized view of an agent's beliefs and relationships
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeliefKnowledgeGraph {
    /// Owner partition
    pub agent_id: String,
    /// Beliefs by id
    pub beliefs: HashMap<String, Belief>,
    /// Relationships by id
    pub relationships: HashMap<String, BeliefRelationship>,
}

/// Export formats for a knowledge graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Dot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn edge(active: bool) -> BeliefRelationship {
        let now = Utc::now();
        BeliefRelationship {
            id: "r-1".into(),
            source_belief_id: "b-1".into(),
            target_belief_id: "b-2".into(),
            agent_id: "u1".into(),
            relationship_type: RelationshipType::Supports,
            strength: 0.8,
            effective_from: None,
            effective_until: None,
            deprecation_reason: None,
            priority: 0,
            created_at: now,
            last_updated: now,
            active,
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_type_roundtrip_covers_every_variant() {
        for t in RelationshipType::ALL {
            assert_eq!(RelationshipType::parse_name(t.as_str()), Some(*t));
        }
        assert_eq!(RelationshipType::parse_name("NOT_A_TYPE"), None);
    }

    #[test]
    fn test_deprecating_subset() {
        assert!(RelationshipType::Supersedes.is_deprecating());
        assert!(RelationshipType::Updates.is_deprecating());
        assert!(RelationshipType::Deprecates.is_deprecating());
        assert!(RelationshipType::Replaces.is_deprecating());
        assert!(!RelationshipType::Supports.is_deprecating());
        assert!(!RelationshipType::Contradicts.is_deprecating());
    }

    #[test]
    fn test_unbounded_active_edge_is_effective() {
        let now = Utc::now();
        let e = edge(true);
        assert!(e.is_currently_effective(now));
        assert_eq!(e.state(now), EdgeState::Effective);
    }

    #[test]
    fn test_inactive_edge_is_never_effective() {
        let now = Utc::now();
        let e = edge(false);
        assert!(!e.is_currently_effective(now));
        assert_eq!(e.state(now), EdgeState::Inactive);
    }

    #[test]
    fn test_pending_and_expired_states() {
        let now = Utc::now();
        let mut e = edge(true);
        e.effective_from = Some(now + Duration::hours(1));
        assert_eq!(e.state(now), EdgeState::Pending);
        assert!(!e.is_currently_effective(now));

        e.effective_from = Some(now - Duration::hours(2));
        e.effective_until = Some(now - Duration::hours(1));
        assert_eq!(e.state(now), EdgeState::Expired);
        assert!(!e.is_currently_effective(now));
    }
}
