//! Belief module - distilled statements, conflicts, and the store contract

mod extractor;

pub use extractor::HeuristicExtractor;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Lexical normalization of a statement: lowercase, punctuation stripped,
/// whitespace collapsed. Statement uniqueness per `(agent, active)` is
/// defined over this form.
pub fn normalize_statement(statement: &str) -> String {
    let mut out = String::with_capacity(statement.len());
    let mut last_was_space = true;
    for c in statement.chars() {
        if c.is_alphanumeric() {
            for lower in c.to_lowercase() {
                out.push(lower);
            }
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Similarity between two statements: 1.0 only for exact normalized matches,
/// otherwise Jaccard token overlap capped just below 1.0. Monotone in
/// lexical overlap, range [0,1].
pub fn statement_similarity(a: &str, b: &str) -> f32 {
    let na = normalize_statement(a);
    let nb = normalize_statement(b);
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }
    if na == nb {
        return 1.0;
    }
    let set_a: BTreeSet<&str> = na.split(' ').collect();
    let set_b: BTreeSet<&str> = nb.split(' ').collect();
    let intersection = set_a.intersection(&set_b).count() as f32;
    let union = set_a.union(&set_b).count() as f32;
    if union == 0.0 {
        return 0.0;
    }
    (intersection / union).min(0.99)
}

// ============================================================================
// BELIEFS
// ============================================================================

/// A normalized, deduplicated statement distilled from one or more memories
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Belief {
    /// Unique identifier
    pub id: String,
    /// Owner partition
    pub agent_id: String,
    /// Normalized statement text
    pub statement: String,
    /// Confidence, 0.0 to 1.0
    pub confidence: f64,
    /// Category the statement belongs to
    pub category: String,
    /// Tags carried over from extraction
    pub tags: Vec<String>,
    /// Memory ids that support this belief
    pub evidence_memory_ids: BTreeSet<String>,
    /// How many times evidence reinforced this belief
    pub reinforcement_count: i64,
    /// Inactive beliefs have been superseded, not deleted
    pub active: bool,
    /// When the belief was first formed
    pub created_at: DateTime<Utc>,
    /// When evidence or confidence last changed
    pub last_updated: DateTime<Utc>,
    /// Monotonic per-belief version
    pub version: i64,
}

/// Extractor output before store-side merge and conflict analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeliefCandidate {
    /// Candidate statement
    pub statement: String,
    /// Candidate category
    pub category: String,
    /// Tags extracted alongside the statement
    #[serde(default)]
    pub tags: Vec<String>,
    /// Extraction confidence, 0.0 to 1.0
    pub confidence: f64,
    /// Span of the content the statement came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_span: Option<String>,
}

// ============================================================================
// CONFLICTS
// ============================================================================

/// Kind of belief conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictType {
    DirectContradiction,
    CategoryMismatch,
    Temporal,
    Other,
}

impl ConflictType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictType::DirectContradiction => "direct-contradiction",
            ConflictType::CategoryMismatch => "category-mismatch",
            ConflictType::Temporal => "temporal",
            ConflictType::Other => "other",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Self {
        match s {
            "direct-contradiction" => ConflictType::DirectContradiction,
            "category-mismatch" => ConflictType::CategoryMismatch,
            "temporal" => ConflictType::Temporal,
            _ => ConflictType::Other,
        }
    }
}

/// How bad a conflict is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

impl ConflictSeverity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictSeverity::Low => "low",
            ConflictSeverity::Medium => "medium",
            ConflictSeverity::High => "high",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Self {
        match s {
            "high" => ConflictSeverity::High,
            "medium" => ConflictSeverity::Medium,
            _ => ConflictSeverity::Low,
        }
    }
}

/// Conflict resolution strategies (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Deactivate the old belief and keep the new one
    #[default]
    NewerWins,
    /// Keep whichever belief carries the higher confidence
    HigherConfidence,
    /// Combine both statements and union evidence
    Merge,
    /// Leave both active and flag for a human
    ManualReview,
}

impl ResolutionStrategy {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::NewerWins => "newer-wins",
            ResolutionStrategy::HigherConfidence => "higher-confidence",
            ResolutionStrategy::Merge => "merge",
            ResolutionStrategy::ManualReview => "manual-review",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Self {
        match s {
            "higher-confidence" => ResolutionStrategy::HigherConfidence,
            "merge" => ResolutionStrategy::Merge,
            "manual-review" => ResolutionStrategy::ManualReview,
            _ => ResolutionStrategy::NewerWins,
        }
    }
}

impl std::fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detected contradiction between held beliefs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeliefConflict {
    /// Unique identifier
    pub id: String,
    /// Owner partition
    pub agent_id: String,
    /// Beliefs involved, at least two
    pub belief_ids: Vec<String>,
    /// Memory that triggered detection, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_evidence_memory_id: Option<String>,
    /// Human-readable description
    pub description: String,
    /// Kind of conflict
    pub conflict_type: ConflictType,
    /// Severity estimate
    pub severity: ConflictSeverity,
    /// When the conflict was detected
    pub detected_at: DateTime<Utc>,
    /// Whether a resolution has been applied
    pub resolved: bool,
    /// When the resolution was applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Strategy that resolved it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_strategy: Option<ResolutionStrategy>,
    /// Whether the engine may resolve it without review
    pub auto_resolvable: bool,
}

// ============================================================================
// STORE CONTRACT
// ============================================================================

/// Durable belief storage with agent, category, and similarity reads
pub trait BeliefStore: Send + Sync {
    /// Upsert a belief. When another *active* belief of the same agent
    /// shares the normalized statement, the two are merged (evidence and
    /// tags unioned) and the surviving row is returned - lazy convergence
    /// for concurrent extraction of the same statement.
    fn store(&self, belief: &Belief) -> Result<Belief>;

    /// Store many beliefs; each follows `store` semantics.
    fn store_many(&self, beliefs: &[Belief]) -> Result<Vec<Belief>>;

    /// Fetch one belief.
    fn get(&self, id: &str) -> Result<Option<Belief>>;

    /// All beliefs for an agent, newest first.
    fn for_agent(&self, agent_id: &str, include_inactive: bool) -> Result<Vec<Belief>>;

    /// Beliefs in a category.
    fn in_category(
        &self,
        category: &str,
        agent_id: &str,
        include_inactive: bool,
    ) -> Result<Vec<Belief>>;

    /// Lexical text search over statements.
    fn search(&self, text: &str, agent_id: &str, limit: usize) -> Result<Vec<Belief>>;

    /// Active beliefs whose statements score at or above `threshold`
    /// against `statement`, ordered by descending score. A threshold of 1.0
    /// returns only exact normalized matches.
    fn find_similar(
        &self,
        statement: &str,
        agent_id: &str,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<(Belief, f32)>>;

    /// Deactivate a belief. Idempotent; `false` when already inactive or
    /// absent.
    fn deactivate(&self, id: &str) -> Result<bool>;

    /// Reactivate a belief; `false` when already active or absent. Fails
    /// with `InvalidInput` when another active belief holds the same
    /// normalized statement.
    fn reactivate(&self, id: &str) -> Result<bool>;

    /// Hard-delete a belief and its child rows. Idempotent.
    fn delete(&self, id: &str) -> Result<bool>;

    /// Persist a conflict record.
    fn store_conflict(&self, conflict: &BeliefConflict) -> Result<()>;

    /// Fetch one conflict.
    fn get_conflict(&self, id: &str) -> Result<Option<BeliefConflict>>;

    /// Conflicts for an agent, optionally only unresolved ones.
    fn conflicts_for_agent(
        &self,
        agent_id: &str,
        unresolved_only: bool,
    ) -> Result<Vec<BeliefConflict>>;

    /// Mark a conflict resolved with the strategy that settled it.
    fn resolve_conflict(&self, id: &str, strategy: ResolutionStrategy) -> Result<bool>;

    /// Hard-delete a conflict. Idempotent.
    fn delete_conflict(&self, id: &str) -> Result<bool>;
}
