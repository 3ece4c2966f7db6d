//! Memory record - the fundamental unit of agent memory
//!
//! Each record carries the raw content, its category label, typed metadata,
//! and an optional fixed-dimension embedding.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification assigned by the categorizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryLabel {
    /// Primary category name
    pub primary: String,
    /// Optional refinement of the primary category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    /// Extracted tags (emails, URLs, dates, keywords)
    #[serde(default)]
    pub tags: Vec<String>,
    /// Strength of the rule match, 0.0 to 1.0
    pub confidence: f64,
}

impl CategoryLabel {
    /// Label used when categorization fails or nothing matches
    pub fn general() -> Self {
        Self {
            primary: "general".to_string(),
            secondary: None,
            tags: vec![],
            confidence: 0.0,
        }
    }

    /// Whether this label names `category` as primary or secondary
    pub fn matches(&self, category: &str) -> bool {
        self.primary == category || self.secondary.as_deref() == Some(category)
    }
}

impl Default for CategoryLabel {
    fn default() -> Self {
        Self::general()
    }
}

/// Typed metadata attached to a memory record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryMetadata {
    /// Where the content came from (conversation, file, URL)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Caller-assigned importance, 0.0 to 1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
    /// Caller-assigned confidence, 0.0 to 1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Caller-assigned tags
    pub tags: Vec<String>,
    /// Times the record was read back; monotonic
    pub access_count: i64,
    /// Bounded free-form annotations
    pub extra: BTreeMap<String, String>,
}

/// A persisted memory record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    /// Unique identifier, assigned at creation
    pub id: String,
    /// Owner partition; every query is scoped to an agent
    pub agent_id: String,
    /// The remembered content
    pub content: String,
    /// Category assigned at ingestion
    pub category: CategoryLabel,
    /// Typed metadata
    pub metadata: MemoryMetadata,
    /// Optional fixed-dimension embedding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When the record was last read
    pub last_accessed: DateTime<Utc>,
    /// Usage-driven relevance, 0.0 to 1.0
    pub relevance_score: f64,
    /// Monotonic per-record version
    pub version: i64,
}

impl MemoryRecord {
    /// Initial relevance: caller importance when present, otherwise 0.5
    pub fn initial_relevance(metadata: &MemoryMetadata) -> f64 {
        metadata.importance.unwrap_or(0.5).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_label() {
        let label = CategoryLabel::general();
        assert_eq!(label.primary, "general");
        assert_eq!(label.confidence, 0.0);
    }

    #[test]
    fn test_category_matches_primary_and_secondary() {
        let label = CategoryLabel {
            primary: "fact".into(),
            secondary: Some("location".into()),
            tags: vec![],
            confidence: 0.8,
        };
        assert!(label.matches("fact"));
        assert!(label.matches("location"));
        assert!(!label.matches("event"));
    }

    #[test]
    fn test_initial_relevance_defaults_to_half() {
        assert_eq!(
            MemoryRecord::initial_relevance(&MemoryMetadata::default()),
            0.5
        );
        let meta = MemoryMetadata {
            importance: Some(0.9),
            ..Default::default()
        };
        assert_eq!(MemoryRecord::initial_relevance(&meta), 0.9);
    }
}
