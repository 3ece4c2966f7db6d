//! Invariants, round-trip laws, idempotence, and boundary behavior

use credo_core::{
    BeliefStore, CategoryLabel, EngineError, IngestionInput, MemoryMetadata, MemoryStore,
    RelationshipType,
};
use credo_e2e_tests::harness::TestEngine;

// ============================================================================
// INVARIANTS
// ============================================================================

#[test]
fn persisted_records_always_carry_agent_content_version() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    for content in ["I love pizza", "The sky is blue", "Meeting at noon"] {
        engine.ingest(IngestionInput::new("u1", content)).unwrap();
    }

    for record in engine.memory().for_agent("u1", 0).unwrap() {
        assert!(!record.agent_id.is_empty());
        assert!(!record.content.is_empty());
        assert!(record.version >= 1);
    }
}

#[test]
fn reinforcement_count_tracks_evidence() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    engine
        .ingest(IngestionInput::new("u1", "My favorite color is blue"))
        .unwrap();
    engine
        .ingest(IngestionInput::new("u1", "I really love the color blue"))
        .unwrap();

    for belief in engine.beliefs().for_agent("u1", true).unwrap() {
        assert!(belief.reinforcement_count >= belief.evidence_memory_ids.len() as i64);
    }
}

#[test]
fn no_duplicate_active_edges_after_repeated_creation() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    let a = seed_belief(engine, "u1", "Coffee is energizing");
    let b = seed_belief(engine, "u1", "Tea is calming");

    let first = engine
        .graph()
        .create(&a, &b, RelationshipType::Supports, 0.5, "u1")
        .unwrap();
    let second = engine
        .graph()
        .create(&a, &b, RelationshipType::Supports, 0.9, "u1")
        .unwrap();

    // Last writer wins the active slot
    let active = engine.graph().between(&a, &b, "u1").unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.id);

    let old = engine.graph().find_by_id(&first.id).unwrap().unwrap();
    assert!(!old.active);

    assert!(engine.graph().validate("u1").unwrap().is_empty());
}

#[test]
fn deprecated_iff_effective_supersession_edge() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    engine
        .ingest(IngestionInput::new("u1", "The capital of Xanadu is Foo"))
        .unwrap();
    let second = engine
        .ingest(IngestionInput::new("u1", "The capital of Xanadu is Bar"))
        .unwrap();
    let old_id = second.belief_update.unwrap().deprecated_belief_ids[0].clone();

    let chain = engine.graph().deprecation_chain(&old_id, "u1").unwrap();
    assert_eq!(chain.len(), 1);
    assert!(chain[0].relationship_type.is_deprecating());
    assert_eq!(chain[0].target_belief_id, old_id);

    assert!(engine
        .graph()
        .deprecated_beliefs("u1")
        .unwrap()
        .contains(&old_id));

    // Deactivating the edge lifts the deprecation
    assert!(engine.graph().deactivate(&chain[0].id).unwrap());
    assert!(engine.graph().deprecation_chain(&old_id, "u1").unwrap().is_empty());
    assert!(!engine
        .graph()
        .deprecated_beliefs("u1")
        .unwrap()
        .contains(&old_id));
}

// ============================================================================
// ROUND-TRIP LAWS
// ============================================================================

#[test]
fn encode_and_store_get_roundtrip() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    let metadata = MemoryMetadata {
        source: Some("test".into()),
        importance: Some(0.8),
        tags: vec!["roundtrip".into()],
        ..Default::default()
    };
    let record = engine
        .memory()
        .encode_and_store("u1", "exact content", CategoryLabel::general(), metadata, None)
        .unwrap();

    let fetched = engine.memory().get(&record.id).unwrap().unwrap();
    assert_eq!(fetched.content, "exact content");
    assert_eq!(fetched.agent_id, "u1");
    assert_eq!(fetched.metadata.importance, Some(0.8));
    assert!(fetched.relevance_score >= 0.8);
    assert_eq!(fetched.metadata.tags, vec!["roundtrip".to_string()]);
}

#[test]
fn edge_create_find_roundtrip() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    let a = seed_belief(engine, "u1", "Coffee is energizing");
    let b = seed_belief(engine, "u1", "Tea is calming");

    let mut metadata = std::collections::BTreeMap::new();
    metadata.insert("origin".to_string(), "test".to_string());
    let created = engine
        .graph()
        .create_detailed(
            &a,
            &b,
            RelationshipType::ContrastsWith,
            0.42,
            "u1",
            credo_core::NewEdgeOptions {
                metadata,
                priority: 3,
                ..Default::default()
            },
        )
        .unwrap();

    let fetched = engine.graph().find_by_id(&created.id).unwrap().unwrap();
    assert_eq!(fetched.source_belief_id, a);
    assert_eq!(fetched.target_belief_id, b);
    assert_eq!(fetched.relationship_type, RelationshipType::ContrastsWith);
    assert!((fetched.strength - 0.42).abs() < 1e-9);
    assert_eq!(fetched.priority, 3);
    assert_eq!(fetched.metadata.get("origin").map(String::as_str), Some("test"));
    assert!(fetched.active);
}

#[test]
fn export_import_reproduces_snapshot_modulo_ids() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    let a = seed_belief(engine, "source-agent", "Coffee is energizing");
    let b = seed_belief(engine, "source-agent", "Tea is calming");
    engine
        .graph()
        .create(&a, &b, RelationshipType::ContrastsWith, 0.6, "source-agent")
        .unwrap();

    let payload = engine
        .graph()
        .export("source-agent", credo_core::ExportFormat::Json)
        .unwrap();
    let imported = engine.graph().import("copy-agent", &payload).unwrap();

    let original = engine.graph().snapshot("source-agent", false).unwrap();
    assert_eq!(imported.beliefs.len(), original.beliefs.len());
    assert_eq!(imported.relationships.len(), original.relationships.len());

    let statements = |graph: &credo_core::BeliefKnowledgeGraph| {
        let mut set: Vec<String> = graph
            .beliefs
            .values()
            .map(|b| b.statement.clone())
            .collect();
        set.sort();
        set
    };
    assert_eq!(statements(&imported), statements(&original));

    // Ids were renamed
    for id in imported.beliefs.keys() {
        assert!(!original.beliefs.contains_key(id));
    }
}

// ============================================================================
// IDEMPOTENCE
// ============================================================================

#[test]
fn remove_twice_yields_true_then_false() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    let record = engine
        .ingest(IngestionInput::new("u1", "short lived"))
        .unwrap()
        .memory_id
        .unwrap();

    assert!(engine.memory().remove(&record).unwrap());
    assert!(!engine.memory().remove(&record).unwrap());
}

#[test]
fn reingesting_identical_content_never_decrements() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    engine
        .ingest(IngestionInput::new("u1", "I love pizza"))
        .unwrap();
    let belief_before = &engine.beliefs().for_agent("u1", false).unwrap()[0];
    let count_before = belief_before.reinforcement_count;
    let evidence_before = belief_before.evidence_memory_ids.len();

    engine
        .ingest(IngestionInput::new("u1", "I love pizza"))
        .unwrap();

    assert_eq!(engine.memory().for_agent("u1", 0).unwrap().len(), 2);
    let belief_after = &engine.beliefs().for_agent("u1", false).unwrap()[0];
    assert!(belief_after.reinforcement_count >= count_before);
    assert!(belief_after.evidence_memory_ids.len() >= evidence_before);
}

#[test]
fn deactivate_inactive_edge_returns_false() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    let a = seed_belief(engine, "u1", "Coffee is energizing");
    let b = seed_belief(engine, "u1", "Tea is calming");
    let edge = engine
        .graph()
        .create(&a, &b, RelationshipType::Supports, 0.5, "u1")
        .unwrap();

    assert!(engine.graph().deactivate(&edge.id).unwrap());
    assert!(!engine.graph().deactivate(&edge.id).unwrap());

    let fetched = engine.graph().find_by_id(&edge.id).unwrap().unwrap();
    assert!(!fetched.active);
}

// ============================================================================
// BOUNDARIES
// ============================================================================

#[test]
fn search_limit_boundaries() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    engine.ingest(IngestionInput::new("u1", "anything")).unwrap();

    assert!(engine
        .memory()
        .search_similar("anything", Some("u1"), 0)
        .unwrap()
        .is_empty());
    assert!(matches!(
        engine.memory().search_similar("anything", Some("u1"), -3),
        Err(EngineError::InvalidInput(_))
    ));
}

#[test]
fn shortest_path_to_self_is_empty() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    let a = seed_belief(engine, "u1", "Coffee is energizing");

    let path = engine.graph().shortest_path(&a, &a, "u1").unwrap().unwrap();
    assert!(path.is_empty());
}

#[test]
fn find_similar_at_threshold_one_is_exact_only() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    engine
        .ingest(IngestionInput::new("u1", "The capital of Xanadu is Foo"))
        .unwrap();

    let exact = engine
        .beliefs()
        .find_similar("capital of xanadu is foo", "u1", 1.0, 10)
        .unwrap();
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].1, 1.0);

    let near_miss = engine
        .beliefs()
        .find_similar("capital of xanadu is bar", "u1", 1.0, 10)
        .unwrap();
    assert!(near_miss.is_empty());
}

#[test]
fn self_loop_edge_is_rejected() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    let a = seed_belief(engine, "u1", "Coffee is energizing");

    assert!(matches!(
        engine
            .graph()
            .create(&a, &a, RelationshipType::Supports, 0.5, "u1"),
        Err(EngineError::InvalidEdge(_))
    ));
}

#[test]
fn inverted_temporal_bounds_are_rejected() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    let a = seed_belief(engine, "u1", "Coffee is energizing");
    let b = seed_belief(engine, "u1", "Tea is calming");

    let now = chrono::Utc::now();
    let result = engine.graph().create_detailed(
        &a,
        &b,
        RelationshipType::Precedes,
        0.5,
        "u1",
        credo_core::NewEdgeOptions {
            effective_from: Some(now),
            effective_until: Some(now - chrono::Duration::hours(1)),
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(EngineError::InvalidEdge(_))));
}

#[test]
fn cross_agent_edges_are_rejected() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    let a = seed_belief(engine, "u1", "Coffee is energizing");
    let b = seed_belief(engine, "u2", "Tea is calming");

    assert!(matches!(
        engine
            .graph()
            .create(&a, &b, RelationshipType::Supports, 0.5, "u1"),
        Err(EngineError::InvalidEdge(_))
    ));
}

// ============================================================================
// HELPERS
// ============================================================================

fn seed_belief(engine: &credo_core::Engine, agent: &str, content: &str) -> String {
    engine
        .ingest(IngestionInput::new(agent, content))
        .unwrap()
        .belief_update
        .unwrap()
        .new_belief_ids[0]
        .clone()
}
