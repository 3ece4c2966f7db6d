//! Relationship graph queries, snapshots, export, and validation

use credo_core::{
    BeliefStore, EngineError, ExportFormat, IngestionInput, RelationshipType, RelationshipUpdate,
};
use credo_e2e_tests::harness::TestEngine;

fn seed_belief(engine: &credo_core::Engine, agent: &str, content: &str) -> String {
    engine
        .ingest(IngestionInput::new(agent, content))
        .unwrap()
        .belief_update
        .unwrap()
        .new_belief_ids[0]
        .clone()
}

fn seed_triangle(engine: &credo_core::Engine) -> (String, String, String) {
    let a = seed_belief(engine, "u1", "Coffee is energizing");
    let b = seed_belief(engine, "u1", "Tea is calming");
    let c = seed_belief(engine, "u1", "Water is essential");
    (a, b, c)
}

#[test]
fn outgoing_incoming_and_between() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    let (a, b, c) = seed_triangle(engine);

    engine
        .graph()
        .create(&a, &b, RelationshipType::Supports, 0.8, "u1")
        .unwrap();
    engine
        .graph()
        .create(&a, &c, RelationshipType::RelatesTo, 0.5, "u1")
        .unwrap();
    engine
        .graph()
        .create(&c, &b, RelationshipType::Implies, 0.4, "u1")
        .unwrap();

    assert_eq!(engine.graph().outgoing(&a).unwrap().len(), 2);
    assert_eq!(engine.graph().incoming(&b).unwrap().len(), 2);
    assert_eq!(engine.graph().between(&a, &b, "u1").unwrap().len(), 1);
    assert_eq!(
        engine
            .graph()
            .by_type(RelationshipType::Implies, "u1")
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn shortest_path_prefers_stronger_ties_on_equal_length() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    let (a, b, c) = seed_triangle(engine);
    let d = seed_belief(engine, "u1", "Sleep is restorative");

    // Two 2-hop routes from a to d: via b (total 1.5) and via c (total 0.5)
    engine
        .graph()
        .create(&a, &b, RelationshipType::Supports, 0.9, "u1")
        .unwrap();
    engine
        .graph()
        .create(&b, &d, RelationshipType::Supports, 0.6, "u1")
        .unwrap();
    engine
        .graph()
        .create(&a, &c, RelationshipType::Supports, 0.2, "u1")
        .unwrap();
    engine
        .graph()
        .create(&c, &d, RelationshipType::Supports, 0.3, "u1")
        .unwrap();

    let path = engine.graph().shortest_path(&a, &d, "u1").unwrap().unwrap();
    assert_eq!(path.len(), 2);
    assert_eq!(path[0].target_belief_id, b);
}

#[test]
fn shortest_path_unreachable_is_none() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    let (a, b, c) = seed_triangle(engine);

    engine
        .graph()
        .create(&a, &b, RelationshipType::Supports, 0.8, "u1")
        .unwrap();

    // Edges are directed: nothing leads to c
    assert!(engine.graph().shortest_path(&a, &c, "u1").unwrap().is_none());
    // And nothing leads backwards from b to a
    assert!(engine.graph().shortest_path(&b, &a, "u1").unwrap().is_none());
}

#[test]
fn related_within_depth_zero_is_empty() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    let (a, b, _c) = seed_triangle(engine);
    engine
        .graph()
        .create(&a, &b, RelationshipType::Supports, 0.8, "u1")
        .unwrap();

    assert!(engine.graph().related_within_depth(&a, "u1", 0).unwrap().is_empty());
}

#[test]
fn clusters_by_strength_partitions_weak_ties() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    let (a, b, c) = seed_triangle(engine);
    let d = seed_belief(engine, "u1", "Sleep is restorative");

    engine
        .graph()
        .create(&a, &b, RelationshipType::Supports, 0.9, "u1")
        .unwrap();
    // Weak bridge between the pairs
    engine
        .graph()
        .create(&b, &c, RelationshipType::RelatesTo, 0.2, "u1")
        .unwrap();
    engine
        .graph()
        .create(&c, &d, RelationshipType::Supports, 0.8, "u1")
        .unwrap();

    let clusters = engine.graph().clusters_by_strength("u1", 0.5).unwrap();
    assert_eq!(clusters.len(), 2);
    for cluster in &clusters {
        assert_eq!(cluster.len(), 2);
    }

    let merged = engine.graph().clusters_by_strength("u1", 0.1).unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].len(), 4);
}

#[test]
fn update_strength_and_metadata() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    let (a, b, _c) = seed_triangle(engine);

    let edge = engine
        .graph()
        .create(&a, &b, RelationshipType::Supports, 0.5, "u1")
        .unwrap();

    let mut metadata = std::collections::BTreeMap::new();
    metadata.insert("reviewed".to_string(), "yes".to_string());
    let updated = engine
        .graph()
        .update(
            &edge.id,
            RelationshipUpdate {
                strength: Some(0.75),
                metadata: Some(metadata),
                ..Default::default()
            },
        )
        .unwrap();
    assert!((updated.strength - 0.75).abs() < 1e-9);

    let fetched = engine.graph().find_by_id(&edge.id).unwrap().unwrap();
    assert!((fetched.strength - 0.75).abs() < 1e-9);
    assert_eq!(fetched.metadata.get("reviewed").map(String::as_str), Some("yes"));

    assert!(matches!(
        engine.graph().update(
            &edge.id,
            RelationshipUpdate {
                strength: Some(1.5),
                ..Default::default()
            }
        ),
        Err(EngineError::InvalidInput(_))
    ));
    assert!(matches!(
        engine.graph().update("missing", RelationshipUpdate::default()),
        Err(EngineError::NotFound(_))
    ));
}

#[test]
fn reactivation_respects_the_active_slot() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    let (a, b, _c) = seed_triangle(engine);

    let first = engine
        .graph()
        .create(&a, &b, RelationshipType::Supports, 0.5, "u1")
        .unwrap();
    // Second creation deactivates the first
    engine
        .graph()
        .create(&a, &b, RelationshipType::Supports, 0.6, "u1")
        .unwrap();

    assert!(matches!(
        engine.graph().reactivate(&first.id),
        Err(EngineError::InvalidEdge(_))
    ));
}

#[test]
fn delete_is_idempotent() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    let (a, b, _c) = seed_triangle(engine);

    let edge = engine
        .graph()
        .create(&a, &b, RelationshipType::Supports, 0.5, "u1")
        .unwrap();
    assert!(engine.graph().delete(&edge.id).unwrap());
    assert!(!engine.graph().delete(&edge.id).unwrap());
    assert!(engine.graph().find_by_id(&edge.id).unwrap().is_none());
}

#[test]
fn snapshot_and_filtered_snapshot() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    let (a, b, c) = seed_triangle(engine);

    engine
        .graph()
        .create(&a, &b, RelationshipType::Supports, 0.8, "u1")
        .unwrap();
    engine
        .graph()
        .create(&b, &c, RelationshipType::RelatesTo, 0.6, "u1")
        .unwrap();

    let full = engine.graph().snapshot("u1", false).unwrap();
    assert_eq!(full.agent_id, "u1");
    assert_eq!(full.beliefs.len(), 3);
    assert_eq!(full.relationships.len(), 2);

    let pair = vec![a.clone(), b.clone()];
    let filtered = engine
        .graph()
        .filtered_snapshot("u1", Some(&pair), None, 0)
        .unwrap();
    assert_eq!(filtered.beliefs.len(), 2);
    // Only the a -> b edge survives the endpoint filter
    assert_eq!(filtered.relationships.len(), 1);

    let by_type = engine
        .graph()
        .filtered_snapshot("u1", None, Some(&[RelationshipType::RelatesTo]), 0)
        .unwrap();
    assert_eq!(by_type.relationships.len(), 1);

    let capped = engine.graph().filtered_snapshot("u1", None, None, 1).unwrap();
    assert_eq!(capped.beliefs.len(), 1);
}

#[test]
fn snapshot_includes_inactive_only_on_request() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    engine
        .ingest(IngestionInput::new("u1", "The capital of Xanadu is Foo"))
        .unwrap();
    engine
        .ingest(IngestionInput::new("u1", "The capital of Xanadu is Bar"))
        .unwrap();

    let active_only = engine.graph().snapshot("u1", false).unwrap();
    assert_eq!(active_only.beliefs.len(), 1);

    let with_inactive = engine.graph().snapshot("u1", true).unwrap();
    assert_eq!(with_inactive.beliefs.len(), 2);
    assert!(with_inactive.relationships.len() >= active_only.relationships.len());
}

#[test]
fn export_json_and_dot() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    let (a, b, _c) = seed_triangle(engine);
    engine
        .graph()
        .create(&a, &b, RelationshipType::Supports, 0.8, "u1")
        .unwrap();

    let json = engine.graph().export("u1", ExportFormat::Json).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["agentId"], "u1");

    let dot = engine.graph().export("u1", ExportFormat::Dot).unwrap();
    assert!(dot.starts_with("digraph beliefs {"));
    assert!(dot.contains("SUPPORTS"));
    assert!(dot.contains(&a));

    assert!(matches!(
        credo_core::RelationshipGraph::parse_format("xml"),
        Err(EngineError::UnsupportedFormat(_))
    ));
}

#[test]
fn validation_reports_orphans() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    let (a, b, _c) = seed_triangle(engine);

    engine
        .graph()
        .create(&a, &b, RelationshipType::Supports, 0.8, "u1")
        .unwrap();
    assert!(engine.graph().validate("u1").unwrap().is_empty());

    // Hard-delete an endpoint behind the graph's back
    engine.beliefs().delete(&b).unwrap();
    let issues = engine.graph().validate("u1").unwrap();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].message.contains("does not exist"));
}

#[test]
fn validation_tolerates_supersession_of_inactive_beliefs() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    engine
        .ingest(IngestionInput::new("u1", "The capital of Xanadu is Foo"))
        .unwrap();
    engine
        .ingest(IngestionInput::new("u1", "The capital of Xanadu is Bar"))
        .unwrap();

    // The supersession pair (SUPERSEDES + CONTRADICTS onto the deactivated
    // belief) is expected history, not an issue
    assert!(engine.graph().validate("u1").unwrap().is_empty());
}
