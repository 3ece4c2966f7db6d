//! End-to-end scenarios: one ingestion journey per subsystem interaction

use std::sync::Arc;

use credo_core::{
    BeliefStore, EngineConfig, IngestionInput, IngestionStatus, MemoryStore, RelationshipType,
    StrategyKind,
};
use credo_e2e_tests::harness::TestEngine;
use credo_e2e_tests::mocks::FailingExtractor;

#[test]
fn simple_ingestion_and_retrieval() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    let mut input = IngestionInput::new("u1", "I love pizza");
    input.source = Some("chat".to_string());
    let result = engine.ingest(input).unwrap();

    assert_eq!(result.status, IngestionStatus::Success);
    assert!(result.memory_id.is_some());
    assert!(!result.category.primary.is_empty());
    assert!(result.encoded_successfully);

    let memories = engine.memory().for_agent("u1", 10).unwrap();
    assert_eq!(memories.len(), 1);
    assert_eq!(memories[0].content, "I love pizza");
    assert_eq!(memories[0].metadata.source.as_deref(), Some("chat"));
    assert_eq!(Some(memories[0].id.clone()), result.memory_id);
}

#[test]
fn reinforcement_across_restatements() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    let first = engine
        .ingest(IngestionInput::new("u2", "My favorite color is blue"))
        .unwrap();
    let first_update = first.belief_update.unwrap();
    assert_eq!(first_update.new_belief_ids.len(), 1);
    let belief_id = first_update.new_belief_ids[0].clone();

    let belief = engine.beliefs().get(&belief_id).unwrap().unwrap();
    assert!(belief.statement.contains("blue"));
    assert_eq!(belief.reinforcement_count, 1);

    let second = engine
        .ingest(IngestionInput::new("u2", "I really love the color blue"))
        .unwrap();
    let second_update = second.belief_update.unwrap();
    assert_eq!(second_update.reinforced_belief_ids, vec![belief_id.clone()]);
    assert!(second_update.new_belief_ids.is_empty());

    let belief = engine.beliefs().get(&belief_id).unwrap().unwrap();
    assert_eq!(belief.reinforcement_count, 2);
    assert_eq!(belief.evidence_memory_ids.len(), 2);
}

#[test]
fn conflict_resolution_newer_wins_with_supersession() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    let first = engine
        .ingest(IngestionInput::new("u3", "The capital of Xanadu is Foo"))
        .unwrap();
    let old_id = first.belief_update.unwrap().new_belief_ids[0].clone();

    let second = engine
        .ingest(IngestionInput::new("u3", "The capital of Xanadu is Bar"))
        .unwrap();
    let update = second.belief_update.unwrap();
    assert_eq!(update.conflict_ids.len(), 1);
    assert_eq!(update.deprecated_belief_ids, vec![old_id.clone()]);
    assert_eq!(update.new_belief_ids.len(), 1);
    let new_id = update.new_belief_ids[0].clone();

    // One active belief remains, and it is the newer statement
    let active = engine.beliefs().for_agent("u3", false).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, new_id);
    assert!(active[0].statement.contains("bar"));

    let old = engine.beliefs().get(&old_id).unwrap().unwrap();
    assert!(!old.active);

    // A currently-effective SUPERSEDES edge points new -> old
    let supersedes = engine
        .graph()
        .by_type(RelationshipType::Supersedes, "u3")
        .unwrap();
    assert_eq!(supersedes.len(), 1);
    assert_eq!(supersedes[0].source_belief_id, new_id);
    assert_eq!(supersedes[0].target_belief_id, old_id);
    assert!(supersedes[0].deprecation_reason.is_some());
    assert!(supersedes[0].is_currently_effective(chrono::Utc::now()));

    let deprecated = engine.graph().deprecated_beliefs("u3").unwrap();
    assert_eq!(deprecated, vec![old_id.clone()]);

    // The recorded conflict is resolved
    let conflicts = engine.beliefs().conflicts_for_agent("u3", false).unwrap();
    assert_eq!(conflicts.len(), 1);
    assert!(conflicts[0].resolved);
    assert!(conflicts[0].belief_ids.contains(&old_id));
    assert!(conflicts[0].belief_ids.contains(&new_id));
}

#[test]
fn dry_run_previews_without_persisting() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    let result = engine
        .dry_run(IngestionInput::new("u4", "Meeting at 3pm"))
        .unwrap();

    assert!(result.dry_run);
    assert!(!result.encoded_successfully);
    assert!(result.memory_id.is_none());
    assert!(!result.category.primary.is_empty());

    assert!(engine.memory().for_agent("u4", 10).unwrap().is_empty());
    assert!(engine.beliefs().for_agent("u4", true).unwrap().is_empty());
}

#[test]
fn dry_run_previews_belief_impacts() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    engine
        .ingest(IngestionInput::new("u4", "My favorite color is blue"))
        .unwrap();
    let before = engine.beliefs().for_agent("u4", true).unwrap();

    let preview = engine
        .dry_run(IngestionInput::new("u4", "I really love the color blue"))
        .unwrap();
    let update = preview.belief_update.unwrap();
    assert_eq!(update.reinforced_belief_ids.len(), 1);

    // Nothing changed
    let after = engine.beliefs().for_agent("u4", true).unwrap();
    assert_eq!(before.len(), after.len());
    assert_eq!(after[0].reinforcement_count, 1);
}

fn seed_similarity_corpus(engine: &credo_core::Engine) {
    for content in [
        "machine learning and neural networks",
        "deep learning with neural networks",
        "relational database systems for indexing",
    ] {
        engine.ingest(IngestionInput::new("u5", content)).unwrap();
    }
}

#[test]
fn similarity_query_with_vector_strategy() {
    let harness = TestEngine::new();
    let engine = &harness.engine;
    assert_eq!(engine.memory().strategy_name(), "vector");

    seed_similarity_corpus(engine);
    let results = engine
        .memory()
        .search_similar("neural networks and AI", Some("u5"), 2)
        .unwrap();

    assert_eq!(results.len(), 2);
    // Descending similarity, the learning records ahead of the database one
    assert!(results[0].1 >= results[1].1);
    assert!(results[0].0.content.contains("machine learning"));
    assert!(results[1].0.content.contains("deep learning"));
}

#[test]
fn similarity_query_is_strategy_agnostic() {
    for (strategy, with_embedder) in [
        (StrategyKind::Auto, false),    // text
        (StrategyKind::Fallback, false),
        (StrategyKind::Vector, true),
    ] {
        let harness = TestEngine::with_strategy(strategy, with_embedder);
        let engine = &harness.engine;
        seed_similarity_corpus(engine);

        let results = engine
            .memory()
            .search_similar("neural networks and AI", Some("u5"), 2)
            .unwrap();

        assert_eq!(results.len(), 2, "strategy {:?}", strategy);
        for (record, score) in &results {
            assert!(record.content.contains("neural networks"), "strategy {:?}", strategy);
            assert!(*score > 0.0 && *score <= 1.0);
        }
        assert!(results[0].1 >= results[1].1);
    }
}

#[test]
fn graph_traversal_and_shortest_path() {
    let harness = TestEngine::new();
    let engine = &harness.engine;

    // Materialize three beliefs through ingestion
    let b1 = engine
        .ingest(IngestionInput::new("u6", "Exercise is healthy"))
        .unwrap()
        .belief_update
        .unwrap()
        .new_belief_ids[0]
        .clone();
    let b2 = engine
        .ingest(IngestionInput::new("u6", "Running is exercise for the heart"))
        .unwrap()
        .belief_update
        .unwrap()
        .new_belief_ids[0]
        .clone();
    let b3 = engine
        .ingest(IngestionInput::new("u6", "Morning routines are energizing"))
        .unwrap()
        .belief_update
        .unwrap()
        .new_belief_ids[0]
        .clone();

    engine
        .graph()
        .create(&b1, &b2, RelationshipType::Supports, 0.8, "u6")
        .unwrap();
    engine
        .graph()
        .create(&b2, &b3, RelationshipType::RelatesTo, 0.7, "u6")
        .unwrap();

    let path = engine.graph().shortest_path(&b1, &b3, "u6").unwrap().unwrap();
    assert_eq!(path.len(), 2);
    assert_eq!(path[0].source_belief_id, b1);
    assert_eq!(path[0].target_belief_id, b2);
    assert_eq!(path[1].source_belief_id, b2);
    assert_eq!(path[1].target_belief_id, b3);

    let related = engine.graph().related_within_depth(&b1, "u6", 2).unwrap();
    assert!(related.contains(&b2));
    assert!(related.contains(&b3));
    assert!(!related.contains(&b1));

    let one_hop = engine.graph().related_within_depth(&b1, "u6", 1).unwrap();
    assert!(one_hop.contains(&b2));
    assert!(!one_hop.contains(&b3));
}

#[test]
fn extractor_failure_is_partial_success() {
    let temp = tempfile::TempDir::new().unwrap();
    let engine = credo_core::Engine::builder()
        .db_path(temp.path().join("credo-test.db"))
        .config(EngineConfig::default())
        .extraction_provider(Arc::new(FailingExtractor))
        .build()
        .unwrap();

    let result = engine
        .ingest(IngestionInput::new("u7", "I love pizza"))
        .unwrap();

    // The memory is stored; only the belief phase degraded
    assert!(result.encoded_successfully);
    assert_eq!(result.status, IngestionStatus::PartialSuccess);
    assert!(result.belief_update.is_none());
    assert!(!result.notes.is_empty());
    assert_eq!(engine.memory().for_agent("u7", 10).unwrap().len(), 1);
}

#[test]
fn analysis_can_be_disabled() {
    let mut config = EngineConfig::default();
    config.belief.enable_analysis = false;
    let harness = TestEngine::with_config(config, true);
    let engine = &harness.engine;

    let result = engine
        .ingest(IngestionInput::new("u8", "I love pizza"))
        .unwrap();

    assert_eq!(result.status, IngestionStatus::Success);
    assert!(result.belief_update.is_none());
    assert!(engine.beliefs().for_agent("u8", true).unwrap().is_empty());
}
