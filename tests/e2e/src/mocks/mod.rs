//! Deterministic mock providers

mod providers;

pub use providers::{FailingExtractor, MockEmbeddingProvider};
