//! Engine error types

use thiserror::Error;

/// Errors surfaced by the recommendation engine.
///
/// Scoring paths never return these: missing profiles, embeddings, or
/// index data degrade to neutral values. These errors cover the storage
/// and lookup boundaries where failure must reach the caller.
#[derive(Error, Debug)]
pub enum RecommendError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Training event not found: {0}")]
    EventNotFound(String),

    #[error("Profile storage failed: {0}")]
    Storage(String),

    #[error("Profile serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
