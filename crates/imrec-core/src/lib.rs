//! imrec-core: Recommendation and semantic-similarity engine
//!
//! This library provides pure Rust implementations of:
//! - Feature extraction (explicit, behavioral, and content signals)
//! - Online preference learning with bounded affinity updates
//! - Signal capture (user actions -> training events, with undo)
//! - Deterministic text embeddings with an HNSW similarity index
//! - Score/rank orchestration with serendipity injection
//! - Cold-start profile bootstrap from static library content
//!
//! The engine talks to its host only through the traits in [`context`];
//! document storage, settings UI, and platform eventing stay outside.

pub mod bootstrap;
pub mod context;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod events;
pub mod features;
pub mod learner;
pub mod signals;
pub mod text;

// Re-export main types for convenience
pub use bootstrap::{ColdStartBootstrap, MIN_DOCUMENTS};
pub use context::{
    DocumentSource, EngineContext, MutedItemSource, ProfileStorage, SettingsStorage,
    SmartSearchSource,
};
pub use embedding::{
    aggregate_similarity, cosine_similarity, AnnIndex, AnnIndexConfig, AnnSimilarityResult,
    EmbeddingGenerator, SimilarityEngine, StoredEmbedding, WordVectorTable, EMBEDDING_DIM,
};
pub use engine::{RankedDocument, RecommendationEngine, RecommendationScore};
pub use error::RecommendError;
pub use events::{InvalidationBroadcaster, InvalidationEvent};
pub use features::{extract_features, LibraryContext};
pub use learner::{OnlineLearner, LEARNING_RATE};
pub use signals::{SignalCollector, DEDUP_WINDOW_SECS, FLUSH_THRESHOLD};
pub use text::{extract_keywords, top_keywords};
