//! Domain types shared across the imrec recommendation engine
//!
//! This crate provides the canonical data model for document recommendation:
//! - Document: A candidate publication with the metadata scoring needs
//! - Profile: Learned user preferences (author/venue/topic affinities)
//! - TrainingEvent: A recorded user action used for online learning
//! - FeatureType: The closed set of scoring signals
//! - Settings: Per-user engine configuration

pub mod document;
pub mod feature;
pub mod muted;
pub mod profile;
pub mod settings;
pub mod training;

pub use document::*;
pub use feature::*;
pub use muted::*;
pub use profile::*;
pub use settings::*;
pub use training::*;
