//! External collaborator interfaces.
//!
//! The engine never talks to a concrete store, settings UI, or platform
//! event bus. Everything it consumes arrives through these traits, bundled
//! into an [`EngineContext`] passed to constructors.

use std::collections::HashMap;
use std::sync::Arc;

use imrec_domain::{Document, MutedItemKind, MutedItems, Settings};

use crate::error::RecommendError;

/// Persistence for the opaque serialized profile blob
pub trait ProfileStorage: Send + Sync {
    /// Load the serialized profile for a library, if one exists
    fn load_profile(&self, library_id: &str) -> Result<Option<String>, RecommendError>;

    /// Persist the serialized profile for a library
    fn save_profile(&self, library_id: &str, serialized: &str) -> Result<(), RecommendError>;
}

/// Read access to the external document store
pub trait DocumentSource: Send + Sync {
    /// All documents under a library or collection
    fn query_documents(&self, parent_id: &str) -> Result<Vec<Document>, RecommendError>;

    /// A single document by id, or None when it does not exist
    fn document_detail(&self, id: &str) -> Result<Option<Document>, RecommendError>;
}

/// The host application's mute list
pub trait MutedItemSource: Send + Sync {
    /// Muted values of one kind. Matching is case-insensitive, so the
    /// caller may return values in any casing.
    fn list_muted(&self, kind: MutedItemKind) -> Vec<String>;
}

/// Saved smart-search queries, used by cold-start bootstrap
pub trait SmartSearchSource: Send + Sync {
    fn saved_search_queries(&self) -> Vec<String>;
}

/// Settings persistence as a flat key/value map
pub trait SettingsStorage: Send + Sync {
    fn load_settings(&self) -> Result<HashMap<String, String>, RecommendError>;
    fn save_settings(&self, map: HashMap<String, String>) -> Result<(), RecommendError>;
}

/// Everything the engine needs from the outside world
#[derive(Clone)]
pub struct EngineContext {
    pub profiles: Arc<dyn ProfileStorage>,
    pub documents: Arc<dyn DocumentSource>,
    pub muted: Arc<dyn MutedItemSource>,
    pub smart_searches: Arc<dyn SmartSearchSource>,
    pub settings: Arc<dyn SettingsStorage>,
}

impl EngineContext {
    /// Collect the full mute list from the host
    pub fn muted_items(&self) -> MutedItems {
        MutedItems {
            authors: lowercased(self.muted.list_muted(MutedItemKind::Author)),
            venues: lowercased(self.muted.list_muted(MutedItemKind::Venue)),
            categories: lowercased(self.muted.list_muted(MutedItemKind::Category)),
        }
    }

    /// Load settings, falling back to defaults when the store is empty
    pub fn load_settings(&self) -> Settings {
        match self.settings.load_settings() {
            Ok(map) => Settings::from_map(&map),
            Err(_) => Settings::default(),
        }
    }
}

fn lowercased(values: Vec<String>) -> Vec<String> {
    values.into_iter().map(|v| v.to_lowercase()).collect()
}
