//! Shared in-memory fakes for the engine's external collaborators

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use imrec_core::{
    DocumentSource, EngineContext, MutedItemSource, ProfileStorage, RecommendError,
    SettingsStorage, SmartSearchSource,
};
use imrec_domain::{Document, MutedItemKind};

/// One struct standing in for every external store
#[derive(Default)]
pub struct InMemoryHost {
    pub documents: Mutex<HashMap<String, Document>>,
    pub profiles: Mutex<HashMap<String, String>>,
    pub muted: Mutex<HashMap<MutedItemKind, Vec<String>>>,
    pub searches: Mutex<Vec<String>>,
    pub settings: Mutex<HashMap<String, String>>,
    /// When set, profile writes fail; training must surface the error
    pub fail_profile_saves: AtomicBool,
}

impl InMemoryHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_document(&self, doc: Document) {
        self.documents.lock().unwrap().insert(doc.id.clone(), doc);
    }

    pub fn mute(&self, kind: MutedItemKind, value: &str) {
        self.muted
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push(value.to_string());
    }
}

impl ProfileStorage for InMemoryHost {
    fn load_profile(&self, library_id: &str) -> Result<Option<String>, RecommendError> {
        Ok(self.profiles.lock().unwrap().get(library_id).cloned())
    }

    fn save_profile(&self, library_id: &str, serialized: &str) -> Result<(), RecommendError> {
        if self.fail_profile_saves.load(Ordering::Relaxed) {
            return Err(RecommendError::Storage("disk full".to_string()));
        }
        self.profiles
            .lock()
            .unwrap()
            .insert(library_id.to_string(), serialized.to_string());
        Ok(())
    }
}

impl DocumentSource for InMemoryHost {
    fn query_documents(&self, parent_id: &str) -> Result<Vec<Document>, RecommendError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.library_id.as_deref().unwrap_or("default") == parent_id)
            .cloned()
            .collect())
    }

    fn document_detail(&self, id: &str) -> Result<Option<Document>, RecommendError> {
        Ok(self.documents.lock().unwrap().get(id).cloned())
    }
}

impl MutedItemSource for InMemoryHost {
    fn list_muted(&self, kind: MutedItemKind) -> Vec<String> {
        self.muted
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }
}

impl SmartSearchSource for InMemoryHost {
    fn saved_search_queries(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }
}

impl SettingsStorage for InMemoryHost {
    fn load_settings(&self) -> Result<HashMap<String, String>, RecommendError> {
        Ok(self.settings.lock().unwrap().clone())
    }

    fn save_settings(&self, map: HashMap<String, String>) -> Result<(), RecommendError> {
        *self.settings.lock().unwrap() = map;
        Ok(())
    }
}

/// Bundle a host into the context the engine constructor takes
pub fn context(host: &Arc<InMemoryHost>) -> EngineContext {
    EngineContext {
        profiles: host.clone(),
        documents: host.clone(),
        muted: host.clone(),
        smart_searches: host.clone(),
        settings: host.clone(),
    }
}
