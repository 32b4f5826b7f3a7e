//! Approximate Nearest Neighbor index using HNSW.
//!
//! The underlying graph supports insertion and query only. Deleting or
//! updating an indexed item is not generally correct for HNSW, so any
//! mutation of the document set marks the index stale and the next query
//! path triggers a full rebuild from the latest source set instead.

use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::{debug, info};

/// Result of a similarity search
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnnSimilarityResult {
    pub document_id: String,
    pub similarity: f32,
}

/// Configuration for the HNSW index
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnnIndexConfig {
    /// Maximum number of connections per node (M parameter)
    pub max_connections: usize,
    /// Initial capacity
    pub capacity: usize,
    /// Maximum layer depth
    pub max_layer: usize,
    /// Construction-time search width
    pub ef_construction: usize,
}

impl Default for AnnIndexConfig {
    fn default() -> Self {
        Self {
            max_connections: 16,
            capacity: 10000,
            max_layer: 16,
            ef_construction: 200,
        }
    }
}

/// HNSW index over document embeddings, cosine metric
pub struct AnnIndex {
    hnsw: RwLock<Hnsw<'static, f32, DistCosine>>,
    id_map: RwLock<Vec<String>>,
    stale: AtomicBool,
    rebuilding: AtomicBool,
    config: AnnIndexConfig,
}

impl AnnIndex {
    /// Create a new empty index with default configuration
    pub fn new() -> Self {
        Self::with_config(AnnIndexConfig::default())
    }

    /// Create a new empty index with custom configuration
    pub fn with_config(config: AnnIndexConfig) -> Self {
        Self {
            hnsw: RwLock::new(Self::make_hnsw(&config)),
            id_map: RwLock::new(Vec::new()),
            stale: AtomicBool::new(false),
            rebuilding: AtomicBool::new(false),
            config,
        }
    }

    fn make_hnsw(config: &AnnIndexConfig) -> Hnsw<'static, f32, DistCosine> {
        Hnsw::new(
            config.max_connections,
            config.capacity,
            config.max_layer,
            config.ef_construction,
            DistCosine,
        )
    }

    /// Get the number of items in the index
    pub fn len(&self) -> usize {
        self.id_map.read().unwrap().len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add an embedding to the index
    pub fn add(&self, document_id: &str, embedding: &[f32]) {
        let mut id_map = self.id_map.write().unwrap();
        let idx = id_map.len();
        id_map.push(document_id.to_string());
        drop(id_map);

        let hnsw = self.hnsw.read().unwrap();
        hnsw.insert((embedding, idx));
    }

    /// Replace the index contents from the latest source set.
    ///
    /// Mutual exclusion by atomic flag: when another rebuild is already in
    /// flight the call is dropped, not queued, and returns false. Callers
    /// that lose the race query the existing (possibly stale) graph.
    pub fn rebuild(&self, items: &[(String, Vec<f32>)]) -> bool {
        if self
            .rebuilding
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("rebuild already in flight, deferring");
            return false;
        }

        let hnsw = Self::make_hnsw(&self.config);
        let mut ids = Vec::with_capacity(items.len());
        for (idx, (id, embedding)) in items.iter().enumerate() {
            ids.push(id.clone());
            hnsw.insert((embedding.as_slice(), idx));
        }

        {
            let mut hnsw_guard = self.hnsw.write().unwrap();
            let mut id_guard = self.id_map.write().unwrap();
            *hnsw_guard = hnsw;
            *id_guard = ids;
        }
        self.stale.store(false, Ordering::Release);
        self.rebuilding.store(false, Ordering::Release);
        info!(items = items.len(), "rebuilt ANN index");
        true
    }

    /// Mark the index stale; the next query path rebuilds before answering
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    /// Find the k most similar documents
    pub fn search(&self, query: &[f32], k: usize) -> Vec<AnnSimilarityResult> {
        let ef_search = (k * 2).max(50); // Search beam width
        let hnsw = self.hnsw.read().unwrap();
        let id_map = self.id_map.read().unwrap();

        let results = hnsw.search(query, k, ef_search);

        results
            .into_iter()
            .map(|neighbour| AnnSimilarityResult {
                document_id: id_map.get(neighbour.d_id).cloned().unwrap_or_default(),
                similarity: 1.0 - neighbour.distance, // Convert distance to similarity
            })
            .collect()
    }

    /// Serialize index metadata (id map + config) to bytes.
    ///
    /// The graph itself is rebuilt from source embeddings on load.
    pub fn save_metadata(&self) -> Result<Vec<u8>, String> {
        let id_map = self.id_map.read().unwrap();
        bincode::serialize(&(id_map.clone(), &self.config))
            .map_err(|e| format!("Serialization error: {}", e))
    }

    /// Get the configuration used for this index
    pub fn config(&self) -> AnnIndexConfig {
        self.config.clone()
    }
}

impl Default for AnnIndex {
    fn default() -> Self {
        Self::new()
    }
}
