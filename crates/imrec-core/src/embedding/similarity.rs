//! Similarity scoring over the ANN index.
//!
//! Owns the embedding store, the index, and a per-document score cache.
//! All reads degrade to zero signal when the index is empty or a document
//! has no usable embedding.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

use imrec_domain::Document;

use super::generator::{cosine_similarity, EmbeddingGenerator};
use super::index::{AnnIndex, AnnIndexConfig, AnnSimilarityResult};

/// How long a cached similarity score stays valid
pub const SIMILARITY_CACHE_TTL: Duration = Duration::from_secs(300);

/// Neighbors consulted when aggregating a candidate's library similarity
pub const DEFAULT_TOP_K: usize = 10;

/// Aggregate top-K neighbor similarities into one candidate score.
///
/// 80% max + 20% mean, plus a bonus capped at 0.2 for having several
/// similar neighbors; clamped to 1.0.
pub fn aggregate_similarity(similarities: &[f32]) -> f64 {
    if similarities.is_empty() {
        return 0.0;
    }

    let max = *similarities
        .iter()
        .max_by(|a, b| a.total_cmp(b))
        .unwrap() as f64;
    let count = similarities.len() as f64;
    let mean = similarities.iter().map(|&s| s as f64).sum::<f64>() / count;
    let count_bonus = (count / 5.0).tanh().min(0.2);

    (max * 0.8 + mean * 0.2 + count_bonus).min(1.0)
}

/// Embedding store + ANN index + similarity cache
pub struct SimilarityEngine {
    generator: EmbeddingGenerator,
    index: AnnIndex,
    embeddings: RwLock<HashMap<String, Vec<f32>>>,
    cache: Mutex<HashMap<String, (f64, Instant)>>,
    cache_ttl: Duration,
}

impl SimilarityEngine {
    pub fn new(generator: EmbeddingGenerator) -> Self {
        Self::with_config(generator, AnnIndexConfig::default(), SIMILARITY_CACHE_TTL)
    }

    pub fn with_config(
        generator: EmbeddingGenerator,
        config: AnnIndexConfig,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            generator,
            index: AnnIndex::with_config(config),
            embeddings: RwLock::new(HashMap::new()),
            cache: Mutex::new(HashMap::new()),
            cache_ttl,
        }
    }

    /// Embed and index a document set, replacing previous contents.
    ///
    /// Documents whose text produces no embedding signal are skipped.
    /// Returns the number of documents indexed.
    pub fn index_documents(&self, documents: &[Document]) -> usize {
        let items: Vec<(String, Vec<f32>)> = documents
            .iter()
            .filter_map(|doc| {
                let vector = self.generator.embed(&doc.embedding_text());
                if vector.iter().all(|&v| v == 0.0) {
                    None
                } else {
                    Some((doc.id.clone(), vector))
                }
            })
            .collect();

        {
            let mut store = self.embeddings.write().unwrap();
            store.clear();
            for (id, vector) in &items {
                store.insert(id.clone(), vector.clone());
            }
        }

        if self.index.rebuild(&items) {
            self.clear_cache();
        }
        items.len()
    }

    /// Mark the index stale after an upstream document mutation
    pub fn mark_stale(&self) {
        self.index.mark_stale();
        self.clear_cache();
    }

    /// Whether the next query path must rebuild before answering
    pub fn is_stale(&self) -> bool {
        self.index.is_stale()
    }

    /// Rebuild from the latest source set if the index went stale.
    ///
    /// No-ops when fresh; loses gracefully when another rebuild is in
    /// flight (the caller then queries the existing graph).
    pub fn ensure_fresh(&self, latest: &[Document]) {
        if self.index.is_stale() {
            debug!("index stale, rebuilding before query");
            self.index_documents(latest);
        }
    }

    /// Top-K most similar indexed documents, excluding the query itself
    pub fn find_similar(&self, doc: &Document, top_k: usize) -> Vec<AnnSimilarityResult> {
        if self.index.is_empty() {
            return Vec::new();
        }
        let query = self.embedding_for(doc);
        if query.iter().all(|&v| v == 0.0) {
            return Vec::new();
        }
        // Over-fetch by one in case the document is its own best match
        let mut results = self.index.search(&query, top_k + 1);
        results.retain(|r| r.document_id != doc.id);
        results.truncate(top_k);
        results
    }

    /// Cached aggregate similarity of a candidate to the indexed library
    pub fn library_similarity(&self, doc: &Document) -> f64 {
        {
            let cache = self.cache.lock().unwrap();
            if let Some(&(score, at)) = cache.get(&doc.id) {
                if at.elapsed() < self.cache_ttl {
                    return score;
                }
            }
        }

        let similarities: Vec<f32> = self
            .find_similar(doc, DEFAULT_TOP_K)
            .into_iter()
            .map(|r| r.similarity)
            .collect();
        let score = aggregate_similarity(&similarities);

        self.cache
            .lock()
            .unwrap()
            .insert(doc.id.clone(), (score, Instant::now()));
        score
    }

    /// Normalized mean embedding of a reference set.
    ///
    /// Returns None when no reference document has embedding signal.
    pub fn centroid(&self, reference: &[Document]) -> Option<Vec<f32>> {
        let mut accum: Option<Vec<f32>> = None;
        let mut count = 0usize;
        for doc in reference {
            let vector = self.embedding_for(doc);
            if vector.iter().all(|&v| v == 0.0) {
                continue;
            }
            match accum {
                Some(ref mut acc) => {
                    for (a, v) in acc.iter_mut().zip(vector.iter()) {
                        *a += v;
                    }
                }
                None => accum = Some(vector),
            }
            count += 1;
        }
        let mut centroid = accum?;
        for v in centroid.iter_mut() {
            *v /= count as f32;
        }
        let norm: f32 = centroid.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            return None;
        }
        for v in centroid.iter_mut() {
            *v /= norm;
        }
        Some(centroid)
    }

    /// Score candidates against a centroid by dot product, best first.
    ///
    /// Profile-independent group recommendations: which candidates fit a
    /// reference collection as a whole.
    pub fn rank_by_centroid(
        &self,
        centroid: &[f32],
        candidates: &[Document],
        top_k: usize,
    ) -> Vec<String> {
        let mut scored: Vec<(String, f32)> = candidates
            .iter()
            .map(|doc| {
                let vector = self.embedding_for(doc);
                // Both sides normalized, so the dot product is the cosine
                let score: f32 = centroid.iter().zip(vector.iter()).map(|(c, v)| c * v).sum();
                (doc.id.clone(), score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        scored.into_iter().map(|(id, _)| id).collect()
    }

    /// Cosine similarity between two specific documents
    pub fn pairwise_similarity(&self, a: &Document, b: &Document) -> f32 {
        cosine_similarity(&self.embedding_for(a), &self.embedding_for(b))
    }

    /// Drop every cached similarity score
    pub fn clear_cache(&self) {
        self.cache.lock().unwrap().clear();
    }

    pub fn indexed_count(&self) -> usize {
        self.index.len()
    }

    /// Stored embedding when the document was indexed, fresh otherwise
    fn embedding_for(&self, doc: &Document) -> Vec<f32> {
        if let Some(vector) = self.embeddings.read().unwrap().get(&doc.id) {
            return vector.clone();
        }
        self.generator.embed(&doc.embedding_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, title: &str) -> Document {
        Document::new(id, title)
    }

    fn engine_with_library() -> SimilarityEngine {
        let engine = SimilarityEngine::new(EmbeddingGenerator::new());
        let library = vec![
            doc("a", "Dark matter halo formation simulations"),
            doc("b", "Dark matter substructure in halos"),
            doc("c", "Transformer architectures for language models"),
        ];
        engine.index_documents(&library);
        engine
    }

    #[test]
    fn test_aggregate_similarity() {
        assert_eq!(aggregate_similarity(&[]), 0.0);
        let single = aggregate_similarity(&[0.9]);
        assert!(single > 0.7 && single <= 1.0);
        // More similar neighbors increase the score
        assert!(aggregate_similarity(&[0.9, 0.8, 0.7, 0.6, 0.5]) > single);
        // Clamped at 1.0
        assert!(aggregate_similarity(&[1.0; 10]) <= 1.0);
    }

    #[test]
    fn test_find_similar_excludes_self() {
        let engine = engine_with_library();
        let results = engine.find_similar(&doc("a", "Dark matter halo formation simulations"), 2);
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.document_id != "a"));
        assert_eq!(results[0].document_id, "b");
    }

    #[test]
    fn test_library_similarity_for_related_candidate() {
        let engine = engine_with_library();
        let related = doc("x", "Dark matter halos and substructure formation");
        let unrelated = doc("y", "Intellectual property litigation outcomes");
        assert!(engine.library_similarity(&related) > engine.library_similarity(&unrelated));
    }

    #[test]
    fn test_empty_index_degrades_to_zero() {
        let engine = SimilarityEngine::new(EmbeddingGenerator::new());
        assert_eq!(engine.library_similarity(&doc("x", "Anything at all")), 0.0);
        assert!(engine.find_similar(&doc("x", "Anything"), 5).is_empty());
    }

    #[test]
    fn test_stale_rebuild_on_query_path() {
        let engine = engine_with_library();
        engine.mark_stale();
        let latest = vec![doc("only", "Gravitational wave detection methods")];
        engine.ensure_fresh(&latest);
        assert_eq!(engine.indexed_count(), 1);
    }

    #[test]
    fn test_cache_returns_same_score() {
        let engine = engine_with_library();
        let candidate = doc("x", "Dark matter halos");
        let first = engine.library_similarity(&candidate);
        let second = engine.library_similarity(&candidate);
        assert_eq!(first, second);
    }

    #[test]
    fn test_centroid_ranking() {
        let engine = engine_with_library();
        let reference = vec![
            doc("a", "Dark matter halo formation simulations"),
            doc("b", "Dark matter substructure in halos"),
        ];
        let centroid = engine.centroid(&reference).unwrap();
        let candidates = vec![
            doc("m", "Halo formation and dark matter dynamics"),
            doc("n", "Culinary history of medieval France"),
        ];
        let ranked = engine.rank_by_centroid(&centroid, &candidates, 2);
        assert_eq!(ranked[0], "m");
    }

    #[test]
    fn test_centroid_of_empty_reference() {
        let engine = SimilarityEngine::new(EmbeddingGenerator::new());
        assert!(engine.centroid(&[]).is_none());
    }
}
