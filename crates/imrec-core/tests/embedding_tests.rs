//! Properties of the embedding pipeline: determinism, vector hygiene,
//! and index behavior under document churn

use proptest::prelude::*;

use imrec_core::{
    aggregate_similarity, cosine_similarity, AnnIndex, EmbeddingGenerator, SimilarityEngine,
    EMBEDDING_DIM,
};
use imrec_domain::Document;

proptest! {
    /// Same text, same vector, bit for bit
    #[test]
    fn prop_embedding_deterministic(text in "[a-zA-Z ]{0,120}") {
        let generator = EmbeddingGenerator::new();
        prop_assert_eq!(generator.embed(&text), generator.embed(&text));
    }

    /// Every embedding is the target dimension and either zero or unit norm
    #[test]
    fn prop_embedding_normalized(text in "\\PC{0,120}") {
        let generator = EmbeddingGenerator::new();
        let v = generator.embed(&text);
        prop_assert_eq!(v.len(), EMBEDDING_DIM);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        prop_assert!(norm == 0.0 || (norm - 1.0).abs() < 1e-4);
    }

    /// Cosine similarity is symmetric and bounded
    #[test]
    fn prop_cosine_symmetric(
        a in prop::collection::vec(-10.0..10.0f32, 8),
        b in prop::collection::vec(-10.0..10.0f32, 8),
    ) {
        let ab = cosine_similarity(&a, &b);
        let ba = cosine_similarity(&b, &a);
        prop_assert!((ab - ba).abs() < 1e-6);
        prop_assert!((-1.0 - 1e-6..=1.0 + 1e-6).contains(&ab));
    }

    /// Aggregation stays in [0, 1] and never drops below raising any input
    #[test]
    fn prop_aggregation_bounded(
        sims in prop::collection::vec(0.0..1.0f32, 0..20),
    ) {
        let score = aggregate_similarity(&sims);
        prop_assert!((0.0..=1.0).contains(&score));
        if sims.is_empty() {
            prop_assert_eq!(score, 0.0);
        } else {
            // At least 80% of the best neighbor survives aggregation
            let max = sims.iter().cloned().fold(0.0f32, f32::max) as f64;
            prop_assert!(score >= max * 0.8 - 1e-9);
        }
    }
}

#[test]
fn embedding_survives_index_round_trip() {
    let generator = EmbeddingGenerator::new();
    let index = AnnIndex::new();
    let texts = [
        ("a", "Dark matter halo formation in simulations"),
        ("b", "Stellar feedback and galaxy quenching"),
        ("c", "Gravitational wave detection methods"),
    ];
    for (id, text) in &texts {
        index.add(id, &generator.embed(text));
    }
    // The query vector equals an indexed vector, so it must come back first
    let results = index.search(&generator.embed(texts[1].1), 1);
    assert_eq!(results[0].document_id, "b");
    assert!(results[0].similarity > 0.999);
}

#[test]
fn reindexing_changed_documents_updates_results() {
    let engine = SimilarityEngine::new(EmbeddingGenerator::new());
    let v1 = vec![
        Document::new("a", "Dark matter halo formation"),
        Document::new("b", "Dark matter substructure"),
    ];
    assert_eq!(engine.index_documents(&v1), 2);

    // The store mutates: one document is gone, another appears
    engine.mark_stale();
    let v2 = vec![
        Document::new("a", "Dark matter halo formation"),
        Document::new("c", "Dark matter annihilation signals"),
    ];
    engine.ensure_fresh(&v2);
    assert_eq!(engine.indexed_count(), 2);

    let results = engine.find_similar(&v2[0], 5);
    assert!(results.iter().any(|r| r.document_id == "c"));
    assert!(results.iter().all(|r| r.document_id != "b"));
}

#[test]
fn documents_without_signal_are_skipped() {
    let engine = SimilarityEngine::new(EmbeddingGenerator::new());
    let docs = vec![
        Document::new("real", "Reionization history of the universe"),
        Document::new("blank", ""),
    ];
    assert_eq!(engine.index_documents(&docs), 1);
    assert_eq!(engine.indexed_count(), 1);
}

#[test]
fn index_metadata_survives_disk_round_trip() {
    let generator = EmbeddingGenerator::new();
    let index = AnnIndex::new();
    index.add("a", &generator.embed("Dark matter halo formation"));
    index.add("b", &generator.embed("Stellar feedback and quenching"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.meta");
    std::fs::write(&path, index.save_metadata().unwrap()).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let (ids, config): (Vec<String>, imrec_core::AnnIndexConfig) =
        bincode::deserialize(&bytes).unwrap();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(config.max_connections, index.config().max_connections);
}

#[test]
fn pairwise_similarity_tracks_shared_vocabulary() {
    let engine = SimilarityEngine::new(EmbeddingGenerator::new());
    let a = Document::new("a", "Dark matter halo formation");
    let b = Document::new("b", "Dark matter halo substructure");
    let c = Document::new("c", "Medieval French cooking techniques");
    assert!(engine.pairwise_similarity(&a, &b) > engine.pairwise_similarity(&a, &c));
    assert!((engine.pairwise_similarity(&a, &a) - 1.0).abs() < 1e-5);
}
