//! The recommendation engine: composes feature extraction, the online
//! learner, and the similarity engine into scores, rankings, and
//! explanations.
//!
//! Scoring never fails: missing documents, profiles, or index data all
//! degrade to neutral signal. Storage writes are the one place errors
//! reach the caller.

use chrono::{Datelike, Utc};
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Receiver;
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use imrec_domain::{
    Document, EngineMode, FeatureType, MutedItems, Profile, Settings, TrainingAction,
    TrainingEvent,
};

use crate::bootstrap::ColdStartBootstrap;
use crate::context::EngineContext;
use crate::embedding::{AnnSimilarityResult, SimilarityEngine};
use crate::error::RecommendError;
use crate::events::{InvalidationBroadcaster, InvalidationEvent};
use crate::features::{extract_features, LibraryContext};
use crate::signals::SignalCollector;

/// How long a cached document score stays valid
pub const SCORE_CACHE_TTL: Duration = Duration::from_secs(300);

/// Contributions below this are left out of explanations
const EXPLANATION_THRESHOLD: f64 = 0.1;

/// Maximum candidates held in the serendipity pool
const SERENDIPITY_POOL_CAP: usize = 10;

/// Library id used when a document does not carry one
const DEFAULT_LIBRARY: &str = "default";

/// A scored recommendation with its per-feature breakdown
#[derive(Clone, Debug)]
pub struct RecommendationScore {
    pub total: f64,
    pub breakdown: HashMap<FeatureType, f64>,
    pub explanation: String,
    pub is_serendipity: bool,
}

impl RecommendationScore {
    /// Zero score with an explanatory string, for lookup misses
    fn not_found(document_id: &str) -> Self {
        Self {
            total: 0.0,
            breakdown: HashMap::new(),
            explanation: format!("Document not found: {document_id}"),
            is_serendipity: false,
        }
    }

    fn disabled() -> Self {
        Self {
            total: 0.0,
            breakdown: HashMap::new(),
            explanation: "Ranking disabled".to_string(),
            is_serendipity: false,
        }
    }
}

/// One entry of a ranking result
#[derive(Clone, Debug)]
pub struct RankedDocument {
    pub document_id: String,
    pub score: RecommendationScore,
}

type RankCacheEntry = (Vec<String>, Vec<RankedDocument>, Instant);

/// Orchestrates scoring, ranking, training, and index management
pub struct RecommendationEngine {
    ctx: EngineContext,
    similarity: SimilarityEngine,
    bootstrap: ColdStartBootstrap,
    collector: Mutex<SignalCollector>,
    profiles: Mutex<HashMap<String, Profile>>,
    /// Libraries last passed to build_index; stale rebuilds cover them all
    indexed_libraries: RwLock<Vec<String>>,
    settings: RwLock<Settings>,
    score_cache: Mutex<HashMap<String, (RecommendationScore, Instant)>>,
    rank_cache: Mutex<Option<RankCacheEntry>>,
    score_cache_ttl: Duration,
    broadcaster: InvalidationBroadcaster,
}

impl RecommendationEngine {
    pub fn new(ctx: EngineContext, similarity: SimilarityEngine) -> Self {
        let settings = ctx.load_settings();
        Self {
            ctx,
            similarity,
            bootstrap: ColdStartBootstrap::new(),
            collector: Mutex::new(SignalCollector::new()),
            profiles: Mutex::new(HashMap::new()),
            indexed_libraries: RwLock::new(Vec::new()),
            settings: RwLock::new(settings),
            score_cache: Mutex::new(HashMap::new()),
            rank_cache: Mutex::new(None),
            score_cache_ttl: SCORE_CACHE_TTL,
            broadcaster: InvalidationBroadcaster::new(),
        }
    }

    // MARK: - Scoring

    /// Score one document. Never fails: lookup misses yield a zero score
    /// with an explanatory string.
    pub fn score(&self, document_id: &str) -> RecommendationScore {
        if let Some(cached) = self.cached_score(document_id) {
            return cached;
        }

        let doc = match self.ctx.documents.document_detail(document_id) {
            Ok(Some(doc)) => doc,
            Ok(None) => return RecommendationScore::not_found(document_id),
            Err(e) => {
                warn!(document = document_id, error = %e, "document lookup failed");
                return RecommendationScore::not_found(document_id);
            }
        };

        let library_id = self.library_of(&doc);
        let library_docs = self.library_documents(&library_id);
        let library = LibraryContext::from_documents(&library_docs, Utc::now().year());
        let muted = self.ctx.muted_items();
        let settings = self.settings.read().unwrap().clone();

        // Scoring waits on a fresh index when the document set changed
        self.refresh_index(&library_id);

        let score = self.with_profile(&library_id, |profile| {
            self.score_document(&doc, profile, &library, &muted, &settings)
        });

        self.score_cache
            .lock()
            .unwrap()
            .insert(document_id.to_string(), (score.clone(), Instant::now()));
        score
    }

    fn score_document(
        &self,
        doc: &Document,
        profile: &Profile,
        library: &LibraryContext,
        muted: &MutedItems,
        settings: &Settings,
    ) -> RecommendationScore {
        let mut features = extract_features(doc, profile, library, muted);

        // Inject similarity after the ANN lookup; the extractor left it 0
        if settings.mode != EngineMode::Classic {
            features.insert(
                FeatureType::LibrarySimilarity,
                self.similarity.library_similarity(doc),
            );
        }

        let mut total = 0.0;
        let mut breakdown = HashMap::new();
        for (&feature, &raw) in &features {
            let contribution = raw * effective_weight(settings, feature);
            breakdown.insert(feature, contribution);
            total += contribution;
        }

        let explanation = explain(&breakdown, settings.mode);
        RecommendationScore {
            total,
            breakdown,
            explanation,
            is_serendipity: false,
        }
    }

    /// Rank candidates best-first with serendipity injection.
    ///
    /// Always produces an ordering: unknown ids rank with zero scores, and
    /// a disabled engine returns the input order unchanged.
    pub fn rank(&self, document_ids: &[String]) -> Vec<RankedDocument> {
        let settings = self.settings.read().unwrap().clone();
        if !settings.enabled {
            return document_ids
                .iter()
                .map(|id| RankedDocument {
                    document_id: id.clone(),
                    score: RecommendationScore::disabled(),
                })
                .collect();
        }

        if let Some(cached) = self.cached_rank(document_ids, &settings) {
            return cached;
        }

        let mut ranked: Vec<RankedDocument> = document_ids
            .iter()
            .map(|id| RankedDocument {
                document_id: id.clone(),
                score: self.score(id),
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total.total_cmp(&a.score.total));

        let result = inject_serendipity(ranked, &settings);

        *self.rank_cache.lock().unwrap() =
            Some((document_ids.to_vec(), result.clone(), Instant::now()));
        result
    }

    // MARK: - Training

    /// Record a user action on a document, training the profile.
    ///
    /// Returns the created event, or None when the action was deduplicated.
    pub fn record_action(
        &self,
        document_id: &str,
        action: TrainingAction,
    ) -> Result<Option<TrainingEvent>, RecommendError> {
        let doc = self
            .ctx
            .documents
            .document_detail(document_id)?
            .ok_or_else(|| RecommendError::DocumentNotFound(document_id.to_string()))?;
        let library_id = self.library_of(&doc);

        let event = self.with_profile(&library_id, |profile| {
            self.collector
                .lock()
                .unwrap()
                .record(profile, &doc, action, Utc::now())
        });

        if event.is_some() {
            self.persist_profile(&library_id)?;
            self.after_training();
        }
        Ok(event)
    }

    /// Apply a pre-built training event
    pub fn train(&self, event: &TrainingEvent) -> Result<(), RecommendError> {
        let library_id = self.library_for_document_id(&event.document_id);
        self.with_profile(&library_id, |profile| {
            self.collector.lock().unwrap().train(profile, event);
        });
        self.persist_profile(&library_id)?;
        self.after_training();
        Ok(())
    }

    /// Undo a previously applied training event
    pub fn undo_training(&self, event: &TrainingEvent) -> Result<(), RecommendError> {
        let library_id = self.library_for_document_id(&event.document_id);
        self.with_profile(&library_id, |profile| {
            self.collector.lock().unwrap().undo(profile, &event.id)
        })?;
        self.persist_profile(&library_id)?;
        self.after_training();
        Ok(())
    }

    /// Decay stale negative affinities and prune noise entries
    pub fn run_maintenance(&self, library_id: &str) -> Result<(), RecommendError> {
        let decay_days = self.settings.read().unwrap().negative_decay_days;
        let learner = crate::learner::OnlineLearner::new();
        let changed = self.with_profile(library_id, |profile| {
            let decayed = learner.decay_negative(profile, Utc::now(), decay_days);
            let pruned = learner.prune(profile);
            decayed || pruned > 0
        });
        if changed {
            self.persist_profile(library_id)?;
            self.after_training();
        }
        Ok(())
    }

    /// Seed a cold-start profile from the library's own content
    pub fn bootstrap_profile(&self, library_id: &str) -> Result<bool, RecommendError> {
        let documents = self.ctx.documents.query_documents(library_id)?;
        let muted = self.ctx.muted_items();
        let saved_queries = self.ctx.smart_searches.saved_search_queries();

        let ran = self.with_profile(library_id, |profile| {
            self.bootstrap.run(profile, &documents, &muted, &saved_queries)
        });
        if ran {
            self.persist_profile(library_id)?;
            self.after_training();
        }
        Ok(ran)
    }

    // MARK: - Similarity surface

    /// Embed and index the documents of the given libraries.
    /// Returns the number of documents indexed.
    pub fn build_index(&self, library_ids: &[String]) -> Result<usize, RecommendError> {
        let mut documents = Vec::new();
        for library_id in library_ids {
            documents.extend(self.ctx.documents.query_documents(library_id)?);
        }
        let count = self.similarity.index_documents(&documents);
        *self.indexed_libraries.write().unwrap() = library_ids.to_vec();
        self.score_cache.lock().unwrap().clear();
        *self.rank_cache.lock().unwrap() = None;
        self.broadcaster.broadcast(InvalidationEvent::IndexRebuilt);
        info!(libraries = library_ids.len(), indexed = count, "built index");
        Ok(count)
    }

    /// Top-K indexed documents most similar to the given one
    pub fn find_similar(
        &self,
        document_id: &str,
        top_k: usize,
    ) -> Result<Vec<AnnSimilarityResult>, RecommendError> {
        let doc = self
            .ctx
            .documents
            .document_detail(document_id)?
            .ok_or_else(|| RecommendError::DocumentNotFound(document_id.to_string()))?;
        self.refresh_index(&self.library_of(&doc));
        Ok(self.similarity.find_similar(&doc, top_k))
    }

    /// Profile-independent: candidates closest to a library's centroid
    pub fn group_recommendations(
        &self,
        library_id: &str,
        candidate_ids: &[String],
        top_k: usize,
    ) -> Result<Vec<String>, RecommendError> {
        let reference = self.ctx.documents.query_documents(library_id)?;
        let Some(centroid) = self.similarity.centroid(&reference) else {
            return Ok(Vec::new());
        };
        let mut candidates = Vec::new();
        for id in candidate_ids {
            if let Some(doc) = self.ctx.documents.document_detail(id)? {
                candidates.push(doc);
            }
        }
        Ok(self.similarity.rank_by_centroid(&centroid, &candidates, top_k))
    }

    // MARK: - Settings & invalidation

    pub fn settings(&self) -> Settings {
        self.settings.read().unwrap().clone()
    }

    /// Replace settings, persist them, and drop derived caches
    pub fn update_settings(&self, settings: Settings) -> Result<(), RecommendError> {
        self.ctx.settings.save_settings(settings.to_map())?;
        *self.settings.write().unwrap() = settings;
        self.score_cache.lock().unwrap().clear();
        *self.rank_cache.lock().unwrap() = None;
        self.broadcaster
            .broadcast(InvalidationEvent::SettingsChanged);
        Ok(())
    }

    /// The host signals that the external document store changed
    pub fn notify_store_mutated(&self) {
        self.similarity.mark_stale();
        self.score_cache.lock().unwrap().clear();
        *self.rank_cache.lock().unwrap() = None;
        self.broadcaster.broadcast(InvalidationEvent::StoreMutated);
    }

    /// Explicit cache drop without marking the index stale
    pub fn invalidate_caches(&self) {
        self.similarity.clear_cache();
        self.score_cache.lock().unwrap().clear();
        *self.rank_cache.lock().unwrap() = None;
    }

    /// Observe cache-invalidating mutations
    pub fn subscribe_invalidations(&self) -> Receiver<InvalidationEvent> {
        self.broadcaster.subscribe()
    }

    // MARK: - Internals

    fn after_training(&self) {
        self.score_cache.lock().unwrap().clear();
        *self.rank_cache.lock().unwrap() = None;
        self.broadcaster
            .broadcast(InvalidationEvent::ProfileTrained);
    }

    fn cached_score(&self, document_id: &str) -> Option<RecommendationScore> {
        let cache = self.score_cache.lock().unwrap();
        let (score, at) = cache.get(document_id)?;
        (at.elapsed() < self.score_cache_ttl).then(|| score.clone())
    }

    fn cached_rank(
        &self,
        document_ids: &[String],
        settings: &Settings,
    ) -> Option<Vec<RankedDocument>> {
        let throttle = Duration::from_secs(settings.rerank_throttle_minutes.max(0) as u64 * 60);
        let cache = self.rank_cache.lock().unwrap();
        let (ids, result, at) = cache.as_ref()?;
        (ids == document_ids && at.elapsed() < throttle).then(|| result.clone())
    }

    fn library_of(&self, doc: &Document) -> String {
        doc.library_id
            .clone()
            .unwrap_or_else(|| DEFAULT_LIBRARY.to_string())
    }

    fn library_for_document_id(&self, document_id: &str) -> String {
        match self.ctx.documents.document_detail(document_id) {
            Ok(Some(doc)) => self.library_of(&doc),
            _ => DEFAULT_LIBRARY.to_string(),
        }
    }

    fn library_documents(&self, library_id: &str) -> Vec<Document> {
        self.ctx
            .documents
            .query_documents(library_id)
            .unwrap_or_default()
    }

    /// Rebuild a stale index from every library it covered, not just the
    /// one the current query touches. Falls back to the given library
    /// when no explicit build happened yet.
    fn refresh_index(&self, fallback_library: &str) {
        if !self.similarity.is_stale() {
            return;
        }
        let libraries = self.indexed_libraries.read().unwrap().clone();
        let documents = if libraries.is_empty() {
            self.library_documents(fallback_library)
        } else {
            let mut documents = Vec::new();
            for library_id in &libraries {
                documents.extend(self.library_documents(library_id));
            }
            documents
        };
        self.similarity.ensure_fresh(&documents);
    }

    /// Run a closure against the (lazily created) profile for a library
    fn with_profile<R>(&self, library_id: &str, f: impl FnOnce(&mut Profile) -> R) -> R {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .entry(library_id.to_string())
            .or_insert_with(|| self.load_profile(library_id));
        f(profile)
    }

    fn load_profile(&self, library_id: &str) -> Profile {
        match self.ctx.profiles.load_profile(library_id) {
            Ok(Some(json)) => Profile::from_json(&json).unwrap_or_else(|e| {
                warn!(library = library_id, error = %e, "corrupt profile, starting cold");
                Profile::new()
            }),
            Ok(None) => Profile::new(),
            Err(e) => {
                warn!(library = library_id, error = %e, "profile load failed, starting cold");
                Profile::new()
            }
        }
    }

    /// Write failures here are not swallowed; training surfaces them
    fn persist_profile(&self, library_id: &str) -> Result<(), RecommendError> {
        let json = self.with_profile(library_id, |profile| profile.to_json())?;
        self.ctx.profiles.save_profile(library_id, &json)
    }
}

/// Mode-adjusted weight for one feature
fn effective_weight(settings: &Settings, feature: FeatureType) -> f64 {
    let weight = settings.weight(feature);
    match settings.mode {
        EngineMode::Classic => {
            if feature == FeatureType::LibrarySimilarity {
                0.0
            } else {
                weight
            }
        }
        EngineMode::Semantic => {
            if feature == FeatureType::LibrarySimilarity {
                weight * 2.0
            } else if feature.is_penalty() {
                weight
            } else {
                weight * 0.5
            }
        }
        EngineMode::Hybrid => weight,
    }
}

/// Human explanation: the top contributing features, mode-annotated
fn explain(breakdown: &HashMap<FeatureType, f64>, mode: EngineMode) -> String {
    let mut contributors: Vec<(FeatureType, f64)> = breakdown
        .iter()
        .filter(|(_, &v)| v > EXPLANATION_THRESHOLD)
        .map(|(&f, &v)| (f, v))
        .collect();
    contributors.sort_by(|a, b| b.1.total_cmp(&a.1));
    contributors.truncate(2);

    let base = if contributors.is_empty() {
        "No strong signals".to_string()
    } else {
        contributors
            .iter()
            .map(|(f, _)| f.display_name())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let similarity = breakdown
        .get(&FeatureType::LibrarySimilarity)
        .copied()
        .unwrap_or(0.0);
    match mode {
        EngineMode::Semantic if similarity > EXPLANATION_THRESHOLD => format!("AI: {base}"),
        EngineMode::Hybrid if similarity > 0.3 => format!("AI-enhanced: {base}"),
        _ => base,
    }
}

/// Splice serendipity picks into a sorted ranking.
///
/// Pool: high-velocity candidates the profile knows little about. One pool
/// item replaces its own position every `frequency` slots, so the output
/// is a permutation of the input.
fn inject_serendipity(ranked: Vec<RankedDocument>, settings: &Settings) -> Vec<RankedDocument> {
    let frequency = settings.serendipity_frequency.max(1);

    let mut pool: Vec<String> = ranked
        .iter()
        .filter(|r| {
            // Recover raw feature values from the weighted breakdown
            let raw = |f: FeatureType| {
                let weight = effective_weight(settings, f);
                if weight == 0.0 {
                    0.0
                } else {
                    r.score.breakdown.get(&f).copied().unwrap_or(0.0) / weight
                }
            };
            raw(FeatureType::CitationVelocity) > 0.3
                && raw(FeatureType::AuthorStarred) < 0.2
                && raw(FeatureType::TopicMatch) < 0.2
        })
        .map(|r| r.document_id.clone())
        .collect();
    pool.shuffle(&mut rand::thread_rng());
    pool.truncate(SERENDIPITY_POOL_CAP);

    if pool.is_empty() {
        return ranked;
    }

    let mut pool_iter = pool.into_iter();
    let mut emitted: HashSet<String> = HashSet::new();
    let mut result: Vec<RankedDocument> = Vec::with_capacity(ranked.len());
    let mut source = ranked.iter();

    while result.len() < ranked.len() {
        let position = result.len() + 1;
        if position % frequency == 0 {
            if let Some(id) = pool_iter.find(|id| !emitted.contains(id)) {
                if let Some(entry) = ranked.iter().find(|r| r.document_id == id) {
                    let mut entry = entry.clone();
                    entry.score.is_serendipity = true;
                    emitted.insert(id);
                    result.push(entry);
                    continue;
                }
            }
        }
        // Next not-yet-emitted item in score order
        for candidate in source.by_ref() {
            if !emitted.contains(&candidate.document_id) {
                emitted.insert(candidate.document_id.clone());
                result.push(candidate.clone());
                break;
            }
        }
        if result.len() < ranked.len() && emitted.len() == ranked.len() {
            break;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_of(total: f64, breakdown: &[(FeatureType, f64)]) -> RecommendationScore {
        RecommendationScore {
            total,
            breakdown: breakdown.iter().copied().collect(),
            explanation: String::new(),
            is_serendipity: false,
        }
    }

    #[test]
    fn test_effective_weight_classic_zeroes_similarity() {
        let mut settings = Settings::default();
        settings.mode = EngineMode::Classic;
        assert_eq!(
            effective_weight(&settings, FeatureType::LibrarySimilarity),
            0.0
        );
        assert_eq!(
            effective_weight(&settings, FeatureType::AuthorStarred),
            FeatureType::AuthorStarred.default_weight()
        );
    }

    #[test]
    fn test_effective_weight_semantic() {
        let mut settings = Settings::default();
        settings.mode = EngineMode::Semantic;
        assert_eq!(
            effective_weight(&settings, FeatureType::LibrarySimilarity),
            FeatureType::LibrarySimilarity.default_weight() * 2.0
        );
        // Positive features halved
        assert_eq!(
            effective_weight(&settings, FeatureType::AuthorStarred),
            FeatureType::AuthorStarred.default_weight() * 0.5
        );
        // Penalties untouched
        assert_eq!(
            effective_weight(&settings, FeatureType::MutedAuthor),
            FeatureType::MutedAuthor.default_weight()
        );
    }

    #[test]
    fn test_explain_top_two() {
        let breakdown: HashMap<FeatureType, f64> = [
            (FeatureType::AuthorStarred, 0.9),
            (FeatureType::Recency, 0.5),
            (FeatureType::TagMatch, 0.2),
            (FeatureType::VenueFrequency, 0.05),
        ]
        .into_iter()
        .collect();
        let text = explain(&breakdown, EngineMode::Hybrid);
        assert!(text.contains("starred author"));
        assert!(text.contains("recent"));
        assert!(!text.contains("tag match"));
    }

    #[test]
    fn test_explain_semantic_prefix() {
        let breakdown: HashMap<FeatureType, f64> =
            [(FeatureType::LibrarySimilarity, 0.8)].into_iter().collect();
        let text = explain(&breakdown, EngineMode::Semantic);
        assert!(text.starts_with("AI: "));
    }

    #[test]
    fn test_explain_hybrid_annotation_threshold() {
        let low: HashMap<FeatureType, f64> =
            [(FeatureType::LibrarySimilarity, 0.2)].into_iter().collect();
        assert!(!explain(&low, EngineMode::Hybrid).starts_with("AI-enhanced"));
        let high: HashMap<FeatureType, f64> =
            [(FeatureType::LibrarySimilarity, 0.5)].into_iter().collect();
        assert!(explain(&high, EngineMode::Hybrid).starts_with("AI-enhanced"));
    }

    #[test]
    fn test_explain_no_signals() {
        let breakdown = HashMap::new();
        assert_eq!(explain(&breakdown, EngineMode::Hybrid), "No strong signals");
    }

    fn serendipity_fixture(n: usize) -> Vec<RankedDocument> {
        (0..n)
            .map(|i| {
                // Half the list qualifies for the pool
                let breakdown: &[(FeatureType, f64)] = if i % 2 == 0 {
                    &[
                        (FeatureType::CitationVelocity, 0.4),
                        (FeatureType::AuthorStarred, 0.0),
                        (FeatureType::TopicMatch, 0.0),
                    ]
                } else {
                    &[(FeatureType::AuthorStarred, 0.9)]
                };
                RankedDocument {
                    document_id: format!("d{i}"),
                    score: score_of(1.0 - i as f64 * 0.01, breakdown),
                }
            })
            .collect()
    }

    #[test]
    fn test_serendipity_slot_count_and_uniqueness() {
        let ranked = serendipity_fixture(20);
        let mut settings = Settings::default();
        settings.serendipity_frequency = 10;
        let result = inject_serendipity(ranked, &settings);
        assert_eq!(result.len(), 20);

        let slots = result.iter().filter(|r| r.score.is_serendipity).count();
        assert!((1..=2).contains(&slots), "expected 1-2 slots, got {slots}");

        let ids: HashSet<&str> = result.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids.len(), 20, "no duplicates allowed");
    }

    #[test]
    fn test_serendipity_empty_pool_is_identity() {
        let ranked: Vec<RankedDocument> = (0..5)
            .map(|i| RankedDocument {
                document_id: format!("d{i}"),
                score: score_of(1.0, &[(FeatureType::AuthorStarred, 0.9)]),
            })
            .collect();
        let mut settings = Settings::default();
        settings.serendipity_frequency = 2;
        let result = inject_serendipity(ranked.clone(), &settings);
        let order: Vec<_> = result.iter().map(|r| r.document_id.clone()).collect();
        let expected: Vec<_> = ranked.iter().map(|r| r.document_id.clone()).collect();
        assert_eq!(order, expected);
    }
}
