//! Feature extraction for recommendation scoring.
//!
//! Pure computation: one candidate document against a learned profile and
//! the user's library context. No I/O except the injected mute list. The
//! `LibrarySimilarity` feature is always 0.0 here; the engine injects it
//! after the ANN lookup so this module stays independent of the index.

use std::collections::{HashMap, HashSet};

use imrec_domain::{Document, FeatureType, MutedItems, Profile};

use crate::text::extract_keywords;

/// Pre-aggregated library state used by content features
#[derive(Debug, Clone)]
pub struct LibraryContext {
    /// Lowercased author family names present in the library
    pub library_author_names: HashSet<String>,
    /// Lowercased venue name -> count in library
    pub venue_counts: HashMap<String, i32>,
    /// Current year for recency calculation
    pub current_year: i32,
}

impl Default for LibraryContext {
    fn default() -> Self {
        Self {
            library_author_names: HashSet::new(),
            venue_counts: HashMap::new(),
            current_year: 2026,
        }
    }
}

impl LibraryContext {
    /// Aggregate a document set into the context scoring needs
    pub fn from_documents(documents: &[Document], current_year: i32) -> Self {
        let mut library_author_names = HashSet::new();
        let mut venue_counts: HashMap<String, i32> = HashMap::new();
        for doc in documents {
            for author in &doc.authors {
                library_author_names.insert(author.to_lowercase());
            }
            if let Some(ref venue) = doc.venue {
                *venue_counts.entry(venue.to_lowercase()).or_insert(0) += 1;
            }
        }
        Self {
            library_author_names,
            venue_counts,
            current_year,
        }
    }
}

/// Extract the total feature vector for one candidate document.
///
/// Every variant of [`FeatureType`] is present in the result.
pub fn extract_features(
    doc: &Document,
    profile: &Profile,
    library: &LibraryContext,
    muted: &MutedItems,
) -> HashMap<FeatureType, f64> {
    let mut features = HashMap::new();

    // Explicit signals
    features.insert(
        FeatureType::AuthorStarred,
        author_affinity_score(&doc.authors, profile),
    );
    features.insert(
        FeatureType::TopicMatch,
        topic_match_score(&doc.title, profile),
    );
    features.insert(FeatureType::TagMatch, tag_match_score(&doc.tags, profile));
    features.insert(
        FeatureType::MutedAuthor,
        muted_author_penalty(&doc.authors, muted),
    );
    features.insert(
        FeatureType::MutedCategory,
        muted_category_penalty(&doc.tags, muted),
    );
    features.insert(
        FeatureType::MutedVenue,
        muted_venue_penalty(doc.venue.as_deref(), muted),
    );

    // Behavioral signals
    features.insert(
        FeatureType::KeepRateAuthor,
        keep_rate_author_score(&doc.authors, profile),
    );
    features.insert(
        FeatureType::KeepRateVenue,
        keep_rate_venue_score(doc.venue.as_deref(), profile),
    );
    features.insert(
        FeatureType::DismissRateAuthor,
        dismiss_rate_author_penalty(&doc.authors, profile),
    );
    features.insert(
        FeatureType::ReadingTimeTopic,
        reading_time_topic_score(&doc.title, profile),
    );
    features.insert(
        FeatureType::PdfDownloadAuthor,
        pdf_download_author_score(&doc.authors, profile),
    );

    // Content signals
    features.insert(
        FeatureType::AuthorCoauthorship,
        coauthorship_score(&doc.authors, library),
    );
    features.insert(
        FeatureType::VenueFrequency,
        venue_frequency_score(doc.venue.as_deref(), library),
    );
    features.insert(FeatureType::Recency, recency_score(doc.year, library));
    features.insert(
        FeatureType::CitationVelocity,
        citation_velocity_score(doc.citation_count, doc.year, library),
    );
    features.insert(
        FeatureType::SmartSearchMatch,
        if doc.in_smart_search { 1.0 } else { 0.0 },
    );

    // Injected by the engine after the async embedding lookup
    features.insert(FeatureType::LibrarySimilarity, 0.0);

    // Placeholder: needs a citation graph the core does not have
    features.insert(FeatureType::CitationOverlap, 0.0);

    features
}

// MARK: - Explicit signals

/// Maximum author affinity across the candidate's authors, tanh-squashed
fn author_affinity_score(authors: &[String], profile: &Profile) -> f64 {
    let mut max_affinity: f64 = 0.0;
    for author in authors {
        if let Some(&affinity) = profile.author_affinities.get(&author.to_lowercase()) {
            max_affinity = max_affinity.max(affinity);
        }
    }
    max_affinity.tanh()
}

/// Mean topic affinity over the title's keywords
fn topic_match_score(title: &str, profile: &Profile) -> f64 {
    let keywords = extract_keywords(title);
    if keywords.is_empty() {
        return 0.0;
    }

    let mut topic_score: f64 = 0.0;
    for keyword in &keywords {
        if let Some(&affinity) = profile.topic_affinities.get(keyword) {
            topic_score += affinity;
        }
    }

    (topic_score / keywords.len() as f64).tanh()
}

/// Mean topic affinity over the candidate's tags
fn tag_match_score(tags: &[String], profile: &Profile) -> f64 {
    if tags.is_empty() {
        return 0.0;
    }

    let mut total_affinity: f64 = 0.0;
    for tag in tags {
        if let Some(&affinity) = profile.topic_affinities.get(&tag.to_lowercase()) {
            total_affinity += affinity;
        }
    }

    (total_affinity / tags.len() as f64).tanh()
}

/// Hard veto: -1.0 on exact case-insensitive match, never blended
fn muted_author_penalty(authors: &[String], muted: &MutedItems) -> f64 {
    let muted_authors: HashSet<&str> = muted.authors.iter().map(|s| s.as_str()).collect();
    for author in authors {
        if muted_authors.contains(author.to_lowercase().as_str()) {
            return -1.0;
        }
    }
    0.0
}

fn muted_category_penalty(tags: &[String], muted: &MutedItems) -> f64 {
    let muted_cats: HashSet<&str> = muted.categories.iter().map(|s| s.as_str()).collect();
    for tag in tags {
        if muted_cats.contains(tag.to_lowercase().as_str()) {
            return -1.0;
        }
    }
    0.0
}

fn muted_venue_penalty(venue: Option<&str>, muted: &MutedItems) -> f64 {
    let muted_venues: HashSet<&str> = muted.venues.iter().map(|s| s.as_str()).collect();
    if let Some(v) = venue {
        if muted_venues.contains(v.to_lowercase().as_str()) {
            return -1.0;
        }
    }
    0.0
}

// MARK: - Behavioral signals

/// Maximum positive author affinity, tanh-squashed
fn keep_rate_author_score(authors: &[String], profile: &Profile) -> f64 {
    let mut max_affinity: f64 = 0.0;
    for author in authors {
        if let Some(&affinity) = profile.author_affinities.get(&author.to_lowercase()) {
            if affinity > 0.0 {
                max_affinity = max_affinity.max(affinity);
            }
        }
    }
    max_affinity.tanh()
}

fn keep_rate_venue_score(venue: Option<&str>, profile: &Profile) -> f64 {
    if let Some(v) = venue {
        if let Some(&affinity) = profile.venue_affinities.get(&v.to_lowercase()) {
            if affinity > 0.0 {
                return affinity.tanh();
            }
        }
    }
    0.0
}

/// Minimum negative author affinity, tanh-squashed (a penalty)
fn dismiss_rate_author_penalty(authors: &[String], profile: &Profile) -> f64 {
    let mut min_affinity: f64 = 0.0;
    for author in authors {
        if let Some(&affinity) = profile.author_affinities.get(&author.to_lowercase()) {
            if affinity < 0.0 {
                min_affinity = min_affinity.min(affinity);
            }
        }
    }
    if min_affinity < 0.0 {
        min_affinity.tanh()
    } else {
        0.0
    }
}

/// Mean positive topic affinity over title keywords
fn reading_time_topic_score(title: &str, profile: &Profile) -> f64 {
    let keywords = extract_keywords(title);
    if keywords.is_empty() {
        return 0.0;
    }

    let mut total_affinity: f64 = 0.0;
    for keyword in &keywords {
        if let Some(&affinity) = profile.topic_affinities.get(keyword) {
            if affinity > 0.0 {
                total_affinity += affinity;
            }
        }
    }

    (total_affinity / keywords.len() as f64).tanh()
}

/// Download behavior tracks keep behavior at a discount
fn pdf_download_author_score(authors: &[String], profile: &Profile) -> f64 {
    keep_rate_author_score(authors, profile) * 0.8
}

// MARK: - Content signals

/// Fraction of the candidate's authors already present in the library
fn coauthorship_score(authors: &[String], library: &LibraryContext) -> f64 {
    if authors.is_empty() {
        return 0.0;
    }

    let match_count = authors
        .iter()
        .filter(|a| library.library_author_names.contains(&a.to_lowercase()))
        .count();

    match_count as f64 / authors.len() as f64
}

/// Diminishing returns after ~5 library papers from the same venue
fn venue_frequency_score(venue: Option<&str>, library: &LibraryContext) -> f64 {
    if let Some(v) = venue {
        if let Some(&count) = library.venue_counts.get(&v.to_lowercase()) {
            return (count as f64 / 5.0).tanh();
        }
    }
    0.0
}

/// Exponential decay with age; unknown year gets a neutral score
pub fn recency_score(year: Option<i32>, library: &LibraryContext) -> f64 {
    match year {
        Some(y) if y > 0 => {
            let age = library.current_year - y;
            (-age as f64 / 2.0).exp()
        }
        _ => 0.5,
    }
}

/// Citations per year, normalized so ~10/year saturates
pub fn citation_velocity_score(
    citation_count: i32,
    year: Option<i32>,
    library: &LibraryContext,
) -> f64 {
    if citation_count <= 0 {
        return 0.0;
    }

    match year {
        Some(y) if y > 0 => {
            let age = (library.current_year - y).max(1) as f64;
            let velocity = citation_count as f64 / age;
            (velocity / 10.0).tanh()
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> LibraryContext {
        LibraryContext {
            current_year: 2026,
            ..Default::default()
        }
    }

    #[test]
    fn test_recency_score() {
        // Current year should be ~1.0
        assert!(recency_score(Some(2026), &library()) > 0.9);
        // 1 year old should be ~0.6
        let one_year = recency_score(Some(2025), &library());
        assert!(one_year > 0.5 && one_year < 0.7);
        // 2 years old should be ~0.37
        let two_years = recency_score(Some(2024), &library());
        assert!(two_years > 0.3 && two_years < 0.4);
        // Unknown year gets neutral score
        assert!((recency_score(None, &library()) - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_citation_velocity_score() {
        // 10 citations in 1 year = high velocity
        assert!(citation_velocity_score(10, Some(2025), &library()) > 0.7);
        // 10 citations in 5 years = moderate velocity
        let moderate = citation_velocity_score(10, Some(2021), &library());
        assert!(moderate > 0.1 && moderate < 0.3);
        // Zero citations = zero score
        assert_eq!(citation_velocity_score(0, Some(2025), &library()), 0.0);
        // No year = zero score even with citations
        assert_eq!(citation_velocity_score(50, None, &library()), 0.0);
    }

    #[test]
    fn test_muted_author_overrides_positive_affinity() {
        let mut profile = Profile::new();
        profile.author_affinities.insert("smith".to_string(), 4.0);
        let muted = MutedItems {
            authors: vec!["smith".to_string()],
            ..Default::default()
        };
        let doc = Document::new("d1", "Some Paper").with_authors(vec!["Smith".to_string()]);

        let features = extract_features(&doc, &profile, &library(), &muted);
        assert_eq!(features[&FeatureType::MutedAuthor], -1.0);
        // The positive affinity still shows through its own feature
        assert!(features[&FeatureType::AuthorStarred] > 0.9);
    }

    #[test]
    fn test_author_affinity_uses_max() {
        let mut profile = Profile::new();
        profile.author_affinities.insert("smith".to_string(), 0.5);
        profile.author_affinities.insert("jones".to_string(), 2.0);
        let authors = vec!["Smith".to_string(), "Jones".to_string()];
        let score = author_affinity_score(&authors, &profile);
        assert!((score - 2.0_f64.tanh()).abs() < 1e-9);
    }

    #[test]
    fn test_dismiss_rate_uses_min_negative() {
        let mut profile = Profile::new();
        profile.author_affinities.insert("smith".to_string(), -1.5);
        profile.author_affinities.insert("jones".to_string(), 0.8);
        let authors = vec!["Smith".to_string(), "Jones".to_string()];
        let penalty = dismiss_rate_author_penalty(&authors, &profile);
        assert!((penalty - (-1.5_f64).tanh()).abs() < 1e-9);
    }

    #[test]
    fn test_coauthorship_fraction() {
        let docs = vec![
            Document::new("a", "A").with_authors(vec!["Smith".to_string()]),
            Document::new("b", "B").with_authors(vec!["Jones".to_string()]),
        ];
        let library = LibraryContext::from_documents(&docs, 2026);
        let candidate = vec!["Smith".to_string(), "Unknown".to_string()];
        assert_eq!(coauthorship_score(&candidate, &library), 0.5);
    }

    #[test]
    fn test_venue_frequency_diminishing_returns() {
        let mut library = library();
        library.venue_counts.insert("nature".to_string(), 3);
        let low = venue_frequency_score(Some("Nature"), &library);
        library.venue_counts.insert("nature".to_string(), 30);
        let high = venue_frequency_score(Some("Nature"), &library);
        assert!(low < high);
        assert!(high <= 1.0);
    }

    #[test]
    fn test_every_feature_present() {
        let doc = Document::new("d1", "Any Title");
        let features = extract_features(
            &doc,
            &Profile::new(),
            &library(),
            &MutedItems::default(),
        );
        for feature in FeatureType::ALL {
            assert!(features.contains_key(&feature), "missing {feature:?}");
        }
        // Similarity is injected later; extractor leaves it at zero
        assert_eq!(features[&FeatureType::LibrarySimilarity], 0.0);
    }
}
