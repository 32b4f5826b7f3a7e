//! Feature types for recommendation scoring

use serde::{Deserialize, Serialize};

/// The closed set of scoring signals.
///
/// Raw feature values are nominally in [-1, 1]; penalties are negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureType {
    // Explicit signals
    AuthorStarred,
    TopicMatch,
    TagMatch,
    MutedAuthor,
    MutedCategory,
    MutedVenue,

    // Behavioral signals
    KeepRateAuthor,
    KeepRateVenue,
    DismissRateAuthor,
    ReadingTimeTopic,
    PdfDownloadAuthor,

    // Content signals
    CitationOverlap,
    AuthorCoauthorship,
    VenueFrequency,
    Recency,
    CitationVelocity,
    SmartSearchMatch,
    LibrarySimilarity,
}

/// Signal category for a feature
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureCategory {
    Explicit,
    Behavioral,
    Content,
}

impl FeatureType {
    /// All feature types, for iteration
    pub const ALL: [FeatureType; 18] = [
        FeatureType::AuthorStarred,
        FeatureType::TopicMatch,
        FeatureType::TagMatch,
        FeatureType::MutedAuthor,
        FeatureType::MutedCategory,
        FeatureType::MutedVenue,
        FeatureType::KeepRateAuthor,
        FeatureType::KeepRateVenue,
        FeatureType::DismissRateAuthor,
        FeatureType::ReadingTimeTopic,
        FeatureType::PdfDownloadAuthor,
        FeatureType::CitationOverlap,
        FeatureType::AuthorCoauthorship,
        FeatureType::VenueFrequency,
        FeatureType::Recency,
        FeatureType::CitationVelocity,
        FeatureType::SmartSearchMatch,
        FeatureType::LibrarySimilarity,
    ];

    /// Default scoring weight, before user overrides
    pub fn default_weight(&self) -> f64 {
        match self {
            FeatureType::AuthorStarred => 1.0,
            FeatureType::TopicMatch => 0.8,
            FeatureType::TagMatch => 0.6,
            FeatureType::MutedAuthor => 2.0,
            FeatureType::MutedCategory => 1.5,
            FeatureType::MutedVenue => 1.5,
            FeatureType::KeepRateAuthor => 0.7,
            FeatureType::KeepRateVenue => 0.5,
            FeatureType::DismissRateAuthor => 1.0,
            FeatureType::ReadingTimeTopic => 0.4,
            FeatureType::PdfDownloadAuthor => 0.5,
            FeatureType::CitationOverlap => 0.3,
            FeatureType::AuthorCoauthorship => 0.6,
            FeatureType::VenueFrequency => 0.4,
            FeatureType::Recency => 0.5,
            FeatureType::CitationVelocity => 0.4,
            FeatureType::SmartSearchMatch => 0.6,
            FeatureType::LibrarySimilarity => 1.0,
        }
    }

    /// Whether this feature is a penalty (produces values <= 0)
    pub fn is_penalty(&self) -> bool {
        matches!(
            self,
            FeatureType::MutedAuthor
                | FeatureType::MutedCategory
                | FeatureType::MutedVenue
                | FeatureType::DismissRateAuthor
        )
    }

    /// Which signal family this feature belongs to
    pub fn category(&self) -> FeatureCategory {
        match self {
            FeatureType::AuthorStarred
            | FeatureType::TopicMatch
            | FeatureType::TagMatch
            | FeatureType::MutedAuthor
            | FeatureType::MutedCategory
            | FeatureType::MutedVenue => FeatureCategory::Explicit,
            FeatureType::KeepRateAuthor
            | FeatureType::KeepRateVenue
            | FeatureType::DismissRateAuthor
            | FeatureType::ReadingTimeTopic
            | FeatureType::PdfDownloadAuthor => FeatureCategory::Behavioral,
            FeatureType::CitationOverlap
            | FeatureType::AuthorCoauthorship
            | FeatureType::VenueFrequency
            | FeatureType::Recency
            | FeatureType::CitationVelocity
            | FeatureType::SmartSearchMatch
            | FeatureType::LibrarySimilarity => FeatureCategory::Content,
        }
    }

    /// Human-readable name used in score explanations
    pub fn display_name(&self) -> &'static str {
        match self {
            FeatureType::AuthorStarred => "starred author",
            FeatureType::TopicMatch => "topic match",
            FeatureType::TagMatch => "tag match",
            FeatureType::MutedAuthor => "muted author",
            FeatureType::MutedCategory => "muted category",
            FeatureType::MutedVenue => "muted venue",
            FeatureType::KeepRateAuthor => "frequently kept author",
            FeatureType::KeepRateVenue => "frequently kept venue",
            FeatureType::DismissRateAuthor => "often dismissed author",
            FeatureType::ReadingTimeTopic => "reading history",
            FeatureType::PdfDownloadAuthor => "downloaded author",
            FeatureType::CitationOverlap => "citation overlap",
            FeatureType::AuthorCoauthorship => "co-author in library",
            FeatureType::VenueFrequency => "familiar venue",
            FeatureType::Recency => "recent",
            FeatureType::CitationVelocity => "highly cited",
            FeatureType::SmartSearchMatch => "smart search match",
            FeatureType::LibrarySimilarity => "similar to your library",
        }
    }

    /// Stable key used in flat settings maps (`weight.<key>`)
    pub fn settings_key(&self) -> &'static str {
        match self {
            FeatureType::AuthorStarred => "author_starred",
            FeatureType::TopicMatch => "topic_match",
            FeatureType::TagMatch => "tag_match",
            FeatureType::MutedAuthor => "muted_author",
            FeatureType::MutedCategory => "muted_category",
            FeatureType::MutedVenue => "muted_venue",
            FeatureType::KeepRateAuthor => "keep_rate_author",
            FeatureType::KeepRateVenue => "keep_rate_venue",
            FeatureType::DismissRateAuthor => "dismiss_rate_author",
            FeatureType::ReadingTimeTopic => "reading_time_topic",
            FeatureType::PdfDownloadAuthor => "pdf_download_author",
            FeatureType::CitationOverlap => "citation_overlap",
            FeatureType::AuthorCoauthorship => "author_coauthorship",
            FeatureType::VenueFrequency => "venue_frequency",
            FeatureType::Recency => "recency",
            FeatureType::CitationVelocity => "citation_velocity",
            FeatureType::SmartSearchMatch => "smart_search_match",
            FeatureType::LibrarySimilarity => "library_similarity",
        }
    }
}
