//! Cold-start profile bootstrap.
//!
//! Seeds an empty profile from static library content: frequency counts
//! over authors, venues, and title topics, log-damped so common-but-not-
//! dominant signals win over raw frequency. Runs at most once per process.

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use imrec_domain::{Document, MutedItems, Profile, AFFINITY_LIMIT};

use crate::text::extract_keywords;

/// Fewer documents than this and bootstrap is a no-op
pub const MIN_DOCUMENTS: usize = 20;

const AUTHOR_VENUE_SCALE: f64 = 100.0;
const TOPIC_SCALE: f64 = 50.0;

/// Additional multiplicative boost for authors of starred documents
const STARRED_AUTHOR_BOOST: f64 = 2.0;

/// Affinity override for muted authors and venues
const MUTED_OVERRIDE: f64 = -2.0;
/// Affinity override for muted categories
const MUTED_CATEGORY_OVERRIDE: f64 = -1.5;

/// Additive topic boost per saved-search keyword
const SAVED_SEARCH_BOOST: f64 = 0.5;

/// One-shot profile initializer from static library content
pub struct ColdStartBootstrap {
    done: AtomicBool,
}

impl Default for ColdStartBootstrap {
    fn default() -> Self {
        Self::new()
    }
}

impl ColdStartBootstrap {
    pub fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
        }
    }

    /// Populate the profile from the reference set.
    ///
    /// No-ops (returning false) below the document threshold or after a
    /// previous successful run in this process.
    pub fn run(
        &self,
        profile: &mut Profile,
        documents: &[Document],
        muted: &MutedItems,
        saved_queries: &[String],
    ) -> bool {
        if documents.len() < MIN_DOCUMENTS {
            return false;
        }
        if self
            .done
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let total = documents.len() as f64;
        let mut author_counts: HashMap<String, usize> = HashMap::new();
        let mut venue_counts: HashMap<String, usize> = HashMap::new();
        let mut topic_counts: HashMap<String, usize> = HashMap::new();
        // Deduplicated: the boost applies once per author, not per paper
        let mut starred_authors: HashSet<String> = HashSet::new();

        for doc in documents {
            for author in &doc.authors {
                let name = author.to_lowercase();
                *author_counts.entry(name.clone()).or_insert(0) += 1;
                if doc.starred {
                    starred_authors.insert(name);
                }
            }
            if let Some(ref venue) = doc.venue {
                *venue_counts.entry(venue.to_lowercase()).or_insert(0) += 1;
            }
            for keyword in extract_keywords(&doc.title) {
                *topic_counts.entry(keyword).or_insert(0) += 1;
            }
        }

        for (author, count) in &author_counts {
            let affinity = log_damped(*count as f64 / total, AUTHOR_VENUE_SCALE);
            profile.author_affinities.insert(author.clone(), affinity);
        }
        for (venue, count) in &venue_counts {
            let affinity = log_damped(*count as f64 / total, AUTHOR_VENUE_SCALE);
            profile.venue_affinities.insert(venue.clone(), affinity);
        }
        for (topic, count) in &topic_counts {
            let affinity = log_damped(*count as f64 / total, TOPIC_SCALE);
            profile.topic_affinities.insert(topic.clone(), affinity);
        }

        // Starred documents signal intent beyond mere presence
        for author in starred_authors {
            if let Some(affinity) = profile.author_affinities.get_mut(&author) {
                *affinity = (*affinity * STARRED_AUTHOR_BOOST).min(AFFINITY_LIMIT);
            }
        }

        // Mutes supersede anything frequency computed above
        for author in &muted.authors {
            profile.author_affinities.insert(author.clone(), MUTED_OVERRIDE);
        }
        for venue in &muted.venues {
            profile.venue_affinities.insert(venue.clone(), MUTED_OVERRIDE);
        }
        for category in &muted.categories {
            profile
                .topic_affinities
                .insert(category.clone(), MUTED_CATEGORY_OVERRIDE);
        }

        // Saved searches express standing interest independent of frequency
        for query in saved_queries {
            for keyword in extract_keywords(query) {
                let entry = profile.topic_affinities.entry(keyword).or_insert(0.0);
                *entry = (*entry + SAVED_SEARCH_BOOST).min(AFFINITY_LIMIT);
            }
        }

        profile.last_updated = Utc::now();
        info!(
            documents = documents.len(),
            affinities = profile.affinity_count(),
            "bootstrapped cold-start profile"
        );
        true
    }
}

fn log_damped(frequency: f64, scale: f64) -> f64 {
    (1.0 + frequency * scale).ln().min(AFFINITY_LIMIT)
}
