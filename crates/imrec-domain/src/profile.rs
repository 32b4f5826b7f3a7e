//! Learned user preference profile

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::training::TrainingEvent;

/// Maximum absolute value any affinity may take
pub const AFFINITY_LIMIT: f64 = 5.0;

/// Maximum number of training events retained in the log
pub const MAX_TRAINING_EVENTS: usize = 1000;

/// Learned preference state for one library.
///
/// Affinity maps use `BTreeMap` so the persisted JSON has a stable key
/// order and round-trips byte-for-byte. The training event log is kept
/// in memory only; the external store persists the affinity blob.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Lowercased author family name -> affinity
    pub author_affinities: BTreeMap<String, f64>,
    /// Lowercased venue name -> affinity
    pub venue_affinities: BTreeMap<String, f64>,
    /// Lowercased topic keyword -> affinity
    pub topic_affinities: BTreeMap<String, f64>,
    /// RFC 3339 timestamp of the last mutation
    #[serde(default = "default_timestamp")]
    pub last_updated: DateTime<Utc>,
    /// Bounded FIFO log of applied training events (not persisted)
    #[serde(skip)]
    pub training_events: Vec<TrainingEvent>,
}

fn default_timestamp() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl Profile {
    pub fn new() -> Self {
        Self {
            author_affinities: BTreeMap::new(),
            venue_affinities: BTreeMap::new(),
            topic_affinities: BTreeMap::new(),
            last_updated: Utc::now(),
            training_events: Vec::new(),
        }
    }

    /// A profile with no learned affinities yet
    pub fn is_cold_start(&self) -> bool {
        self.author_affinities.is_empty()
            && self.venue_affinities.is_empty()
            && self.topic_affinities.is_empty()
    }

    /// Append an event to the log, evicting the oldest past the cap
    pub fn log_event(&mut self, event: TrainingEvent) {
        self.training_events.push(event);
        if self.training_events.len() > MAX_TRAINING_EVENTS {
            let excess = self.training_events.len() - MAX_TRAINING_EVENTS;
            self.training_events.drain(..excess);
        }
    }

    /// Serialize to the persisted JSON blob (three maps + timestamp)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from the persisted JSON blob
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Authors with the strongest positive affinity, descending
    pub fn top_authors(&self, limit: usize) -> Vec<(String, f64)> {
        top_entries(&self.author_affinities, limit)
    }

    /// Topics with the strongest positive affinity, descending
    pub fn top_topics(&self, limit: usize) -> Vec<(String, f64)> {
        top_entries(&self.topic_affinities, limit)
    }

    /// Total number of learned affinity entries across all maps
    pub fn affinity_count(&self) -> usize {
        self.author_affinities.len() + self.venue_affinities.len() + self.topic_affinities.len()
    }
}

fn top_entries(map: &BTreeMap<String, f64>, limit: usize) -> Vec<(String, f64)> {
    let mut entries: Vec<(String, f64)> = map
        .iter()
        .filter(|(_, &v)| v > 0.0)
        .map(|(k, &v)| (k.clone(), v))
        .collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));
    entries.truncate(limit);
    entries
}
