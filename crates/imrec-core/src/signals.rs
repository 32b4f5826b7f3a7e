//! Signal capture: turning user actions into training events.
//!
//! Converts a discrete action on a document into a [`TrainingEvent`] whose
//! base deltas encode the per-key sub-weights (author 1.0, venue 0.5,
//! topic 0.3, category 0.4). Events apply to the profile immediately and
//! are buffered before landing in the bounded persisted log.

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use imrec_domain::{Document, FeatureKeyKind, Profile, TrainingAction, TrainingEvent};

use crate::error::RecommendError;
use crate::learner::OnlineLearner;
use crate::text::top_keywords;

/// Buffered events are moved to the persisted log at this count
pub const FLUSH_THRESHOLD: usize = 10;

/// Identical (document, action) pairs inside this window are dropped
pub const DEDUP_WINDOW_SECS: i64 = 2;

/// Title keywords contributing topic deltas, capped to the most significant
const MAX_TOPIC_KEYWORDS: usize = 5;

/// Captures user actions and feeds the online learner
pub struct SignalCollector {
    learner: OnlineLearner,
    buffer: Vec<TrainingEvent>,
    last_recorded: HashMap<(String, TrainingAction), DateTime<Utc>>,
}

impl Default for SignalCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalCollector {
    pub fn new() -> Self {
        Self {
            learner: OnlineLearner::new(),
            buffer: Vec::new(),
            last_recorded: HashMap::new(),
        }
    }

    /// Build the training event for an action on a document.
    ///
    /// Deltas cover the document's authors, venue, category tags, and the
    /// top title keywords, each weighted by its key kind.
    pub fn make_event(doc: &Document, action: TrainingAction) -> TrainingEvent {
        let mut deltas = BTreeMap::new();
        for author in &doc.authors {
            deltas.insert(
                format!("author:{}", author.to_lowercase()),
                FeatureKeyKind::Author.base_weight(),
            );
        }
        if let Some(ref venue) = doc.venue {
            deltas.insert(
                format!("venue:{}", venue.to_lowercase()),
                FeatureKeyKind::Venue.base_weight(),
            );
        }
        for keyword in top_keywords(&doc.title, MAX_TOPIC_KEYWORDS) {
            deltas.insert(
                format!("topic:{keyword}"),
                FeatureKeyKind::Topic.base_weight(),
            );
        }
        for tag in &doc.tags {
            deltas.insert(
                format!("category:{}", tag.to_lowercase()),
                FeatureKeyKind::Category.base_weight(),
            );
        }
        TrainingEvent::new(action, doc.id.clone(), deltas)
    }

    /// Record an action: dedup, apply to the profile, buffer for the log.
    ///
    /// Returns the created event, or None when the action was a duplicate
    /// of one recorded inside the dedup window.
    pub fn record(
        &mut self,
        profile: &mut Profile,
        doc: &Document,
        action: TrainingAction,
        now: DateTime<Utc>,
    ) -> Option<TrainingEvent> {
        let key = (doc.id.clone(), action);
        if let Some(&last_at) = self.last_recorded.get(&key) {
            if now - last_at < Duration::seconds(DEDUP_WINDOW_SECS) {
                debug!(document = %doc.id, ?action, "deduplicated repeated action");
                return None;
            }
        }
        self.last_recorded
            .retain(|_, &mut at| now - at < Duration::seconds(DEDUP_WINDOW_SECS));
        self.last_recorded.insert(key, now);

        let mut event = Self::make_event(doc, action);
        event.timestamp = now;
        self.learner.apply(profile, &event);
        self.buffer.push(event.clone());
        if self.buffer.len() >= FLUSH_THRESHOLD {
            self.flush(profile);
        }
        Some(event)
    }

    /// Apply a pre-built event directly, bypassing dedup and buffering
    pub fn train(&self, profile: &mut Profile, event: &TrainingEvent) {
        self.learner.apply(profile, event);
        profile.log_event(event.clone());
    }

    /// Move buffered events into the profile's bounded log
    pub fn flush(&mut self, profile: &mut Profile) {
        for event in self.buffer.drain(..) {
            profile.log_event(event);
        }
    }

    /// Undo a recorded event by id: invert its affinity deltas and remove
    /// it from the buffer or persisted log.
    pub fn undo(&mut self, profile: &mut Profile, event_id: &str) -> Result<(), RecommendError> {
        if let Some(pos) = self.buffer.iter().position(|e| e.id == event_id) {
            let event = self.buffer.remove(pos);
            self.learner.undo(profile, &event);
            return Ok(());
        }
        if let Some(pos) = profile.training_events.iter().position(|e| e.id == event_id) {
            let event = profile.training_events.remove(pos);
            self.learner.undo(profile, &event);
            return Ok(());
        }
        Err(RecommendError::EventNotFound(event_id.to_string()))
    }

    /// Events captured but not yet moved to the persisted log
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
