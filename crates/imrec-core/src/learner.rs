//! Online preference learning.
//!
//! Applies training events to a profile with a bounded update rule:
//! `new = clamp(old + base_delta * action_multiplier * learning_rate)`.
//! Undo re-applies the identical rule with negated deltas, which exactly
//! inverts the forward step unless it saturated the clamp (known edge
//! case, not a bug).

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use imrec_domain::{FeatureKeyKind, Profile, TrainingEvent, AFFINITY_LIMIT};

/// Step size for every affinity update
pub const LEARNING_RATE: f64 = 0.05;

/// Multiplier applied to negative affinities on decay
pub const DECAY_FACTOR: f64 = 0.9;

/// Affinities below this magnitude are pruned as noise
pub const PRUNE_EPSILON: f64 = 0.01;

/// Stateless transition rules over [`Profile`] affinities
#[derive(Debug, Clone, Copy, Default)]
pub struct OnlineLearner;

impl OnlineLearner {
    pub fn new() -> Self {
        Self
    }

    /// Apply a training event, mutating the profile's affinity maps.
    ///
    /// Unrecognized delta keys are skipped; the event is not logged here
    /// (the caller owns the event log).
    pub fn apply(&self, profile: &mut Profile, event: &TrainingEvent) {
        let multiplier = event.action.multiplier();
        for (key, base_delta) in &event.deltas {
            let Some((kind, value)) = FeatureKeyKind::parse(key) else {
                continue;
            };
            let map = match kind {
                FeatureKeyKind::Author => &mut profile.author_affinities,
                FeatureKeyKind::Venue => &mut profile.venue_affinities,
                // Category tags share the topic space with title keywords
                FeatureKeyKind::Topic | FeatureKeyKind::Category => {
                    &mut profile.topic_affinities
                }
            };
            let old = map.get(value).copied().unwrap_or(0.0);
            let new = (old + base_delta * multiplier * LEARNING_RATE)
                .clamp(-AFFINITY_LIMIT, AFFINITY_LIMIT);
            map.insert(value.to_string(), new);
        }
        profile.last_updated = event.timestamp.max(profile.last_updated);
        debug!(
            action = ?event.action,
            document = %event.document_id,
            deltas = event.deltas.len(),
            "applied training event"
        );
    }

    /// Undo a previously applied event by applying its inverse
    pub fn undo(&self, profile: &mut Profile, event: &TrainingEvent) {
        self.apply(profile, &event.inverse());
    }

    /// Decay negative affinities toward zero.
    ///
    /// Only fires when the profile has been idle longer than the decay
    /// period, so repeated events do not erode penalties prematurely.
    /// Returns whether decay ran.
    pub fn decay_negative(&self, profile: &mut Profile, now: DateTime<Utc>, decay_days: i64) -> bool {
        if now - profile.last_updated <= Duration::days(decay_days) {
            return false;
        }
        for map in [
            &mut profile.author_affinities,
            &mut profile.venue_affinities,
            &mut profile.topic_affinities,
        ] {
            for value in map.values_mut() {
                if *value < 0.0 {
                    *value *= DECAY_FACTOR;
                }
            }
        }
        profile.last_updated = now;
        debug!("decayed negative affinities");
        true
    }

    /// Drop near-zero affinities. Explicit maintenance, not automatic.
    /// Returns the number of entries removed.
    pub fn prune(&self, profile: &mut Profile) -> usize {
        let mut removed = 0;
        for map in [
            &mut profile.author_affinities,
            &mut profile.venue_affinities,
            &mut profile.topic_affinities,
        ] {
            let before = map.len();
            map.retain(|_, v| v.abs() >= PRUNE_EPSILON);
            removed += before - map.len();
        }
        removed
    }
}
