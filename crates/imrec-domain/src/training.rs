//! Training events for online preference learning

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A discrete user action the learner can train on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainingAction {
    Kept,
    Dismissed,
    Starred,
    Unstarred,
    Read,
    PdfDownloaded,
    MoreLikeThis,
    LessLikeThis,
    AddedToCollection,
}

impl TrainingAction {
    /// Multiplier applied to base deltas when this action trains the profile
    pub fn multiplier(&self) -> f64 {
        match self {
            TrainingAction::Kept => 1.0,
            TrainingAction::Dismissed => -1.0,
            TrainingAction::Starred => 2.0,
            TrainingAction::Unstarred => -1.0,
            TrainingAction::Read => 0.5,
            TrainingAction::PdfDownloaded => 0.5,
            TrainingAction::MoreLikeThis => 2.5,
            TrainingAction::LessLikeThis => -2.5,
            TrainingAction::AddedToCollection => 1.5,
        }
    }
}

/// Prefix on a delta key identifying which affinity map it targets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureKeyKind {
    Author,
    Venue,
    Topic,
    Category,
}

impl FeatureKeyKind {
    /// Sub-weight baked into base deltas at event creation time
    pub fn base_weight(&self) -> f64 {
        match self {
            FeatureKeyKind::Author => 1.0,
            FeatureKeyKind::Venue => 0.5,
            FeatureKeyKind::Topic => 0.3,
            FeatureKeyKind::Category => 0.4,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            FeatureKeyKind::Author => "author",
            FeatureKeyKind::Venue => "venue",
            FeatureKeyKind::Topic => "topic",
            FeatureKeyKind::Category => "category",
        }
    }

    /// Parse a `<prefix>:<value>` delta key
    pub fn parse(key: &str) -> Option<(FeatureKeyKind, &str)> {
        let (prefix, value) = key.split_once(':')?;
        let kind = match prefix {
            "author" => FeatureKeyKind::Author,
            "venue" => FeatureKeyKind::Venue,
            "topic" => FeatureKeyKind::Topic,
            "category" => FeatureKeyKind::Category,
            _ => return None,
        };
        Some((kind, value))
    }
}

/// A recorded user action with the affinity deltas it implies.
///
/// Immutable once created; referenced by id for undo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub action: TrainingAction,
    pub document_id: String,
    /// Feature key (`author:<name>`, `venue:<name>`, `topic:<word>`,
    /// `category:<tag>`) to base delta
    pub deltas: BTreeMap<String, f64>,
}

impl TrainingEvent {
    pub fn new(
        action: TrainingAction,
        document_id: impl Into<String>,
        deltas: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action,
            document_id: document_id.into(),
            deltas,
        }
    }

    /// The inverse event: identical keys with negated deltas.
    ///
    /// Applying the inverse through the same learning rule exactly undoes
    /// the forward transition, unless the forward step saturated the clamp.
    pub fn inverse(&self) -> Self {
        Self {
            id: self.id.clone(),
            timestamp: self.timestamp,
            action: self.action,
            document_id: self.document_id.clone(),
            deltas: self.deltas.iter().map(|(k, v)| (k.clone(), -v)).collect(),
        }
    }
}
