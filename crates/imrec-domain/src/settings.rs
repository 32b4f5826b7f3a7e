//! Engine configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::feature::FeatureType;

/// How semantic similarity participates in scoring
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineMode {
    /// Feature signals only; similarity is ignored
    Classic,
    /// Similarity dominates; other positive signals are halved
    Semantic,
    /// Features and similarity blended as configured
    #[default]
    Hybrid,
}

impl EngineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineMode::Classic => "classic",
            EngineMode::Semantic => "semantic",
            EngineMode::Hybrid => "hybrid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "classic" => Some(EngineMode::Classic),
            "semantic" => Some(EngineMode::Semantic),
            "hybrid" => Some(EngineMode::Hybrid),
            _ => None,
        }
    }
}

/// Per-user engine settings.
///
/// Persisted by the external settings store as a flat key/value map;
/// `to_map`/`from_map` define that encoding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Per-feature weight overrides; features absent here use defaults
    pub feature_weights: HashMap<FeatureType, f64>,
    /// One serendipity slot every N ranked positions (min 1)
    pub serendipity_frequency: usize,
    /// Days of inactivity before negative affinities decay
    pub negative_decay_days: i64,
    /// Minimum minutes between full re-ranks
    pub rerank_throttle_minutes: i64,
    /// Master switch; when false, rank() preserves input order
    pub enabled: bool,
    pub mode: EngineMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feature_weights: HashMap::new(),
            serendipity_frequency: 10,
            negative_decay_days: 90,
            rerank_throttle_minutes: 30,
            enabled: true,
            mode: EngineMode::Hybrid,
        }
    }
}

impl Settings {
    /// Effective weight for a feature: user override or the built-in default
    pub fn weight(&self, feature: FeatureType) -> f64 {
        self.feature_weights
            .get(&feature)
            .copied()
            .unwrap_or_else(|| feature.default_weight())
    }

    /// Encode as the flat key/value map the external settings store uses
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(
            "serendipity_frequency".to_string(),
            self.serendipity_frequency.to_string(),
        );
        map.insert(
            "negative_decay_days".to_string(),
            self.negative_decay_days.to_string(),
        );
        map.insert(
            "rerank_throttle_minutes".to_string(),
            self.rerank_throttle_minutes.to_string(),
        );
        map.insert("enabled".to_string(), self.enabled.to_string());
        map.insert("mode".to_string(), self.mode.as_str().to_string());
        for (feature, weight) in &self.feature_weights {
            map.insert(format!("weight.{}", feature.settings_key()), weight.to_string());
        }
        map
    }

    /// Decode from a flat key/value map; missing or malformed keys fall
    /// back to defaults rather than failing
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let defaults = Settings::default();
        let mut feature_weights = HashMap::new();
        for feature in FeatureType::ALL {
            let key = format!("weight.{}", feature.settings_key());
            if let Some(value) = map.get(&key).and_then(|v| v.parse::<f64>().ok()) {
                feature_weights.insert(feature, value);
            }
        }
        Self {
            feature_weights,
            serendipity_frequency: map
                .get("serendipity_frequency")
                .and_then(|v| v.parse().ok())
                .map(|v: usize| v.max(1))
                .unwrap_or(defaults.serendipity_frequency),
            negative_decay_days: map
                .get("negative_decay_days")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.negative_decay_days),
            rerank_throttle_minutes: map
                .get("rerank_throttle_minutes")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rerank_throttle_minutes),
            enabled: map
                .get("enabled")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.enabled),
            mode: map
                .get("mode")
                .and_then(|v| EngineMode::parse(v))
                .unwrap_or(defaults.mode),
        }
    }
}
