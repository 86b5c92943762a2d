//! Anomaly scoring, severity classification, and incident construction.

pub mod catalog;
pub mod forest;
pub mod scorer;
pub mod severity;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("datapoint has no feature values")]
    EmptyFeatures,

    #[error("non-finite value for feature '{name}'")]
    NonFiniteValue { name: String },

    #[error("feature count mismatch: model was fitted on {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Severity tiers for classified incidents, least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// A single timestamped reading with named numeric features from one source.
///
/// Values live in a `BTreeMap` so feature order is stable (lexicographic by
/// name) regardless of the order the wire payload used.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DataPoint {
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub values: BTreeMap<String, f64>,
}

/// Output of the outlier model for one feature vector.
///
/// More negative scores are more anomalous. `is_anomaly` is the model's own
/// in/out-of-distribution label, not a re-derivation from the score.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct AnomalyResult {
    pub score: f64,
    pub is_anomaly: bool,
}

/// A classified incident, ready to persist. The store assigns the id.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Incident {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub values: BTreeMap<String, f64>,
    pub score: f64,
    pub is_anomaly: bool,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}
