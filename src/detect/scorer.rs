//! Lazily-initialized anomaly scorer.
//!
//! The first scored datapoint fixes the feature-count contract: the model is
//! fitted once against a synthetic reference sample whose dimensionality
//! matches that call, and every later call must supply the same number of
//! features. Feature vectors are assembled in lexicographic key order, so
//! the order a payload listed its metrics in never matters.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use crate::detect::forest::{IsolationForest, DEFAULT_TREES};
use crate::detect::{AnomalyResult, DetectError};

/// Reference sample size the model trains on.
const REFERENCE_SAMPLES: usize = 300;

/// Expected fraction of outliers used to calibrate the decision offset.
const CONTAMINATION: f64 = 0.1;

pub struct AnomalyScorer {
    model: OnceLock<FittedModel>,
}

struct FittedModel {
    dimensions: usize,
    forest: IsolationForest,
}

impl FittedModel {
    fn fit(dimensions: usize) -> Self {
        let mut rng = StdRng::from_entropy();
        let reference: Vec<Vec<f64>> = (0..REFERENCE_SAMPLES)
            .map(|_| {
                (0..dimensions)
                    .map(|_| StandardNormal.sample(&mut rng))
                    .collect()
            })
            .collect();
        let forest = IsolationForest::fit(&reference, DEFAULT_TREES, CONTAMINATION, &mut rng);
        tracing::info!(dimensions, samples = REFERENCE_SAMPLES, "fitted outlier model");
        Self { dimensions, forest }
    }
}

impl AnomalyScorer {
    pub fn new() -> Self {
        Self {
            model: OnceLock::new(),
        }
    }

    /// Score a feature mapping against the outlier model.
    ///
    /// Fails with `EmptyFeatures` on an empty mapping, `NonFiniteValue` on
    /// NaN/infinite metrics, and `DimensionMismatch` when the feature count
    /// differs from the one the model was fitted on.
    pub fn score(&self, values: &BTreeMap<String, f64>) -> Result<AnomalyResult, DetectError> {
        if values.is_empty() {
            return Err(DetectError::EmptyFeatures);
        }
        for (name, v) in values {
            if !v.is_finite() {
                return Err(DetectError::NonFiniteValue { name: name.clone() });
            }
        }

        // get_or_init is single-flight: concurrent first calls block here
        // while exactly one of them fits the model; afterwards this is a
        // lock-free read.
        let model = self.model.get_or_init(|| FittedModel::fit(values.len()));
        if values.len() != model.dimensions {
            return Err(DetectError::DimensionMismatch {
                expected: model.dimensions,
                got: values.len(),
            });
        }

        let features: Vec<f64> = values.values().copied().collect();
        let score = model.forest.decision_function(&features);
        let is_anomaly = model.forest.is_outlier(&features);
        Ok(AnomalyResult { score, is_anomaly })
    }
}

impl Default for AnomalyScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn features(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_empty_values_rejected() {
        let scorer = AnomalyScorer::new();
        let err = scorer.score(&BTreeMap::new()).unwrap_err();
        assert!(matches!(err, DetectError::EmptyFeatures));
    }

    #[test]
    fn test_non_finite_rejected() {
        let scorer = AnomalyScorer::new();
        let err = scorer
            .score(&features(&[("a", 1.0), ("b", f64::NAN)]))
            .unwrap_err();
        assert!(matches!(err, DetectError::NonFiniteValue { .. }));
    }

    /// The first call fixes the feature count; a later call with a different
    /// count is rejected.
    #[test]
    fn test_dimension_mismatch_rejected() {
        let scorer = AnomalyScorer::new();
        scorer
            .score(&features(&[("a", 0.1), ("b", 0.2), ("c", 0.3), ("d", 0.4)]))
            .unwrap();

        let err = scorer.score(&features(&[("a", 0.1), ("b", 0.2)])).unwrap_err();
        match err {
            DetectError::DimensionMismatch { expected, got } => {
                assert_eq!(expected, 4);
                assert_eq!(got, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    /// Concurrent first calls must not race the initialization: all callers
    /// succeed and agree on the fitted dimensionality.
    #[test]
    fn test_concurrent_first_use() {
        let scorer = Arc::new(AnomalyScorer::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let scorer = Arc::clone(&scorer);
            handles.push(std::thread::spawn(move || {
                let v = features(&[
                    ("a", i as f64 * 0.1),
                    ("b", 0.2),
                    ("c", -0.3),
                    ("d", 0.4),
                ]);
                scorer.score(&v)
            }));
        }
        for h in handles {
            h.join().unwrap().unwrap();
        }
    }

    /// Outlier-shaped vectors score more anomalous than tight in-range ones.
    #[test]
    fn test_outliers_score_lower() {
        let scorer = AnomalyScorer::new();
        let normal = scorer
            .score(&features(&[("a", 0.1), ("b", -0.2), ("c", 0.05), ("d", 0.3)]))
            .unwrap();
        let outlier = scorer
            .score(&features(&[
                ("a", 42000.0),
                ("b", 5000.0),
                ("c", 6.0),
                ("d", 9000.0),
            ]))
            .unwrap();
        assert!(outlier.score < normal.score);
        assert!(outlier.is_anomaly);
    }
}
