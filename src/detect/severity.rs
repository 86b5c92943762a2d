use crate::detect::Severity;

/// Map a raw anomaly score onto a severity tier.
///
/// Scores come from the outlier model's decision function: strictly
/// increasing score means less anomalous. Boundary values fall on the less
/// severe side.
pub fn classify(score: f64) -> Severity {
    if score < -0.20 {
        Severity::Critical
    } else if score < -0.10 {
        Severity::High
    } else if score < -0.05 {
        Severity::Medium
    } else {
        Severity::Low
    }
}
