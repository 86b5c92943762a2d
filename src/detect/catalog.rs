//! Source catalog and incident construction.
//!
//! Maps a datapoint's source onto an incident category plus one
//! human-readable message per severity tier. Unknown sources fall back to a
//! generic category with messages that still name the source and tier.

use crate::detect::severity;
use crate::detect::{AnomalyResult, DataPoint, Incident, Severity};

pub const FALLBACK_KIND: &str = "anomaly_detection";

pub struct CatalogEntry {
    pub source: &'static str,
    pub kind: &'static str,
    critical: &'static str,
    high: &'static str,
    medium: &'static str,
    low: &'static str,
}

impl CatalogEntry {
    pub fn message(&self, severity: Severity) -> &'static str {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }
}

static CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        source: "sensor-payment",
        kind: "payment",
        critical: "Critical fraud pattern detected — large unauthorized transaction",
        high: "Suspicious payment activity — multiple failed attempts",
        medium: "Unusual payment amount or slow response time",
        low: "Payment transaction processed normally",
    },
    CatalogEntry {
        source: "sensor-login",
        kind: "login",
        critical: "Brute-force attack detected — account lockout triggered",
        high: "Multiple failed login attempts from unknown device",
        medium: "Login from new location or device detected",
        low: "Successful user authentication",
    },
    CatalogEntry {
        source: "sensor-api",
        kind: "api_call",
        critical: "API endpoint returning critical error rate — service degraded",
        high: "High response latency and elevated error rate detected",
        medium: "Elevated API request volume or timeout spike",
        low: "API call completed within normal parameters",
    },
    CatalogEntry {
        source: "sensor-database",
        kind: "database",
        critical: "Database deadlock storm — service availability impacted",
        high: "Slow query detected with high connection pool usage",
        medium: "Abnormal row count in database operation",
        low: "Database query executed successfully",
    },
    CatalogEntry {
        source: "sensor-mail",
        kind: "email",
        critical: "Mass email campaign detected — possible spam or data exfiltration",
        high: "High bounce rate and spam score on outgoing mail",
        medium: "Unusual recipient count or delayed mail delivery",
        low: "Email sent successfully",
    },
    CatalogEntry {
        source: "sensor-checkout",
        kind: "checkout",
        critical: "High-value checkout anomaly — possible card testing attack",
        high: "Multiple payment retries with elevated failure rate",
        medium: "Slow checkout process or unusual cart value",
        low: "Checkout completed successfully",
    },
    CatalogEntry {
        source: "sensor-search",
        kind: "search",
        critical: "Search injection attempt detected — zero results with oversized query",
        high: "Search engine overloaded — high cache miss and latency",
        medium: "Unusually long search query or slow response",
        low: "Search query returned results normally",
    },
    CatalogEntry {
        source: "sensor-upload",
        kind: "upload",
        critical: "Extremely large file upload — possible storage abuse or data exfiltration",
        high: "Upload failed repeatedly — high error and retry count",
        medium: "Upload slower than expected for file size",
        low: "File uploaded successfully",
    },
];

pub fn lookup(source: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| e.source == source)
}

pub fn known_sources() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|e| e.source)
}

fn fallback_message(source: &str, severity: Severity) -> String {
    match severity {
        Severity::Critical => format!("Critical anomaly detected in {} behavior", source),
        Severity::High => format!("High-severity anomaly flagged in {} by the outlier model", source),
        Severity::Medium => format!("Moderate anomaly detected in {}, review recommended", source),
        Severity::Low => format!("Low-level deviation observed in {}, within acceptable range", source),
    }
}

/// Combine a datapoint and its anomaly result into an immutable incident.
///
/// Pure: persistence is a separate, explicit step the caller performs.
pub fn build_incident(datapoint: &DataPoint, result: AnomalyResult) -> Incident {
    let tier = severity::classify(result.score);
    let (kind, message) = match lookup(&datapoint.source) {
        Some(entry) => (entry.kind.to_string(), entry.message(tier).to_string()),
        None => (
            FALLBACK_KIND.to_string(),
            fallback_message(&datapoint.source, tier),
        ),
    };

    Incident {
        timestamp: datapoint.timestamp,
        source: datapoint.source.clone(),
        values: datapoint.values.clone(),
        score: result.score,
        is_anomaly: result.is_anomaly,
        severity: tier,
        kind,
        message,
    }
}
