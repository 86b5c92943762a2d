//! Runtime-mutable notification policy.
//!
//! Changed via the admin API at runtime; not persisted across restarts.
//! Every routing decision reads a snapshot, so an in-flight admin update is
//! never observed half-written.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::detect::Severity;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("threshold must be 'critical' or 'high', got '{0}'")]
    InvalidThreshold(String),
}

/// Minimum severity that triggers alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertThreshold {
    High,
    Critical,
}

impl AlertThreshold {
    pub fn permits(&self, severity: Severity) -> bool {
        match self {
            AlertThreshold::Critical => severity == Severity::Critical,
            AlertThreshold::High => severity >= Severity::High,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPolicy {
    pub enabled: bool,
    pub receiver: String,
    pub threshold: AlertThreshold,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            receiver: String::new(),
            threshold: AlertThreshold::Critical,
        }
    }
}

/// Shared handle to the process-wide policy. Cheap to clone; readers take
/// snapshots, the admin surface writes atomically.
#[derive(Clone, Default)]
pub struct PolicyHandle {
    inner: Arc<RwLock<NotificationPolicy>>,
}

impl PolicyHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> NotificationPolicy {
        self.inner.read().await.clone()
    }

    /// Apply an administrative update. The threshold arrives as a raw string
    /// so the caller gets a field-specific validation error; the receiver is
    /// trimmed of surrounding whitespace.
    pub async fn update(
        &self,
        enabled: bool,
        receiver: &str,
        threshold: &str,
    ) -> Result<NotificationPolicy, PolicyError> {
        let threshold = match threshold {
            "critical" => AlertThreshold::Critical,
            "high" => AlertThreshold::High,
            other => return Err(PolicyError::InvalidThreshold(other.to_string())),
        };

        let mut guard = self.inner.write().await;
        guard.enabled = enabled;
        guard.receiver = receiver.trim().to_string();
        guard.threshold = threshold;
        Ok(guard.clone())
    }
}
