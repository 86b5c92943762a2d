//! Notification routing -- severity gating, policy snapshots, channel fan-out.

pub mod email;
pub mod policy;
pub mod slack;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::detect::Incident;
use policy::{NotificationPolicy, PolicyHandle};

/// A single outbound notification capability.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Deliver one incident alert. The policy snapshot is the same one the
    /// router used for the severity gate; email-style channels consult it
    /// for their per-call receiver override, webhook channels ignore it.
    async fn dispatch(
        &self,
        incident: &Incident,
        policy: &NotificationPolicy,
    ) -> anyhow::Result<()>;
}

/// Alert body shared by every channel.
pub fn format_alert(incident: &Incident) -> String {
    format!(
        "🚨 INCIDENT DETECTED\nSource: {}\nSeverity: {}\nScore: {:.4}\nMessage: {}",
        incident.source,
        incident.severity.as_str().to_uppercase(),
        incident.score,
        incident.message
    )
}

/// Fans incidents out to the configured channels according to the current
/// policy snapshot.
pub struct NotificationRouter {
    channels: Vec<Arc<dyn Notifier>>,
    policy: PolicyHandle,
}

impl NotificationRouter {
    pub fn new(channels: Vec<Arc<dyn Notifier>>, policy: PolicyHandle) -> Self {
        Self { channels, policy }
    }

    pub fn policy(&self) -> &PolicyHandle {
        &self.policy
    }

    /// Route an incident to the channels if its severity clears the policy
    /// threshold. Fire-and-forget: delivery failures are logged per channel
    /// and never reach the pipeline caller.
    pub async fn route_if_needed(&self, incident: &Incident) {
        let policy = self.policy.snapshot().await;
        if !policy.threshold.permits(incident.severity) {
            return;
        }

        for channel in &self.channels {
            if let Err(e) = channel.dispatch(incident, &policy).await {
                warn!(
                    channel = channel.name(),
                    source = %incident.source,
                    error = %e,
                    "notification delivery failed"
                );
            }
        }
    }
}
