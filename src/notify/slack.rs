//! Slack webhook channel.

use async_trait::async_trait;

use crate::detect::Incident;
use crate::notify::policy::NotificationPolicy;
use crate::notify::{format_alert, Notifier};

pub struct SlackNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &'static str {
        "slack"
    }

    /// Best-effort webhook POST; the policy's email gating does not apply.
    async fn dispatch(
        &self,
        incident: &Incident,
        _policy: &NotificationPolicy,
    ) -> anyhow::Result<()> {
        let payload = serde_json::json!({ "text": format_alert(incident) });
        self.client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
