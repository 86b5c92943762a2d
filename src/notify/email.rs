//! SMTP email channel.
//!
//! The statically configured receiver is only a default: when the runtime
//! policy is enabled and names a receiver, that address is used for the one
//! delivery without touching the configured destination.

use anyhow::Context;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::detect::Incident;
use crate::notify::policy::NotificationPolicy;
use crate::notify::{format_alert, Notifier};

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
    default_receiver: Option<String>,
}

impl EmailNotifier {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .context("invalid SMTP relay host")?
            .port(config.port)
            .credentials(creds)
            .build();

        let default_receiver = if config.receiver.is_empty() {
            None
        } else {
            Some(config.receiver.clone())
        };

        Ok(Self {
            mailer,
            sender: config.sender.clone(),
            default_receiver,
        })
    }

    /// Destination for a single delivery under the given policy snapshot:
    /// the policy receiver when the policy is enabled and names one,
    /// otherwise the configured default, otherwise none (skip the send).
    fn effective_receiver(&self, policy: &NotificationPolicy) -> Option<String> {
        if policy.enabled && !policy.receiver.is_empty() {
            return Some(policy.receiver.clone());
        }
        self.default_receiver.clone()
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn dispatch(
        &self,
        incident: &Incident,
        policy: &NotificationPolicy,
    ) -> anyhow::Result<()> {
        let Some(receiver) = self.effective_receiver(policy) else {
            tracing::debug!("email channel skipped, no receiver configured");
            return Ok(());
        };

        let subject = format!(
            "[Incident Sentinel] {} incident detected",
            incident.severity.as_str().to_uppercase()
        );
        let email = Message::builder()
            .from(self.sender.parse().context("invalid sender address")?)
            .to(receiver.parse().context("invalid receiver address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(format_alert(incident))
            .context("failed to build email")?;

        self.mailer.send(email).await.context("SMTP send failed")?;
        Ok(())
    }
}
