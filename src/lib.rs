//! Incident Sentinel -- real-time incident classification and alerting.
//!
//! This crate provides the core library for scoring timestamped feature
//! readings, classifying them into severity tiers, routing alerts under a
//! runtime-mutable policy, and driving synthetic load through the same
//! pipeline from a supervised background generator.

pub mod api;
pub mod config;
pub mod detect;
pub mod generator;
pub mod notify;
pub mod pipeline;
pub mod storage;

use std::sync::Arc;

use anyhow::Result;

use crate::config::Settings;
use crate::notify::Notifier;

/// Build the notification channel list from static configuration. A channel
/// is registered only when its configuration block is complete.
fn build_channels(settings: &Settings) -> Vec<Arc<dyn Notifier>> {
    let mut channels: Vec<Arc<dyn Notifier>> = Vec::new();

    if !settings.slack.webhook_url.is_empty() {
        channels.push(Arc::new(notify::slack::SlackNotifier::new(
            &settings.slack.webhook_url,
        )));
    }

    if settings.smtp.is_configured() {
        match notify::email::EmailNotifier::new(&settings.smtp) {
            Ok(n) => channels.push(Arc::new(n)),
            Err(e) => {
                tracing::warn!(error = %e, "email channel disabled: invalid SMTP configuration")
            }
        }
    }

    channels
}

/// Start the incident-sentinel daemon: storage, pipeline, generator
/// controller, and API server.
pub async fn serve(bind: &str, settings: Settings) -> Result<()> {
    tracing::info!(db_path = %settings.server.database_path, "Initializing database");
    let pool = storage::open_pool(&settings.server.database_path)?;

    let policy = notify::policy::PolicyHandle::new();
    let channels = build_channels(&settings);
    tracing::info!(channels = channels.len(), "Notification channels configured");
    let router = notify::NotificationRouter::new(channels, policy.clone());

    let pipeline = Arc::new(pipeline::Pipeline::new(pool.clone(), router));
    let generator = Arc::new(generator::GeneratorController::new());

    let state = api::state::AppState {
        pool,
        pipeline,
        policy,
        generator,
    };
    let app = api::router(state);

    let addr: std::net::SocketAddr = bind.parse()?;
    tracing::info!(%addr, "Incident Sentinel listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
