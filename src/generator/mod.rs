//! Background synthetic-load generator.
//!
//! A single supervised worker synthesizes datapoints and drives them through
//! the same pipeline as external ingestion. Start and stop are idempotent;
//! the worker observes a cooperative stop flag at every loop boundary, and a
//! failed iteration never terminates it.

pub mod shapes;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::pipeline::Pipeline;

/// Pause after a failed iteration before the loop continues.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeneratorSettings {
    /// Seconds between iterations.
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Percent of synthesized datapoints shaped as outliers.
    #[serde(default = "default_anomaly_rate", rename = "anomalyRate")]
    pub anomaly_rate: u8,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            anomaly_rate: default_anomaly_rate(),
        }
    }
}

fn default_interval() -> u64 {
    3
}

fn default_anomaly_rate() -> u8 {
    30
}

impl GeneratorSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.interval < 1 {
            return Err("interval must be at least 1 second".to_string());
        }
        if self.anomaly_rate > 100 {
            return Err("anomalyRate must be between 0 and 100".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratorStatus {
    pub running: bool,
    pub generated: u64,
    pub settings: GeneratorSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning { generated: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped { generated: u64 },
    NotRunning,
}

/// Per-generation state. Each started worker owns its own stop flag and
/// counter, so a worker finishing its last iteration after a rapid
/// stop/start cannot be revived by the new flag or bump the new counter.
struct Lifecycle {
    settings: GeneratorSettings,
    stop_flag: Option<Arc<AtomicBool>>,
    generated: Arc<AtomicU64>,
}

pub struct GeneratorController {
    // serializes start/stop against each other; the worker never takes it
    lifecycle: Mutex<Lifecycle>,
}

impl GeneratorController {
    pub fn new() -> Self {
        Self {
            lifecycle: Mutex::new(Lifecycle {
                settings: GeneratorSettings::default(),
                stop_flag: None,
                generated: Arc::new(AtomicU64::new(0)),
            }),
        }
    }

    /// Spawn the worker if it is not already running. A second start is a
    /// no-op: it neither resets the counter nor spawns another worker.
    pub async fn start(&self, settings: GeneratorSettings, pipeline: Arc<Pipeline>) -> StartOutcome {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.stop_flag.is_some() {
            return StartOutcome::AlreadyRunning {
                generated: lifecycle.generated.load(Ordering::SeqCst),
            };
        }

        lifecycle.settings = settings;
        lifecycle.generated = Arc::new(AtomicU64::new(0));

        let running = Arc::new(AtomicBool::new(true));
        lifecycle.stop_flag = Some(Arc::clone(&running));
        tokio::spawn(run_worker(
            running,
            Arc::clone(&lifecycle.generated),
            settings,
            pipeline,
        ));

        StartOutcome::Started
    }

    /// Signal cooperative cancellation; the worker exits after finishing its
    /// current iteration.
    pub async fn stop(&self) -> StopOutcome {
        let mut lifecycle = self.lifecycle.lock().await;
        match lifecycle.stop_flag.take() {
            Some(flag) => {
                flag.store(false, Ordering::SeqCst);
                StopOutcome::Stopped {
                    generated: lifecycle.generated.load(Ordering::SeqCst),
                }
            }
            None => StopOutcome::NotRunning,
        }
    }

    /// Pure read of the current state, settings, and counter.
    pub async fn status(&self) -> GeneratorStatus {
        let lifecycle = self.lifecycle.lock().await;
        GeneratorStatus {
            running: lifecycle.stop_flag.is_some(),
            generated: lifecycle.generated.load(Ordering::SeqCst),
            settings: lifecycle.settings,
        }
    }
}

impl Default for GeneratorController {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_worker(
    running: Arc<AtomicBool>,
    generated: Arc<AtomicU64>,
    settings: GeneratorSettings,
    pipeline: Arc<Pipeline>,
) {
    info!(
        interval = settings.interval,
        anomaly_rate = settings.anomaly_rate,
        "generator worker started"
    );
    let mut rng = StdRng::from_entropy();

    while running.load(Ordering::SeqCst) {
        let datapoint = shapes::synthesize(&mut rng, settings.anomaly_rate);
        match pipeline.ingest(datapoint).await {
            Ok((id, incident)) => {
                let total = generated.fetch_add(1, Ordering::SeqCst) + 1;
                info!(%id, severity = %incident.severity, total, "incident generated");
            }
            Err(e) => {
                warn!(error = %e, "generator iteration failed");
                tokio::time::sleep(ERROR_BACKOFF).await;
                continue;
            }
        }

        // re-check around the suspension so stop() takes effect promptly
        if !running.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_secs(settings.interval)).await;
    }

    info!(
        total = generated.load(Ordering::SeqCst),
        "generator worker stopped"
    );
}
