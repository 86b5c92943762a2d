use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use incident_sentinel::config::Settings;
use incident_sentinel::generator::shapes;
use incident_sentinel::notify::policy::PolicyHandle;
use incident_sentinel::notify::NotificationRouter;
use incident_sentinel::pipeline::Pipeline;
use incident_sentinel::storage;

#[derive(Parser)]
#[command(
    name = "incident-sentinel",
    about = "Real-time incident classification and alerting for heterogeneous telemetry",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file (falls back to SENTINEL_CONFIG, then defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (API server + pipeline + generator controller)
    Serve {
        /// Bind address; overrides the config file
        #[arg(long)]
        bind: Option<String>,
    },

    /// Generate a one-shot batch of synthetic incidents
    Generate {
        /// Number of datapoints to synthesize
        #[arg(long, default_value = "10")]
        count: usize,

        /// Percent of datapoints shaped as outliers
        #[arg(long, default_value = "30")]
        anomaly_rate: u8,
    },

    /// List recent incidents from the store
    Incidents {
        /// Maximum rows to print
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

fn load_settings(config: Option<&PathBuf>) -> Settings {
    match config {
        Some(path) => Settings::load(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not load --config file, using defaults");
            Settings::default()
        }),
        None => Settings::load_or_default(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_ref());

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
            tracing::info!(%bind, "Starting Incident Sentinel daemon");
            incident_sentinel::serve(&bind, settings).await?;
        }
        Commands::Generate {
            count,
            anomaly_rate,
        } => {
            if anomaly_rate > 100 {
                anyhow::bail!("--anomaly-rate must be between 0 and 100");
            }
            let pool = storage::open_pool(&settings.server.database_path)?;
            let router = NotificationRouter::new(Vec::new(), PolicyHandle::new());
            let pipeline = Pipeline::new(pool, router);

            let mut rng = StdRng::from_entropy();
            println!("{:<10} | {:<16} | {:>9} | Message", "Severity", "Source", "Score");
            println!("{:-<10}-|-{:-<16}-|-{:-<9}-|-{:-<40}", "", "", "", "");
            for _ in 0..count {
                let datapoint = shapes::synthesize(&mut rng, anomaly_rate);
                let (_id, incident) = pipeline.ingest(datapoint).await?;
                println!(
                    "{:<10} | {:<16} | {:>9.4} | {}",
                    incident.severity.as_str(),
                    incident.source,
                    incident.score,
                    incident.message
                );
            }
        }
        Commands::Incidents { limit } => {
            let pool = storage::open_pool(&settings.server.database_path)?;
            let incidents = storage::query_incidents(
                &pool,
                &storage::IncidentQuery {
                    limit: Some(limit),
                    ..Default::default()
                },
            )?;

            if incidents.is_empty() {
                println!("No incidents found.");
            } else {
                println!("{:<10} | {:<16} | {:<20} | Message", "Severity", "Source", "Timestamp");
                println!("{:-<10}-|-{:-<16}-|-{:-<20}-|-{:-<40}", "", "", "", "");
                for inc in incidents {
                    println!(
                        "{:<10} | {:<16} | {:<20} | {}",
                        inc.severity.as_str(),
                        inc.source,
                        inc.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        inc.message
                    );
                }
            }
        }
    }

    Ok(())
}
