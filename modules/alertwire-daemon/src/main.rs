use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use alertwire_classify::{ClassificationEngine, ClassifyWorker};
use alertwire_common::Config;
use alertwire_ingest::sources::{
    FireAdapter, QuakeAdapter, RiverAdapter, TransitAdapter, WeatherAdapter,
};
use alertwire_ingest::{backfill, IngestScheduler, SourceAdapter};
use alertwire_store::{AlertStore, PgAlertStore};
use llm_client::{ChatCompletion, Ollama, OpenAi};

#[derive(Parser)]
#[command(name = "alertwire", about = "Hazard and incident alert aggregation daemon")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the ingest scheduler and classification worker (default).
    Run,
    /// Re-derive coordinates for alerts stored without them, then exit.
    BackfillCoordinates,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting alertwire");

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_redacted();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("connecting to Postgres")?;

    let store = PgAlertStore::new(pool);
    store.migrate().await.context("running migrations")?;
    let store: Arc<dyn AlertStore> = Arc::new(store);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_daemon(config, store).await,
        Command::BackfillCoordinates => {
            let updated = backfill::run(store.as_ref()).await?;
            info!(updated, "Backfill finished");
            Ok(())
        }
    }
}

async fn run_daemon(config: Config, store: Arc<dyn AlertStore>) -> Result<()> {
    let adapters = build_adapters(&config);
    info!(adapters = adapters.len(), "Feed adapters configured");

    let scheduler = IngestScheduler::new(adapters, store.clone(), config.refresh_interval);

    let worker = ClassifyWorker::new(
        build_engine(&config),
        store.clone(),
        config.classify_poll_interval,
        config.classify_batch_limit,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ingest_handle = {
        let rx = shutdown_rx.clone();
        tokio::spawn(async move { scheduler.run(rx).await })
    };
    let classify_handle = {
        let rx = shutdown_rx;
        let grace = config.shutdown_grace;
        tokio::spawn(async move { worker.run(rx, grace).await })
    };

    tokio::signal::ctrl_c().await.context("listening for ctrl-c")?;
    info!("Shutdown signal received");
    shutdown_tx.send(true).ok();

    if let Err(e) = ingest_handle.await {
        error!(error = %e, "Ingest scheduler task panicked");
    }
    if let Err(e) = classify_handle.await {
        error!(error = %e, "Classification worker task panicked");
    }

    info!("Shutdown complete");
    Ok(())
}

/// One adapter per feed. Credentialed feeds join only when their key is
/// configured.
fn build_adapters(config: &Config) -> Vec<Arc<dyn SourceAdapter>> {
    let center = (config.center_lat, config.center_lon);

    let mut adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(WeatherAdapter::new(center, config.test_mode)),
        Arc::new(QuakeAdapter::new(center, config.radius_km, config.test_mode)),
        Arc::new(RiverAdapter::new(config.nwis_sites.clone(), center)),
    ];

    if config.firms_api_key.is_some() {
        adapters.push(Arc::new(FireAdapter::new(
            config.firms_api_key.clone(),
            config.bbox,
            center,
        )));
    } else {
        info!("FIRMS_API_KEY not set; fire detection feed disabled");
    }

    if config.wmata_api_key.is_some() {
        adapters.push(Arc::new(TransitAdapter::new(
            config.wmata_api_key.clone(),
            center,
        )));
    } else {
        info!("WMATA_API_KEY not set; transit incident feed disabled");
    }

    adapters
}

/// Wire the classification tiers that have credentials; the rules tier
/// needs none and is always present inside the engine.
fn build_engine(config: &Config) -> ClassificationEngine {
    let primary: Option<Box<dyn ChatCompletion>> = match &config.openai_api_key {
        Some(key) => Some(Box::new(OpenAi::new(key.clone(), config.openai_model.clone()))),
        None => {
            info!("OPENAI_API_KEY not set; primary classification tier disabled");
            None
        }
    };

    let secondary: Option<Box<dyn ChatCompletion>> = match &config.ollama_base_url {
        Some(url) => Some(Box::new(Ollama::new(url.clone(), config.ollama_model.clone()))),
        None => {
            info!("OLLAMA_BASE_URL not set; secondary classification tier disabled");
            None
        }
    };

    ClassificationEngine::new(primary, secondary)
}
