//! MLB Scorigami ingestion job.
//!
//! One invocation runs one cycle and exits; scheduling is left to cron.
//! Startup failures (credentials, reference data, store) exit non-zero.

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use tracing::{error, info, warn};

use scorigami_ingest::config::Config;
use scorigami_ingest::export::export_history;
use scorigami_ingest::registry::{load_reference, FranchiseIndex};
use scorigami_ingest::schedule::StatsApiClient;
use scorigami_ingest::store::PgGameStore;
use scorigami_ingest::IngestionCycle;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scorigami_ingest=info".parse()?),
        )
        .init();

    info!("Starting MLB Scorigami ingestion run");

    let config = Config::from_env().context("Invalid configuration")?;

    let reference = load_reference(&config.teams_csv_path)?;
    let as_of_year = config.registry_year.unwrap_or_else(|| Utc::now().year());
    let index = FranchiseIndex::build(&reference, as_of_year, config.match_strategies.clone());
    if index.is_empty() {
        warn!(
            "No franchise identities active in {}; every game will be skipped",
            index.as_of_year()
        );
    } else {
        info!(
            "Resolving {} team(s) active in {} with strategies {:?}",
            index.len(),
            index.as_of_year(),
            index.strategies()
        );
    }

    let store = PgGameStore::connect(
        &config.database_url,
        config.db_connect_attempts,
        &config.store_date_format,
    )
    .await?;
    if config.auto_migrate {
        store.bootstrap_schema().await?;
    }

    let source = StatsApiClient::new(&config)?;
    let cycle = IngestionCycle::new(&index, &source, &store);

    let report = cycle.run_cycle(Utc::now()).await?;
    info!(
        "Cycle finished: {} observed, {} merged, {} candidate(s), {} skipped, {} persisted",
        report.observed,
        report.merged,
        report.candidates,
        report.skipped,
        report.persisted.len()
    );

    if report.accepted_any() {
        info!("New games were added, regenerating export");
        if let Err(e) = export_history(&store, &config.export_path).await {
            error!("Failed to write export to {}: {:?}", config.export_path.display(), e);
        }
    } else {
        info!("No new games added, export skipped");
    }

    info!("Run finished");
    Ok(())
}
