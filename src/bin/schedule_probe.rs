//! Query the schedule API for one date and log what comes back.
//!
//! Usage: schedule-probe [MM/DD/YYYY]   (defaults to yesterday, UTC)
//!
//! Only the schedule endpoint settings are read from the environment; no
//! database is touched.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use serde_json::Value;
use tracing::info;

use scorigami_ingest::config::Config;
use scorigami_ingest::schedule::{ScheduleSource, StatsApiClient, QUERY_DATE_FORMAT};

const SAMPLE_SIZE: usize = 3;

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "str",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("schedule_probe=info".parse()?)
                .add_directive("scorigami_ingest=info".parse()?),
        )
        .init();

    let date = match std::env::args().nth(1) {
        Some(arg) => NaiveDate::parse_from_str(&arg, QUERY_DATE_FORMAT)
            .with_context(|| format!("Expected a MM/DD/YYYY date, got '{}'", arg))?,
        None => Utc::now().date_naive() - Duration::days(1),
    };

    // The probe needs no credentials; satisfy the database key with a dummy.
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgresql://unused".to_string()),
        _ => std::env::var(key).ok(),
    })?;
    let client = StatsApiClient::new(&config)?;

    let games = client.games_on(date).await?;
    info!("Games found for {}: {}", date.format(QUERY_DATE_FORMAT), games.len());

    for (i, game) in games.iter().take(SAMPLE_SIZE).enumerate() {
        info!("--- Game {} ---", i + 1);
        info!("  game_id: {:?}", game.game_id());
        info!("  summary: {}", game.summary());
        info!("  status:  {}", game.status());
        for (key, value) in game.fields() {
            info!("    '{}': {}", key, json_type(value));
        }
    }

    Ok(())
}
