//! MLB Stats API schedule client.
//!
//! Each game in a schedule response is flattened into a `RawGameObservation`
//! with the keys the resolver reads (`game_id`, `game_date`, `away_name`, ...).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::ScheduleError;
use crate::models::RawGameObservation;

/// Date layout the schedule endpoint expects.
pub const QUERY_DATE_FORMAT: &str = "%m/%d/%Y";

/// Anything that can list the games scheduled on a date.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn games_on(&self, date: NaiveDate) -> Result<Vec<RawGameObservation>, ScheduleError>;
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ScheduleResponse {
    pub dates: Vec<ScheduleDate>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ScheduleDate {
    pub date: Option<String>,
    pub games: Vec<ScheduleGame>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ScheduleGame {
    pub game_pk: Option<Value>,
    pub game_type: Option<String>,
    pub status: GameStatus,
    pub teams: GameTeams,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GameStatus {
    pub detailed_state: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct GameTeams {
    pub away: TeamSide,
    pub home: TeamSide,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct TeamSide {
    pub team: TeamRef,
    pub score: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct TeamRef {
    pub name: Option<String>,
}

fn opt_string(v: &Option<String>) -> Value {
    v.clone().map(Value::String).unwrap_or(Value::Null)
}

fn score_text(v: &Option<Value>) -> String {
    match v {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => "-".to_string(),
    }
}

impl ScheduleGame {
    fn into_observation(self, date: Option<&str>) -> RawGameObservation {
        let away_name = self.teams.away.team.name;
        let home_name = self.teams.home.team.name;
        let status = self.status.detailed_state;

        let summary = format!(
            "{} - {} ({}) @ {} ({}) ({})",
            date.unwrap_or("?"),
            away_name.as_deref().unwrap_or("?"),
            score_text(&self.teams.away.score),
            home_name.as_deref().unwrap_or("?"),
            score_text(&self.teams.home.score),
            status.as_deref().unwrap_or("?"),
        );

        let mut fields = Map::new();
        fields.insert("game_id".into(), self.game_pk.unwrap_or(Value::Null));
        fields.insert(
            "game_date".into(),
            date.map(|d| Value::String(d.to_string())).unwrap_or(Value::Null),
        );
        fields.insert("game_type".into(), opt_string(&self.game_type));
        fields.insert("status".into(), opt_string(&status));
        fields.insert("away_name".into(), opt_string(&away_name));
        fields.insert("home_name".into(), opt_string(&home_name));
        fields.insert("away_score".into(), self.teams.away.score.unwrap_or(Value::Null));
        fields.insert("home_score".into(), self.teams.home.score.unwrap_or(Value::Null));
        fields.insert("summary".into(), Value::String(summary));
        RawGameObservation::new(fields)
    }
}

impl ScheduleResponse {
    /// Flatten every game of every date block into observations.
    pub fn into_observations(self) -> Vec<RawGameObservation> {
        self.dates
            .into_iter()
            .flat_map(|d| {
                let date = d.date;
                d.games
                    .into_iter()
                    .map(move |g| g.into_observation(date.as_deref()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// HTTP client for `{base}/schedule`.
pub struct StatsApiClient {
    base_url: String,
    sport_id: u32,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
    http_client: reqwest::Client,
}

impl StatsApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let per_minute =
            NonZeroU32::new(config.schedule_requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_minute(per_minute));

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("scorigami-ingest/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.http_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.schedule_api_base.trim_end_matches('/').to_string(),
            sport_id: config.sport_id,
            rate_limiter,
            http_client,
        })
    }
}

#[async_trait]
impl ScheduleSource for StatsApiClient {
    async fn games_on(&self, date: NaiveDate) -> Result<Vec<RawGameObservation>, ScheduleError> {
        self.rate_limiter.until_ready().await;

        let query_date = date.format(QUERY_DATE_FORMAT).to_string();
        let url = format!("{}/schedule", self.base_url);
        debug!("GET {} date={}", url, query_date);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("sportId", self.sport_id.to_string()),
                ("date", query_date.clone()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ScheduleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let schedule: ScheduleResponse = serde_json::from_str(&body)?;
        let observations = schedule.into_observations();
        debug!("Stats API returned {} game(s) for {}", observations.len(), query_date);
        Ok(observations)
    }
}
