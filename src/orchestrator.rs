//! One ingestion cycle: query the trailing two-day window, merge, filter,
//! resolve, and persist new completed regular-season games.

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

use crate::models::{CanonicalGameRecord, RawGameObservation};
use crate::registry::FranchiseIndex;
use crate::resolver::resolve_game;
use crate::schedule::ScheduleSource;
use crate::store::GameStore;
use crate::tracker::IngestedGameSet;

/// Counters and accepted rows from a single cycle.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CycleReport {
    /// Observations returned across all queried dates.
    pub observed: usize,
    /// Distinct game ids after merging.
    pub merged: usize,
    /// Final, regular-season, not-yet-ingested candidates.
    pub candidates: usize,
    /// Candidates rejected by the resolver.
    pub skipped: usize,
    /// Dates whose query failed.
    pub failed_dates: Vec<NaiveDate>,
    /// Records durably appended to the store.
    pub persisted: Vec<CanonicalGameRecord>,
}

impl CycleReport {
    pub fn accepted_any(&self) -> bool {
        !self.persisted.is_empty()
    }
}

/// The dates a cycle queries, oldest first: yesterday and today (UTC).
pub fn query_window(now: DateTime<Utc>) -> [NaiveDate; 2] {
    let today = now.date_naive();
    [today - Duration::days(1), today]
}

/// Merge observations keyed by game id; a later observation of the same id
/// replaces an earlier one. Observations without an id are dropped.
pub fn merge_observations<I>(observations: I) -> BTreeMap<String, RawGameObservation>
where
    I: IntoIterator<Item = RawGameObservation>,
{
    let mut merged = BTreeMap::new();
    for obs in observations {
        match obs.game_id() {
            Some(id) => {
                merged.insert(id, obs);
            }
            None => warn!(
                "Observation without game_id dropped (summary: {})",
                obs.summary()
            ),
        }
    }
    merged
}

/// Drives ingestion cycles against a schedule source and a game store.
pub struct IngestionCycle<'a> {
    index: &'a FranchiseIndex,
    source: &'a dyn ScheduleSource,
    store: &'a dyn GameStore,
}

impl<'a> IngestionCycle<'a> {
    pub fn new(
        index: &'a FranchiseIndex,
        source: &'a dyn ScheduleSource,
        store: &'a dyn GameStore,
    ) -> Self {
        Self {
            index,
            source,
            store,
        }
    }

    /// Run one cycle as of `now`.
    ///
    /// Errors only when the set of already-ingested games cannot be loaded;
    /// query, resolution and append failures are logged and reflected in the
    /// report instead.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let mut report = CycleReport::default();
        let mut ingested = IngestedGameSet::load(self.store).await?;

        let window = query_window(now);
        info!("Checking for games. Query dates: {:?}", window);

        let mut fetched = Vec::new();
        for date in window {
            match self.source.games_on(date).await {
                Ok(games) => {
                    info!("Schedule for {} returned {} game(s)", date, games.len());
                    fetched.extend(games);
                }
                Err(e) => {
                    warn!("Failed to fetch schedule for {}: {}", date, e);
                    report.failed_dates.push(date);
                }
            }
        }
        report.observed = fetched.len();

        let merged = merge_observations(fetched);
        report.merged = merged.len();

        let mut batch = Vec::new();
        for (game_id, obs) in &merged {
            if !obs.is_final() || !obs.is_regular_season() || ingested.contains(game_id) {
                continue;
            }
            report.candidates += 1;
            info!("New final game found: {} ({})", game_id, obs.summary());

            match resolve_game(obs, self.index) {
                Ok(record) => {
                    if ingested.mark(game_id) {
                        batch.push(record);
                    }
                }
                Err(reason) => {
                    report.skipped += 1;
                    warn!("Skipping game {}: {}", game_id, reason);
                }
            }
        }

        if batch.is_empty() {
            info!("No new final regular season games to add in this run");
            return Ok(report);
        }

        info!("Appending {} new game(s) to gamelogs", batch.len());
        match self.store.append_games(&batch).await {
            Ok(_) => {
                info!("Successfully appended {} game(s)", batch.len());
                report.persisted = batch;
            }
            Err(e) => {
                let payload = serde_json::to_string(&batch)
                    .unwrap_or_else(|_| format!("{:?}", batch));
                error!(
                    "Failed to append {} game(s): {:?}. Batch for manual replay: {}",
                    batch.len(),
                    e,
                    payload
                );
            }
        }

        Ok(report)
    }
}
