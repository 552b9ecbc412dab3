//! Typed errors for the ingestion pipeline.
//!
//! Fatal startup problems travel as `anyhow::Error` with context; the enums
//! here are the domain errors that callers match on or log.

use thiserror::Error;

/// Configuration problems detected while reading the environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is set but empty")]
    EmptyValue(&'static str),

    #[error("{key} has an invalid value '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("unknown team match strategy '{0}'")]
    UnknownStrategy(String),

    #[error("TEAM_MATCH_STRATEGIES must name at least one strategy")]
    NoStrategies,
}

/// Which participant of a game a team name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Visitor,
    Home,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Visitor => f.write_str("visitor"),
            Side::Home => f.write_str("home"),
        }
    }
}

/// Why a raw observation was not turned into a canonical record.
///
/// A skip is a normal outcome: the cycle logs it and moves on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SkipReason {
    #[error("missing game_date")]
    MissingGameDate,

    #[error("incomplete essential game data (missing {0})")]
    IncompleteGame(&'static str),

    #[error("game_date '{0}' is not an ISO calendar date")]
    InvalidGameDate(String),

    #[error("no franchise mapping for {side} team '{name}'")]
    UnknownTeam { side: Side, name: String },

    #[error("non-integer or negative {side} score '{value}'")]
    InvalidScore { side: Side, value: String },
}

/// Failure of a single schedule query for one date.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("schedule API error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse schedule response: {0}")]
    Parse(#[from] serde_json::Error),
}
