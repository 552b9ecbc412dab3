//! Turns a raw schedule observation into a canonical game record.

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::{Side, SkipReason};
use crate::models::{CanonicalGameRecord, RawGameObservation};
use crate::registry::FranchiseIndex;

const ESSENTIAL_KEYS: [&str; 4] = ["away_name", "home_name", "away_score", "home_score"];

/// Validate and normalize one observation.
///
/// Checks run in a fixed order and the first failure wins. The function has
/// no side effects; the caller logs the returned skip reason.
pub fn resolve_game(
    obs: &RawGameObservation,
    index: &FranchiseIndex,
) -> Result<CanonicalGameRecord, SkipReason> {
    let raw_date = obs
        .text("game_date")
        .filter(|d| !d.trim().is_empty())
        .ok_or(SkipReason::MissingGameDate)?;

    if let Some(missing) = ESSENTIAL_KEYS.into_iter().find(|k| obs.get(k).is_none()) {
        return Err(SkipReason::IncompleteGame(missing));
    }

    let date = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d")
        .map_err(|_| SkipReason::InvalidGameDate(raw_date.clone()))?;

    let visitor_franchise = resolve_side(obs, index, "away_name", Side::Visitor)?;
    let home_franchise = resolve_side(obs, index, "home_name", Side::Home)?;

    let visitor_score = parse_score(obs, "away_score", Side::Visitor)?;
    let home_score = parse_score(obs, "home_score", Side::Home)?;

    Ok(CanonicalGameRecord {
        // Observations reach the resolver keyed by id; an id-less one still
        // resolves so the resolver stays usable on its own.
        game_id: obs.game_id().unwrap_or_default(),
        date,
        visitor_franchise,
        home_franchise,
        visitor_score,
        home_score,
    })
}

fn resolve_side(
    obs: &RawGameObservation,
    index: &FranchiseIndex,
    key: &str,
    side: Side,
) -> Result<String, SkipReason> {
    let name = obs.text(key).unwrap_or_default();
    index
        .resolve(&name)
        .map(str::to_string)
        .ok_or(SkipReason::UnknownTeam { side, name })
}

fn parse_score(obs: &RawGameObservation, key: &str, side: Side) -> Result<i32, SkipReason> {
    let value = obs.get(key);
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed
        .filter(|n| *n >= 0)
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| SkipReason::InvalidScore {
            side,
            value: value.map(|v| v.to_string()).unwrap_or_default(),
        })
}
