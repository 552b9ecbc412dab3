//! Game data shapes shared by the schedule client, resolver and store.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

/// One per-game attribute set as returned by a schedule query.
///
/// Nothing about the contents is guaranteed: every accessor returns an
/// `Option` and callers decide what a missing or malformed field means.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RawGameObservation {
    fields: Map<String, Value>,
}

impl RawGameObservation {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Raw value for a key, with JSON `null` treated as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// String form of a scalar field. Numbers are rendered as text so that
    /// numeric identifiers compare equal to their stored string form.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// External game identifier, if present and non-blank.
    pub fn game_id(&self) -> Option<String> {
        self.text("game_id")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn status(&self) -> String {
        self.text("status").unwrap_or_default()
    }

    pub fn game_type(&self) -> Option<String> {
        self.text("game_type")
    }

    pub fn summary(&self) -> String {
        self.text("summary").unwrap_or_else(|| "N/A".to_string())
    }

    /// True when the reported status means the game is over.
    pub fn is_final(&self) -> bool {
        let status = self.status().trim().to_lowercase();
        status == "final"
            || status == "game over"
            || status == "completed"
            || status.starts_with("completed early")
    }

    pub fn is_regular_season(&self) -> bool {
        self.game_type().as_deref() == Some("R")
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl From<Value> for RawGameObservation {
    /// Anything other than a JSON object becomes an empty observation.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }
}

/// A completed game with both teams resolved to franchise codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalGameRecord {
    pub game_id: String,
    pub date: NaiveDate,
    pub visitor_franchise: String,
    pub home_franchise: String,
    pub visitor_score: i32,
    pub home_score: i32,
}

/// A row as read back from the store for export.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredGameRow {
    pub game_id: Option<String>,
    pub date: String,
    pub visitor_team: String,
    pub home_team: String,
    pub visitor_score: i32,
    pub home_score: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_game_ids_are_rendered_as_text() {
        let obs = RawGameObservation::from(json!({"game_id": 745123}));
        assert_eq!(obs.game_id().as_deref(), Some("745123"));

        let obs = RawGameObservation::from(json!({"game_id": "  "}));
        assert_eq!(obs.game_id(), None);

        let obs = RawGameObservation::from(json!({"game_id": null}));
        assert_eq!(obs.game_id(), None);
    }

    #[test]
    fn finality_matches_known_statuses() {
        for status in [
            "Final",
            "final",
            "Game Over",
            "Completed",
            "Completed Early: Rain",
            "completed early",
        ] {
            let obs = RawGameObservation::from(json!({"status": status}));
            assert!(obs.is_final(), "{status} should be final");
        }
        for status in ["In Progress", "Scheduled", "Postponed", "Final: Tied?", ""] {
            let obs = RawGameObservation::from(json!({"status": status}));
            assert!(!obs.is_final(), "{status} should not be final");
        }
        assert!(!RawGameObservation::default().is_final());
    }

    #[test]
    fn only_exact_r_is_regular_season() {
        assert!(RawGameObservation::from(json!({"game_type": "R"})).is_regular_season());
        assert!(!RawGameObservation::from(json!({"game_type": "r"})).is_regular_season());
        assert!(!RawGameObservation::from(json!({"game_type": "S"})).is_regular_season());
        assert!(!RawGameObservation::from(json!({})).is_regular_season());
    }

    #[test]
    fn non_object_values_become_empty() {
        let obs = RawGameObservation::from(json!([1, 2, 3]));
        assert!(obs.fields().is_empty());
    }
}
