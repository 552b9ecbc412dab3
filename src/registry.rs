//! Franchise registry: maps free-text team names to franchise codes.
//!
//! The index is built once from the franchise history reference file for a
//! single reference year and is immutable afterwards. Callers hold it by
//! reference and pass it down to whatever needs to resolve names.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::ConfigError;

/// Marker used in the `LAST` column for a franchise identity still in use.
pub const OPEN_RANGE_TOKEN: &str = "Present";

/// One row of the franchise history reference file.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FranchiseEntry {
    #[serde(alias = "NICKNAME")]
    pub nickname: Option<String>,
    #[serde(alias = "CITY")]
    pub city: Option<String>,
    #[serde(alias = "FRANCHISE")]
    pub franchise: Option<String>,
    #[serde(alias = "FIRST")]
    pub first: Option<String>,
    #[serde(alias = "LAST")]
    pub last: Option<String>,
}

impl FranchiseEntry {
    pub fn new(nickname: &str, city: &str, franchise: &str, first: &str, last: &str) -> Self {
        let opt = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            nickname: opt(nickname),
            city: opt(city),
            franchise: opt(franchise),
            first: opt(first),
            last: opt(last),
        }
    }

    /// Active year range, with an open end mapped past `as_of_year`.
    fn active_range(&self, as_of_year: i32) -> Result<(i32, i32), String> {
        let first = self
            .first
            .as_deref()
            .map(str::trim)
            .ok_or_else(|| "missing first year".to_string())?;
        let first: i32 = first
            .parse()
            .map_err(|_| format!("invalid first year '{}'", first))?;

        let last = match self.last.as_deref().map(str::trim) {
            None | Some("") => as_of_year.saturating_add(1),
            Some(s) if s.eq_ignore_ascii_case(OPEN_RANGE_TOKEN) => as_of_year.saturating_add(1),
            Some(s) => s
                .parse()
                .map_err(|_| format!("invalid last year '{}'", s))?,
        };

        Ok((first, last))
    }
}

/// A single way of turning a team name into an index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Lower-cased full name, e.g. "boston red sox".
    FullName,
    /// Lower-cased last word, e.g. "sox".
    Nickname,
    /// Full name exactly as received.
    FullNameRaw,
    /// Last word exactly as received.
    NicknameRaw,
}

impl MatchStrategy {
    pub const DEFAULT_ORDER: [MatchStrategy; 4] = [
        MatchStrategy::FullName,
        MatchStrategy::Nickname,
        MatchStrategy::FullNameRaw,
        MatchStrategy::NicknameRaw,
    ];

    fn lookup<'a>(&self, index: &'a FranchiseIndex, team_name: &str) -> Option<&'a str> {
        let last_token = || team_name.split_whitespace().last();
        let hit = match self {
            MatchStrategy::FullName => index.by_full_name_lower.get(&team_name.to_lowercase()),
            MatchStrategy::Nickname => {
                last_token().and_then(|t| index.by_nickname_lower.get(&t.to_lowercase()))
            }
            MatchStrategy::FullNameRaw => index.by_full_name_lower.get(team_name),
            MatchStrategy::NicknameRaw => last_token().and_then(|t| index.by_nickname_lower.get(t)),
        };
        hit.map(String::as_str)
    }
}

impl FromStr for MatchStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full_name" => Ok(MatchStrategy::FullName),
            "nickname" => Ok(MatchStrategy::Nickname),
            "full_name_raw" => Ok(MatchStrategy::FullNameRaw),
            "nickname_raw" => Ok(MatchStrategy::NicknameRaw),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Parse a comma-separated strategy list such as `full_name,nickname`.
pub fn parse_strategies(list: &str) -> Result<Vec<MatchStrategy>, ConfigError> {
    let strategies = list
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(MatchStrategy::from_str)
        .collect::<Result<Vec<_>, _>>()?;

    if strategies.is_empty() {
        return Err(ConfigError::NoStrategies);
    }
    Ok(strategies)
}

/// Immutable name → franchise code index for one reference year.
#[derive(Debug, Clone)]
pub struct FranchiseIndex {
    as_of_year: i32,
    by_nickname_lower: HashMap<String, String>,
    by_full_name_lower: HashMap<String, String>,
    strategies: Vec<MatchStrategy>,
}

impl FranchiseIndex {
    /// Build the index from reference rows, keeping only identities whose
    /// active range contains `as_of_year`. Malformed rows are logged and
    /// skipped.
    pub fn build(
        rows: &[FranchiseEntry],
        as_of_year: i32,
        strategies: Vec<MatchStrategy>,
    ) -> Self {
        let mut by_nickname_lower = HashMap::new();
        let mut by_full_name_lower = HashMap::new();
        let mut skipped = 0usize;

        for row in rows {
            let Some(franchise) = row
                .franchise
                .as_deref()
                .map(str::trim)
                .filter(|f| !f.is_empty())
            else {
                continue;
            };

            let (first, last) = match row.active_range(as_of_year) {
                Ok(range) => range,
                Err(e) => {
                    warn!("Skipping franchise row {:?}: {}", row, e);
                    skipped += 1;
                    continue;
                }
            };

            if !(first..=last).contains(&as_of_year) {
                continue;
            }

            let Some(nickname) = row
                .nickname
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
            else {
                continue;
            };

            by_nickname_lower.insert(nickname.to_lowercase(), franchise.to_string());
            if let Some(city) = row.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
                by_full_name_lower.insert(
                    format!("{} {}", city, nickname).to_lowercase(),
                    franchise.to_string(),
                );
            }
        }

        info!(
            "Built franchise index for {}: {} nicknames, {} full names ({} rows skipped)",
            as_of_year,
            by_nickname_lower.len(),
            by_full_name_lower.len(),
            skipped
        );

        Self {
            as_of_year,
            by_nickname_lower,
            by_full_name_lower,
            strategies,
        }
    }

    /// Resolve a team name with the configured strategies, first hit wins.
    pub fn resolve(&self, team_name: &str) -> Option<&str> {
        self.resolve_with(team_name, &self.strategies)
    }

    pub fn resolve_with(&self, team_name: &str, strategies: &[MatchStrategy]) -> Option<&str> {
        strategies.iter().find_map(|s| s.lookup(self, team_name))
    }

    pub fn as_of_year(&self) -> i32 {
        self.as_of_year
    }

    pub fn strategies(&self) -> &[MatchStrategy] {
        &self.strategies
    }

    pub fn len(&self) -> usize {
        self.by_nickname_lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_nickname_lower.is_empty()
    }
}

/// Read every row of the franchise reference CSV.
///
/// Rows that fail to deserialize are logged and dropped; a missing or
/// unreadable file is an error.
pub fn load_reference(path: &Path) -> Result<Vec<FranchiseEntry>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open franchise reference file {}", path.display()))?;

    let mut rows = Vec::new();
    for (line, result) in rdr.deserialize::<FranchiseEntry>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => warn!("Skipping unreadable franchise row {}: {}", line + 2, e),
        }
    }

    info!("Loaded {} franchise rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn index(rows: &[FranchiseEntry], year: i32) -> FranchiseIndex {
        FranchiseIndex::build(rows, year, MatchStrategy::DEFAULT_ORDER.to_vec())
    }

    fn mets_history() -> Vec<FranchiseEntry> {
        vec![
            FranchiseEntry::new("Continentals", "New York", "NYN", "1960", "1961"),
            FranchiseEntry::new("Mets", "New York", "NYN", "1962", "1969"),
        ]
    }

    #[test]
    fn resolves_only_identities_active_in_reference_year() {
        let idx = index(&mets_history(), 1965);
        assert_eq!(idx.resolve("New York Mets"), Some("NYN"));
        assert_eq!(idx.resolve("Mets"), Some("NYN"));
        assert_eq!(idx.resolve("New York Continentals"), None);

        let idx = index(&mets_history(), 1961);
        assert_eq!(idx.resolve("New York Continentals"), Some("NYN"));
        assert_eq!(idx.resolve("Mets"), None);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let idx = index(&mets_history(), 1969);
        assert_eq!(idx.resolve("Mets"), Some("NYN"));
        let idx = index(&mets_history(), 1970);
        assert!(idx.is_empty());
    }

    #[test]
    fn open_ended_range_covers_reference_year() {
        let rows = vec![
            FranchiseEntry::new("Red Sox", "Boston", "BOS", "1908", "Present"),
            FranchiseEntry::new("Yankees", "New York", "NYA", "1913", ""),
        ];
        let idx = index(&rows, 2024);
        assert_eq!(idx.resolve("Boston Red Sox"), Some("BOS"));
        assert_eq!(idx.resolve("New York Yankees"), Some("NYA"));
    }

    #[test]
    fn open_ended_range_at_the_last_representable_year() {
        let rows = vec![FranchiseEntry::new("Red Sox", "Boston", "BOS", "1908", "Present")];
        let idx = index(&rows, i32::MAX);
        assert_eq!(idx.as_of_year(), i32::MAX);
        assert_eq!(idx.resolve("Boston Red Sox"), Some("BOS"));
    }

    #[test]
    fn full_name_match_wins_over_nickname() {
        let rows = vec![
            FranchiseEntry::new("Sox", "Chicago", "CHA", "1900", "Present"),
            FranchiseEntry::new("Sox", "Boston", "BOS", "1900", "Present"),
        ];
        let idx = index(&rows, 2024);
        assert_eq!(idx.resolve("Chicago Sox"), Some("CHA"));
        assert_eq!(idx.resolve("chicago sox"), Some("CHA"));
        // Nickname map is last-writer-wins on the shared nickname.
        assert_eq!(idx.resolve("Windy City Sox"), Some("BOS"));
    }

    #[test]
    fn nickname_fallback_uses_last_token_case_insensitively() {
        let rows = vec![FranchiseEntry::new("Mariners", "Seattle", "SEA", "1977", "Present")];
        let idx = index(&rows, 2024);
        assert_eq!(idx.resolve("SEATTLE-ish MARINERS"), Some("SEA"));
        assert_eq!(idx.resolve(""), None);
        assert_eq!(idx.resolve("   "), None);
    }

    #[test]
    fn strategy_order_is_configurable() {
        let rows = vec![FranchiseEntry::new("Sox", "Boston", "BOS", "1908", "Present")];
        let idx = FranchiseIndex::build(&rows, 2024, vec![MatchStrategy::FullName]);
        assert_eq!(idx.resolve("Boston Sox"), Some("BOS"));
        assert_eq!(idx.resolve("Other Sox"), None);
        assert_eq!(
            idx.resolve_with("Other Sox", &[MatchStrategy::Nickname]),
            Some("BOS")
        );
    }

    #[test]
    fn malformed_rows_are_skipped_not_fatal() {
        let rows = vec![
            FranchiseEntry::new("Broken", "Nowhere", "BRK", "19x0", "Present"),
            FranchiseEntry::new("Also", "Nowhere", "ALS", "1900", "soon"),
            FranchiseEntry::new("Orphans", "Nowhere", "", "1900", "Present"),
            FranchiseEntry::new("", "Nowhere", "NNK", "1900", "Present"),
            FranchiseEntry::new("Twins", "Minnesota", "MIN", "1961", "Present"),
        ];
        let idx = index(&rows, 2024);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.resolve("Minnesota Twins"), Some("MIN"));
        assert_eq!(idx.resolve("Nowhere Broken"), None);
    }

    #[test]
    fn missing_city_registers_nickname_only() {
        let rows = vec![FranchiseEntry::new("Rays", "", "TBA", "2008", "Present")];
        let idx = index(&rows, 2024);
        assert_eq!(idx.resolve("Tampa Bay Rays"), Some("TBA"));
        assert_eq!(
            idx.resolve_with("Tampa Bay Rays", &[MatchStrategy::FullName]),
            None
        );
    }

    #[test]
    fn parses_strategy_lists() {
        assert_eq!(
            parse_strategies("nickname, full_name").unwrap(),
            vec![MatchStrategy::Nickname, MatchStrategy::FullName]
        );
        assert_eq!(parse_strategies(" , "), Err(ConfigError::NoStrategies));
        assert_eq!(
            parse_strategies("full_name,fuzzy"),
            Err(ConfigError::UnknownStrategy("fuzzy".to_string()))
        );
    }

    #[test]
    fn loads_reference_csv_with_upper_case_headers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "FRANCHISE,LEAGUE,CITY,NICKNAME,FIRST,LAST").unwrap();
        writeln!(file, "BOS,AL,Boston,Red Sox,1908,Present").unwrap();
        writeln!(file, "ANA,AL,Los Angeles,Angels,2005,2015").unwrap();
        file.flush().unwrap();

        let rows = load_reference(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].franchise.as_deref(), Some("BOS"));
        assert_eq!(rows[1].last.as_deref(), Some("2015"));

        let idx = index(&rows, 2010);
        assert_eq!(idx.resolve("Los Angeles Angels"), Some("ANA"));
    }

    #[test]
    fn missing_reference_file_is_an_error() {
        assert!(load_reference(Path::new("/nonexistent/teams.csv")).is_err());
    }
}
