//! Environment-driven configuration.

use anyhow::{anyhow, Context, Result};
use chrono::format::{Item, StrftimeItems};
use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::registry::{parse_strategies, MatchStrategy};

const DB_PASSWORD_SECRET: &str = "/run/secrets/db_password";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub teams_csv_path: PathBuf,
    pub export_path: PathBuf,
    pub schedule_api_base: String,
    pub sport_id: u32,
    /// Year the franchise index is built for; `None` means the current UTC year.
    pub registry_year: Option<i32>,
    pub match_strategies: Vec<MatchStrategy>,
    /// chrono layout of the `date` column in the store.
    pub store_date_format: String,
    pub db_connect_attempts: u32,
    pub auto_migrate: bool,
    pub schedule_requests_per_minute: u32,
    pub http_timeout_seconds: Option<u64>,
}

impl Config {
    /// Read configuration from the process environment (after `.env`, if
    /// present, has been loaded by the caller).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = match lookup("DATABASE_URL") {
            Some(v) if !v.trim().is_empty() => v,
            Some(_) => return Err(ConfigError::EmptyValue("DATABASE_URL").into()),
            None => {
                let db_user = required(&lookup, "DB_USER")?;
                let db_name = optional(&lookup, "DB_NAME", "mlb_scorigami")?;
                let db_host = optional(&lookup, "DB_HOST", "localhost")?;
                let db_port = optional(&lookup, "DB_PORT", "5432")?;
                // An empty password is valid for a local trust-auth database.
                let db_password = match lookup("DB_PASSWORD") {
                    Some(v) => v,
                    None => read_secret_file(DB_PASSWORD_SECRET, "db_password")?,
                };
                format!(
                    "postgresql://{}:{}@{}:{}/{}",
                    db_user, db_password, db_host, db_port, db_name
                )
            }
        };

        let match_strategies = match lookup("TEAM_MATCH_STRATEGIES") {
            Some(list) => parse_strategies(&list)?,
            None => MatchStrategy::DEFAULT_ORDER.to_vec(),
        };

        let registry_year = lookup("REGISTRY_YEAR")
            .map(|v| parse_value("REGISTRY_YEAR", &v))
            .transpose()?;

        let http_timeout_seconds = lookup("HTTP_TIMEOUT_SECONDS")
            .map(|v| parse_value("HTTP_TIMEOUT_SECONDS", &v))
            .transpose()?;

        let schedule_requests_per_minute: u32 = parse_value(
            "SCHEDULE_REQUESTS_PER_MINUTE",
            &lookup("SCHEDULE_REQUESTS_PER_MINUTE").unwrap_or_else(|| "30".to_string()),
        )?;
        if schedule_requests_per_minute == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SCHEDULE_REQUESTS_PER_MINUTE",
                value: "0".to_string(),
            }
            .into());
        }

        let store_date_format = optional(&lookup, "STORE_DATE_FORMAT", "%Y%m%d")?;
        if StrftimeItems::new(&store_date_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::InvalidValue {
                key: "STORE_DATE_FORMAT",
                value: store_date_format,
            }
            .into());
        }

        Ok(Self {
            database_url,
            teams_csv_path: optional(&lookup, "TEAMS_CSV_PATH", "teams_with_franchise.csv")?
                .into(),
            export_path: optional(&lookup, "EXPORT_PATH", "outputs/mlb_franchise_gamelogs.csv")?
                .into(),
            schedule_api_base: optional(
                &lookup,
                "SCHEDULE_API_BASE",
                "https://statsapi.mlb.com/api/v1",
            )?,
            sport_id: parse_value(
                "SPORT_ID",
                &lookup("SPORT_ID").unwrap_or_else(|| "1".to_string()),
            )?,
            registry_year,
            match_strategies,
            store_date_format,
            db_connect_attempts: parse_value(
                "DB_CONNECT_ATTEMPTS",
                &lookup("DB_CONNECT_ATTEMPTS").unwrap_or_else(|| "1".to_string()),
            )?,
            auto_migrate: lookup("AUTO_MIGRATE")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(true),
            schedule_requests_per_minute,
            http_timeout_seconds,
        })
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(ConfigError::EmptyValue(key).into()),
        None => Err(anyhow!(
            "Database credentials incomplete: set DATABASE_URL or {}",
            key
        )),
    }
}

/// Value of `key`, or `default` when unset. Set-but-blank is an error.
fn optional<F>(lookup: &F, key: &'static str, default: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) if v.trim().is_empty() => Err(ConfigError::EmptyValue(key)),
        Some(v) => Ok(v),
        None => Ok(default.to_string()),
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

/// Read a secret from a mounted secret file.
fn read_secret_file(file_path: &str, secret_name: &str) -> Result<String> {
    std::fs::read_to_string(file_path)
        .map(|s| s.trim().to_string())
        .with_context(|| {
            format!(
                "Secret file not found at {} ({}). Set DB_PASSWORD or mount the secret.",
                file_path, secret_name
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_with_database_url() {
        let cfg = config(&[("DATABASE_URL", "postgresql://u:p@db:5432/x")]).unwrap();
        assert_eq!(cfg.database_url, "postgresql://u:p@db:5432/x");
        assert_eq!(cfg.teams_csv_path, PathBuf::from("teams_with_franchise.csv"));
        assert_eq!(
            cfg.export_path,
            PathBuf::from("outputs/mlb_franchise_gamelogs.csv")
        );
        assert_eq!(cfg.sport_id, 1);
        assert_eq!(cfg.registry_year, None);
        assert_eq!(cfg.match_strategies, MatchStrategy::DEFAULT_ORDER.to_vec());
        assert_eq!(cfg.store_date_format, "%Y%m%d");
        assert_eq!(cfg.db_connect_attempts, 1);
        assert!(cfg.auto_migrate);
        assert_eq!(cfg.http_timeout_seconds, None);
    }

    #[test]
    fn builds_url_from_parts() {
        let cfg = config(&[
            ("DB_USER", "scorer"),
            ("DB_PASSWORD", "hunter2"),
            ("DB_HOST", "pg"),
        ])
        .unwrap();
        assert_eq!(cfg.database_url, "postgresql://scorer:hunter2@pg:5432/mlb_scorigami");
    }

    #[test]
    fn empty_password_is_allowed_but_other_empty_parts_are_not() {
        let cfg = config(&[("DB_USER", "scorer"), ("DB_PASSWORD", "")]).unwrap();
        assert_eq!(cfg.database_url, "postgresql://scorer:@localhost:5432/mlb_scorigami");

        for key in ["DB_NAME", "DB_HOST", "DB_PORT"] {
            let err = config(&[("DB_USER", "scorer"), ("DB_PASSWORD", ""), (key, " ")])
                .unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<ConfigError>(),
                    Some(ConfigError::EmptyValue(k)) if *k == key
                ),
                "{key}: {err}"
            );
        }
    }

    #[test]
    fn empty_paths_are_rejected() {
        let url = ("DATABASE_URL", "postgresql://localhost/x");
        assert!(config(&[url, ("TEAMS_CSV_PATH", "")]).is_err());
        assert!(config(&[url, ("EXPORT_PATH", "")]).is_err());
        assert!(config(&[url, ("SCHEDULE_API_BASE", "")]).is_err());
    }

    #[test]
    fn incomplete_credentials_are_fatal() {
        assert!(config(&[]).is_err());
        assert!(config(&[("DATABASE_URL", "  ")]).is_err());
        assert!(config(&[("DB_USER", "")]).is_err());
    }

    #[test]
    fn parses_overrides() {
        let cfg = config(&[
            ("DATABASE_URL", "postgresql://localhost/x"),
            ("REGISTRY_YEAR", "1965"),
            ("TEAM_MATCH_STRATEGIES", "nickname,full_name"),
            ("AUTO_MIGRATE", "false"),
            ("HTTP_TIMEOUT_SECONDS", "20"),
        ])
        .unwrap();
        assert_eq!(cfg.registry_year, Some(1965));
        assert_eq!(
            cfg.match_strategies,
            vec![MatchStrategy::Nickname, MatchStrategy::FullName]
        );
        assert!(!cfg.auto_migrate);
        assert_eq!(cfg.http_timeout_seconds, Some(20));
    }

    #[test]
    fn rejects_bad_values() {
        let url = ("DATABASE_URL", "postgresql://localhost/x");
        assert!(config(&[url, ("REGISTRY_YEAR", "soon")]).is_err());
        assert!(config(&[url, ("TEAM_MATCH_STRATEGIES", "fuzzy")]).is_err());
        assert!(config(&[url, ("SCHEDULE_REQUESTS_PER_MINUTE", "0")]).is_err());
        assert!(config(&[url, ("STORE_DATE_FORMAT", "%Y%m%")]).is_err());
        assert!(config(&[url, ("STORE_DATE_FORMAT", "%Y-%m-%d")]).is_ok());
    }
}
