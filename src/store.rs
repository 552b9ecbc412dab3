//! Persistence boundary for canonical game rows.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::{CanonicalGameRecord, StoredGameRow};

/// Postgres SQLSTATE codes meaning the schema predates game identifiers.
const UNDEFINED_COLUMN: &str = "42703";
const UNDEFINED_TABLE: &str = "42P01";

/// Where accepted games are persisted and read back from.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Every distinct game id already persisted. A store whose schema has no
    /// identifier yet answers with the empty set.
    async fn known_game_ids(&self) -> Result<HashSet<String>>;

    /// Insert all games in one unit; either every row lands or none does.
    async fn append_games(&self, games: &[CanonicalGameRecord]) -> Result<usize>;

    /// Full history ordered by date, then game id.
    async fn all_games(&self) -> Result<Vec<StoredGameRow>>;
}

/// Postgres-backed game store over the `gamelogs` table.
pub struct PgGameStore {
    db: PgPool,
    date_format: String,
}

impl PgGameStore {
    pub async fn connect(url: &str, max_attempts: u32, date_format: &str) -> Result<Self> {
        let db = Self::connect_db_with_retry(url, max_attempts).await?;
        Ok(Self {
            db,
            date_format: date_format.to_string(),
        })
    }

    async fn connect_db_with_retry(url: &str, max_attempts: u32) -> Result<PgPool> {
        let mut attempt = 0;
        loop {
            match PgPoolOptions::new()
                .max_connections(2)
                .connect(url)
                .await
            {
                Ok(pool) => {
                    info!("Connected to PostgreSQL");
                    return Ok(pool);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_attempts.max(1) {
                        return Err(anyhow!(
                            "Failed to connect to database after {} attempt(s): {}",
                            attempt,
                            e
                        ));
                    }
                    warn!("Database connection attempt {} failed: {}. Retrying...", attempt, e);
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                }
            }
        }
    }

    /// Create the tables and columns this service writes, leaving any
    /// existing rows (e.g. from a bulk historical load) untouched.
    pub async fn bootstrap_schema(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS gamelogs (
                date TEXT NOT NULL,
                visitor_team TEXT NOT NULL,
                home_team TEXT NOT NULL,
                visitor_score INTEGER NOT NULL,
                home_score INTEGER NOT NULL
            )
            "#,
            "ALTER TABLE gamelogs ADD COLUMN IF NOT EXISTS game_id TEXT",
            "ALTER TABLE gamelogs ADD COLUMN IF NOT EXISTS visitor_team_id INTEGER",
            "ALTER TABLE gamelogs ADD COLUMN IF NOT EXISTS home_team_id INTEGER",
            "CREATE UNIQUE INDEX IF NOT EXISTS gamelogs_game_id_key ON gamelogs (game_id)",
            r#"
            CREATE TABLE IF NOT EXISTS franchise_team_ids (
                franchise_code TEXT PRIMARY KEY,
                team_id INTEGER NOT NULL
            )
            "#,
        ];

        for sql in statements {
            sqlx::query(sql)
                .execute(&self.db)
                .await
                .with_context(|| format!("Schema bootstrap failed on: {}", sql.trim()))?;
        }

        info!("Schema bootstrap complete");
        Ok(())
    }
}

fn is_missing_schema(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => is_missing_schema_code(db_err.code().as_deref()),
        _ => false,
    }
}

fn is_missing_schema_code(code: Option<&str>) -> bool {
    matches!(code, Some(UNDEFINED_COLUMN) | Some(UNDEFINED_TABLE))
}

#[async_trait]
impl GameStore for PgGameStore {
    async fn known_game_ids(&self) -> Result<HashSet<String>> {
        let rows: Result<Vec<(String,)>, sqlx::Error> = sqlx::query_as(
            "SELECT DISTINCT game_id FROM gamelogs WHERE game_id IS NOT NULL",
        )
        .fetch_all(&self.db)
        .await;

        match rows {
            Ok(rows) => Ok(rows.into_iter().map(|(id,)| id).collect()),
            Err(e) if is_missing_schema(&e) => {
                warn!("gamelogs has no game_id column yet; starting with no known games");
                Ok(HashSet::new())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to load known game ids")),
        }
    }

    async fn append_games(&self, games: &[CanonicalGameRecord]) -> Result<usize> {
        if games.is_empty() {
            return Ok(0);
        }

        let mut tx = self.db.begin().await?;

        for game in games {
            sqlx::query(
                r#"
                INSERT INTO gamelogs (
                    game_id, date, visitor_team, home_team, visitor_score, home_score,
                    visitor_team_id, home_team_id
                ) VALUES (
                    $1, $2, $3, $4, $5, $6,
                    (SELECT team_id FROM franchise_team_ids WHERE franchise_code = $3),
                    (SELECT team_id FROM franchise_team_ids WHERE franchise_code = $4)
                )
                "#,
            )
            .bind(&game.game_id)
            .bind(game.date.format(&self.date_format).to_string())
            .bind(&game.visitor_franchise)
            .bind(&game.home_franchise)
            .bind(game.visitor_score)
            .bind(game.home_score)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert game {}", game.game_id))?;
        }

        tx.commit().await.context("Failed to commit game batch")?;
        info!("Stored {} game(s)", games.len());
        Ok(games.len())
    }

    async fn all_games(&self) -> Result<Vec<StoredGameRow>> {
        // Casts keep rows from older bulk loads (numeric scores, typed
        // dates) readable.
        let rows: Vec<StoredGameRow> = sqlx::query_as(
            r#"
            SELECT
                game_id,
                date::TEXT AS date,
                visitor_team,
                home_team,
                CAST(visitor_score AS INTEGER) AS visitor_score,
                CAST(home_score AS INTEGER) AS home_score
            FROM gamelogs
            ORDER BY date, game_id
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("Failed to read gamelogs")?;

        Ok(rows)
    }
}
