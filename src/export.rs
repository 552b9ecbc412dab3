//! Flat-file export of the full game history.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::models::StoredGameRow;
use crate::store::GameStore;

const HEADER: [&str; 5] = [
    "date",
    "visitor_team",
    "home_team",
    "visitor_score",
    "home_score",
];

/// Escape a field for an unquoted comma-delimited file: backslash, comma,
/// CR and LF get a leading backslash, and quote characters are dropped.
pub fn escape_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for ch in field.chars() {
        match ch {
            '"' => continue,
            '\\' | ',' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

/// Write rows to `path`, replacing any previous export atomically. The
/// game id only orders rows and is not written.
pub fn write_rows(path: &Path, rows: &[StoredGameRow]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    }

    let tmp_path = path.with_extension("csv.tmp");
    let result = write_file(&tmp_path, rows).and_then(|()| {
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to move export into place at {}", path.display()))
    });
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_file(tmp_path: &Path, rows: &[StoredGameRow]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .from_path(tmp_path)
        .with_context(|| format!("Failed to create {}", tmp_path.display()))?;

    wtr.write_record(HEADER)?;
    for row in rows {
        wtr.write_record([
            escape_field(&row.date),
            escape_field(&row.visitor_team),
            escape_field(&row.home_team),
            row.visitor_score.to_string(),
            row.home_score.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Re-read the whole history from the store and write it to `path`.
pub async fn export_history(store: &dyn GameStore, path: &Path) -> Result<usize> {
    info!("Exporting all gamelogs to {}", path.display());
    let rows = store.all_games().await?;
    write_rows(path, &rows)?;
    info!("Saved {} gamelogs to {}", rows.len(), path.display());
    Ok(rows.len())
}
