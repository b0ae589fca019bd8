//! Project code (PEP) list
//!
//! Records store the `CODE — description` label as text, so removing a code
//! here never touches existing records.

use rnc_common::db::ProjectCode;
use rnc_common::{Error, Result};
use serde::Serialize;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::info;

use crate::transfer;

/// Normalized header names accepted for the code column
const CODE_COLUMNS: [&str; 3] = ["code", "project_code", "codigo"];

/// Normalized header names accepted for the description column
const DESCRIPTION_COLUMNS: [&str; 2] = ["description", "descrição"];

/// Outcome of a bulk add
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkSummary {
    pub added: usize,
    pub skipped: usize,
}

/// All codes, sorted by code
pub async fn list(pool: &SqlitePool) -> Result<Vec<ProjectCode>> {
    let rows = sqlx::query("SELECT id, code, description FROM project_codes ORDER BY code")
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| {
            Ok(ProjectCode {
                id: row.try_get("id")?,
                code: row.try_get("code")?,
                description: row.try_get("description")?,
            })
        })
        .collect()
}

/// Add one code. Returns `false` when the code was already listed.
pub async fn add(pool: &SqlitePool, code: &str, description: Option<&str>) -> Result<bool> {
    let code = code.trim();
    if code.is_empty() {
        return Err(Error::InvalidInput("code is required".to_string()));
    }

    let mut conn = pool.acquire().await?;
    let inserted = insert_ignoring_duplicate(&mut conn, code, description).await?;
    if inserted {
        info!("Added project code {}", code);
    }
    Ok(inserted)
}

/// Add codes from `CODE — description` labels (or bare codes).
///
/// Blank labels and codes already present are skipped.
pub async fn add_bulk<S: AsRef<str>>(pool: &SqlitePool, labels: &[S]) -> Result<BulkSummary> {
    let entries: Vec<(String, Option<String>)> = labels
        .iter()
        .map(|label| label.as_ref().trim())
        .filter(|label| !label.is_empty())
        .map(ProjectCode::split_label)
        .collect();
    add_entries(pool, &entries).await
}

/// Import a code list from CSV text with a `code` column and an optional
/// `description` column
pub async fn import_csv(pool: &SqlitePool, text: &str) -> Result<BulkSummary> {
    let entries = parse_csv(text)?;
    add_entries(pool, &entries).await
}

/// Remove a code from the list
pub async fn remove(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM project_codes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("project code {}", id)));
    }

    info!("Removed project code {}", id);
    Ok(())
}

async fn add_entries(
    pool: &SqlitePool,
    entries: &[(String, Option<String>)],
) -> Result<BulkSummary> {
    let mut summary = BulkSummary::default();
    let mut tx = pool.begin().await?;

    for (code, description) in entries {
        if code.is_empty() {
            summary.skipped += 1;
        } else if insert_ignoring_duplicate(&mut tx, code, description.as_deref()).await? {
            summary.added += 1;
        } else {
            summary.skipped += 1;
        }
    }

    tx.commit().await?;
    info!(
        "Project code list updated: {} added, {} skipped",
        summary.added, summary.skipped
    );
    Ok(summary)
}

async fn insert_ignoring_duplicate(
    conn: &mut SqliteConnection,
    code: &str,
    description: Option<&str>,
) -> Result<bool> {
    let description = description.map(str::trim).filter(|s| !s.is_empty());
    let result = sqlx::query("INSERT OR IGNORE INTO project_codes (code, description) VALUES (?, ?)")
        .bind(code)
        .bind(description)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Parse a code list; the header must name a `code` column.
///
/// A code cell may hold a full `CODE — description` label. A non-blank
/// `description` cell takes precedence over the label's description.
pub fn parse_csv(text: &str) -> Result<Vec<(String, Option<String>)>> {
    let text = transfer::strip_bom(text);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(transfer::sniff_delimiter(text))
        .flexible(true)
        .from_reader(text.as_bytes());

    // Header names arrive normalized, so `pep` is already `project_code`
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::Import(format!("unreadable header: {}", e)))?
        .iter()
        .map(transfer::normalize_header)
        .collect();

    let code_idx = headers
        .iter()
        .position(|h| CODE_COLUMNS.contains(&h.as_str()))
        .ok_or_else(|| Error::Import("missing required column 'code'".to_string()))?;
    let desc_idx = headers
        .iter()
        .position(|h| DESCRIPTION_COLUMNS.contains(&h.as_str()));

    let mut entries = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row.map_err(|e| Error::Import(format!("row {}: {}", i + 2, e)))?;
        let (code, label_description) = ProjectCode::split_label(row.get(code_idx).unwrap_or(""));
        let description = desc_idx
            .and_then(|idx| row.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or(label_description);
        entries.push((code, description));
    }

    Ok(entries)
}
