//! Database initialization
//!
//! Creates the database file on first run and brings the schema up to date.
//! Every statement is idempotent, so startup can call this unconditionally.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Current schema version, recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Database file name inside the data folder
pub const DATABASE_FILE: &str = "rnc.db";

/// Open (creating if needed) the database at `db_path` and create tables
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas set on the connect options apply to every pooled connection
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_non_conformities_table(pool).await?;
    create_attachments_table(pool).await?;
    create_project_codes_table(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

/// Non-conformity records
///
/// `rnc_number` is unique; generated numbers are `YYYY-NNN`.
/// Multi-choice fields (cause, process, origin, corrective_action) are
/// stored flattened with `; ` separators.
async fn create_non_conformities_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS non_conformities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            rnc_number TEXT NOT NULL UNIQUE,
            occurred_on TEXT,
            issuer TEXT NOT NULL DEFAULT '',
            area TEXT NOT NULL DEFAULT '',
            project_code TEXT,
            title TEXT NOT NULL DEFAULT '',
            inspector TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            reference_docs TEXT NOT NULL DEFAULT '',
            cause TEXT NOT NULL DEFAULT '',
            process TEXT NOT NULL DEFAULT '',
            origin TEXT NOT NULL DEFAULT '',
            corrective_action TEXT NOT NULL DEFAULT '',
            severity TEXT,
            category TEXT NOT NULL DEFAULT '',
            action_owner TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'open'
                CHECK (status IN ('open', 'closed', 'reopened', 'cancelled')),
            opened_at TEXT,
            closed_at TEXT,
            closed_by TEXT,
            closing_notes TEXT,
            effectiveness TEXT,
            reopened_at TEXT,
            reopened_by TEXT,
            reopening_reason TEXT,
            cancelled_at TEXT,
            cancelled_by TEXT,
            cancel_reason TEXT,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_non_conformities_status ON non_conformities(status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Photos attached to a record, tagged with the lifecycle stage
async fn create_attachments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attachments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            record_id INTEGER NOT NULL
                REFERENCES non_conformities(id) ON DELETE CASCADE,
            stage TEXT NOT NULL DEFAULT 'opening'
                CHECK (stage IN ('opening', 'closing', 'reopening')),
            filename TEXT,
            mime_type TEXT NOT NULL,
            data BLOB NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_attachments_record ON attachments(record_id, stage)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Project code (PEP) lookup list
async fn create_project_codes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_codes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
