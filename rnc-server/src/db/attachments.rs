//! Photo attachments
//!
//! Payloads live inline in the `attachments` table next to their record.
//! Listing returns metadata only; bytes are loaded one attachment at a time
//! or all at once for the report.

use chrono::{DateTime, Utc};
use rnc_common::db::{Attachment, NewPhoto, Stage};
use rnc_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::info;

use super::records;

const SELECT_METADATA: &str = r#"
    SELECT id, record_id, stage, filename, mime_type, length(data) AS size, created_at
    FROM attachments
"#;

/// Store photos for a record inside the caller's transaction
pub async fn insert(
    conn: &mut SqliteConnection,
    record_id: i64,
    stage: Stage,
    photos: &[NewPhoto],
) -> Result<Vec<i64>> {
    let created_at = records::now().to_rfc3339();
    let mut ids = Vec::with_capacity(photos.len());

    for photo in photos {
        let result = sqlx::query(
            r#"
            INSERT INTO attachments (record_id, stage, filename, mime_type, data, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record_id)
        .bind(stage.as_str())
        .bind(&photo.filename)
        .bind(&photo.mime_type)
        .bind(&photo.data)
        .bind(&created_at)
        .execute(&mut *conn)
        .await?;
        ids.push(result.last_insert_rowid());
    }

    Ok(ids)
}

/// Attach photos to an existing, non-cancelled record
pub async fn add(
    pool: &SqlitePool,
    record_id: i64,
    stage: Stage,
    photos: &[NewPhoto],
) -> Result<Vec<Attachment>> {
    let record = records::get(pool, record_id).await?;
    if !record.status.is_editable() {
        return Err(Error::InvalidInput(format!(
            "record {} is {}; photos can no longer be added",
            record.rnc_number, record.status
        )));
    }

    let mut tx = pool.begin().await?;
    let ids = insert(&mut tx, record_id, stage, photos).await?;
    tx.commit().await?;

    info!(
        "Added {} {} photo(s) to record {}",
        ids.len(),
        stage,
        record_id
    );

    let mut added = Vec::with_capacity(ids.len());
    for id in ids {
        added.push(get(pool, id).await?);
    }
    Ok(added)
}

/// Attachment metadata for a record, optionally limited to one stage
pub async fn list(
    pool: &SqlitePool,
    record_id: i64,
    stage: Option<Stage>,
) -> Result<Vec<Attachment>> {
    let rows = match stage {
        Some(stage) => {
            sqlx::query(&format!(
                "{} WHERE record_id = ? AND stage = ? ORDER BY id",
                SELECT_METADATA
            ))
            .bind(record_id)
            .bind(stage.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(&format!("{} WHERE record_id = ? ORDER BY id", SELECT_METADATA))
                .bind(record_id)
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter().map(attachment_from_row).collect()
}

/// Metadata of one attachment
pub async fn get(pool: &SqlitePool, id: i64) -> Result<Attachment> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_METADATA))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => attachment_from_row(&row),
        None => Err(Error::NotFound(format!("attachment {}", id))),
    }
}

/// Metadata and payload of one attachment
pub async fn get_with_data(pool: &SqlitePool, id: i64) -> Result<(Attachment, Vec<u8>)> {
    let attachment = get(pool, id).await?;
    let data: Vec<u8> = sqlx::query_scalar("SELECT data FROM attachments WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok((attachment, data))
}

/// Every attachment of a record with its payload, in stage then upload order
pub async fn load_all(pool: &SqlitePool, record_id: i64) -> Result<Vec<(Attachment, Vec<u8>)>> {
    let rows = sqlx::query(
        r#"
        SELECT id, record_id, stage, filename, mime_type, length(data) AS size, created_at, data
        FROM attachments
        WHERE record_id = ?
        ORDER BY CASE stage WHEN 'opening' THEN 0 WHEN 'closing' THEN 1 ELSE 2 END, id
        "#,
    )
    .bind(record_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| Ok((attachment_from_row(row)?, row.try_get::<Vec<u8>, _>("data")?)))
        .collect()
}

/// Remove one attachment; photos of a cancelled record stay
pub async fn remove(pool: &SqlitePool, id: i64) -> Result<()> {
    let attachment = get(pool, id).await?;
    let record = records::get(pool, attachment.record_id).await?;
    if !record.status.is_editable() {
        return Err(Error::InvalidInput(format!(
            "record {} is {}; photos can no longer be removed",
            record.rnc_number, record.status
        )));
    }

    let result = sqlx::query("DELETE FROM attachments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("attachment {}", id)));
    }

    info!("Removed attachment {}", id);
    Ok(())
}

/// Remove every attachment of a record inside the caller's transaction
pub async fn delete_for_record(conn: &mut SqliteConnection, record_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM attachments WHERE record_id = ?")
        .bind(record_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

fn attachment_from_row(row: &SqliteRow) -> Result<Attachment> {
    let stage: String = row.try_get("stage")?;
    let created_at: Option<String> = row.try_get("created_at")?;

    Ok(Attachment {
        id: row.try_get("id")?,
        record_id: row.try_get("record_id")?,
        stage: stage.parse()?,
        filename: row.try_get("filename")?,
        mime_type: row.try_get("mime_type")?,
        size: row.try_get("size")?,
        created_at: created_at
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&Utc)),
    })
}
