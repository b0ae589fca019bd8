//! Tests for database initialization

use rnc_common::db::init::{init_database, SCHEMA_VERSION};
use sqlx::Row;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("data").join("rnc.db");

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("rnc.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO project_codes (code) VALUES ('C023553')")
        .execute(&pool1)
        .await
        .unwrap();
    pool1.close().await;

    // Second open must keep data and not fail on existing tables
    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM project_codes")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_tables_created() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("rnc.db")).await.unwrap();

    let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .fetch_all(&pool)
        .await
        .unwrap();
    let tables: Vec<String> = rows.iter().map(|r| r.get::<String, _>(0)).collect();

    for expected in ["attachments", "non_conformities", "project_codes", "schema_version"] {
        assert!(tables.contains(&expected.to_string()), "missing table {}", expected);
    }

    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[tokio::test]
async fn test_status_check_constraint() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("rnc.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO non_conformities (rnc_number, status) VALUES ('2024-001', 'blocked')",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err(), "unknown status must be rejected by the schema");
}

#[tokio::test]
async fn test_attachments_cascade_with_record() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("rnc.db")).await.unwrap();

    sqlx::query("INSERT INTO non_conformities (rnc_number) VALUES ('2024-001')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO attachments (record_id, stage, mime_type, data, created_at)
         VALUES (1, 'opening', 'image/png', x'89504E47', '2024-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("DELETE FROM non_conformities WHERE id = 1")
        .execute(&pool)
        .await
        .unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attachments")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
