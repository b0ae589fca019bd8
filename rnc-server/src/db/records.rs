//! Non-conformity record store
//!
//! Create, read, list, edit, lifecycle transitions and hard delete.
//! Status changes go through [`Status::apply`] so an invalid transition never
//! reaches the database.

use chrono::{DateTime, Datelike, NaiveDate, SubsecRound, Utc};
use rnc_common::db::{join_list, Effectiveness, NewPhoto, NonConformity, Severity, Stage};
use rnc_common::lifecycle::{require_text, Transition};
use rnc_common::{Error, Result, Status};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::attachments;
use crate::pagination::{calculate_pagination, PAGE_SIZE};

const SELECT_RECORD: &str = r#"
    SELECT id, rnc_number, occurred_on, issuer, area, project_code, title, inspector,
           description, reference_docs, cause, process, origin, corrective_action,
           severity, category, action_owner, status, opened_at,
           closed_at, closed_by, closing_notes, effectiveness,
           reopened_at, reopened_by, reopening_reason,
           cancelled_at, cancelled_by, cancel_reason
    FROM non_conformities
"#;

/// Editable descriptive fields, used for both create and update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecordFields {
    pub occurred_on: Option<NaiveDate>,
    pub issuer: String,
    pub area: String,
    pub project_code: Option<String>,
    pub title: String,
    pub inspector: String,
    pub description: String,
    pub references: String,
    pub cause: Vec<String>,
    pub process: Vec<String>,
    pub origin: Vec<String>,
    pub corrective_action: Vec<String>,
    pub severity: Option<Severity>,
    pub category: String,
    pub action_owner: String,
}

impl RecordFields {
    fn validate(&self) -> Result<()> {
        require_text("title", &self.title)?;
        require_text("description", &self.description)?;
        Ok(())
    }

    fn project_code(&self) -> Option<String> {
        self.project_code
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Closing request: who closed it, what was done, whether it worked
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CloseRequest {
    pub actor: String,
    pub notes: String,
    pub effectiveness: Option<Effectiveness>,
}

/// Reopen or cancel request: who and why
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReasonRequest {
    pub actor: String,
    pub reason: String,
}

/// List filters; empty sets and `None` match everything
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecordFilter {
    pub statuses: Vec<Status>,
    pub severities: Vec<Severity>,
    pub area: Option<String>,
    pub inspector: Option<String>,
    pub project_code: Option<String>,
    /// Substring of the RNC number or title
    pub text: Option<String>,
    pub page: Option<i64>,
}

/// One page of list results
#[derive(Debug, Clone, Serialize)]
pub struct RecordPage {
    pub total_results: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub records: Vec<NonConformity>,
}

/// Outcome of a bulk upsert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// Timestamps are kept to whole seconds so stored and exported text agree
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Compute the next `YYYY-NNN` number given the numbers already in use.
///
/// Only numbers of the exact form `<year>-<digits>` count; anything else
/// (legacy or hand-typed identifiers) is ignored.
pub fn next_number<'a, I>(year: i32, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = format!("{}-", year);
    let max = existing
        .into_iter()
        .filter_map(|n| n.trim().strip_prefix(&prefix))
        .filter(|seq| !seq.is_empty() && seq.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|seq| seq.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:03}", prefix, max + 1)
}

async fn next_number_in(conn: &mut SqliteConnection, year: i32) -> Result<String> {
    let existing: Vec<String> =
        sqlx::query_scalar("SELECT rnc_number FROM non_conformities WHERE rnc_number LIKE ?")
            .bind(format!("{}-%", year))
            .fetch_all(&mut *conn)
            .await?;
    Ok(next_number(year, existing.iter().map(String::as_str)))
}

/// Preview of the number the next record created in `year` will get
pub async fn next_rnc_number(pool: &SqlitePool, year: i32) -> Result<String> {
    let mut conn = pool.acquire().await?;
    next_number_in(&mut conn, year).await
}

/// Create a record numbered for the current year
pub async fn create(
    pool: &SqlitePool,
    fields: &RecordFields,
    photos: &[NewPhoto],
) -> Result<NonConformity> {
    create_at(pool, fields, photos, now()).await
}

/// Create a record as of `opened_at`; the number uses that year
pub async fn create_at(
    pool: &SqlitePool,
    fields: &RecordFields,
    photos: &[NewPhoto],
    opened_at: DateTime<Utc>,
) -> Result<NonConformity> {
    fields.validate()?;

    let mut tx = pool.begin().await?;
    let rnc_number = next_number_in(&mut tx, opened_at.year()).await?;
    let occurred_on = fields.occurred_on.unwrap_or_else(|| opened_at.date_naive());

    let result = sqlx::query(
        r#"
        INSERT INTO non_conformities (
            rnc_number, occurred_on, issuer, area, project_code, title, inspector,
            description, reference_docs, cause, process, origin, corrective_action,
            severity, category, action_owner, status, opened_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&rnc_number)
    .bind(occurred_on.format("%Y-%m-%d").to_string())
    .bind(fields.issuer.trim())
    .bind(fields.area.trim())
    .bind(fields.project_code())
    .bind(fields.title.trim())
    .bind(fields.inspector.trim())
    .bind(fields.description.trim())
    .bind(fields.references.trim())
    .bind(join_list(&fields.cause))
    .bind(join_list(&fields.process))
    .bind(join_list(&fields.origin))
    .bind(join_list(&fields.corrective_action))
    .bind(fields.severity.map(Severity::as_str))
    .bind(fields.category.trim())
    .bind(fields.action_owner.trim())
    .bind(Status::Open.as_str())
    .bind(opened_at.to_rfc3339())
    .bind(opened_at.to_rfc3339())
    .execute(&mut *tx)
    .await
    .map_err(|e| duplicate_number_fault(e, &rnc_number))?;

    let id = result.last_insert_rowid();
    attachments::insert(&mut tx, id, Stage::Opening, photos).await?;
    tx.commit().await?;

    info!("Created RNC {} (id {}) with {} photo(s)", rnc_number, id, photos.len());
    get(pool, id).await
}

/// A generated number colliding with an existing one is a server fault, not
/// a user error
fn duplicate_number_fault(err: sqlx::Error, rnc_number: &str) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return Error::Internal(format!(
                "generated RNC number {} already exists",
                rnc_number
            ));
        }
    }
    Error::Database(err)
}

/// Load one record by internal id
pub async fn get(pool: &SqlitePool, id: i64) -> Result<NonConformity> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_RECORD))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => record_from_row(&row),
        None => Err(Error::NotFound(format!("record {}", id))),
    }
}

/// Load one record by RNC number
pub async fn get_by_number(pool: &SqlitePool, rnc_number: &str) -> Result<NonConformity> {
    let row = sqlx::query(&format!("{} WHERE rnc_number = ?", SELECT_RECORD))
        .bind(rnc_number.trim())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => record_from_row(&row),
        None => Err(Error::NotFound(format!("RNC {}", rnc_number))),
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a RecordFilter) {
    qb.push(" WHERE 1 = 1");

    if !filter.statuses.is_empty() {
        qb.push(" AND status IN (");
        let mut separated = qb.separated(", ");
        for status in &filter.statuses {
            separated.push_bind(status.as_str());
        }
        separated.push_unseparated(")");
    }

    if !filter.severities.is_empty() {
        qb.push(" AND severity IN (");
        let mut separated = qb.separated(", ");
        for severity in &filter.severities {
            separated.push_bind(severity.as_str());
        }
        separated.push_unseparated(")");
    }

    let contains = [
        ("area", &filter.area),
        ("inspector", &filter.inspector),
        ("COALESCE(project_code, '')", &filter.project_code),
    ];
    for (column, needle) in contains {
        if let Some(needle) = needle.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            qb.push(format!(" AND instr(lower({}), lower(", column));
            qb.push_bind(needle);
            qb.push(")) > 0");
        }
    }

    if let Some(text) = filter.text.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND (instr(lower(rnc_number), lower(");
        qb.push_bind(text);
        qb.push(")) > 0 OR instr(lower(title), lower(");
        qb.push_bind(text);
        qb.push(")) > 0)");
    }
}

/// Filtered, paginated list, newest first
pub async fn list(pool: &SqlitePool, filter: &RecordFilter) -> Result<RecordPage> {
    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM non_conformities");
    push_filters(&mut count_qb, filter);
    let total_results: i64 = count_qb.build_query_scalar::<i64>().fetch_one(pool).await?;

    let pagination = calculate_pagination(total_results, filter.page.unwrap_or(1));

    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_RECORD);
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY id DESC LIMIT ");
    qb.push_bind(PAGE_SIZE);
    qb.push(" OFFSET ");
    qb.push_bind(pagination.offset);

    let rows = qb.build().fetch_all(pool).await?;
    let records = rows
        .iter()
        .map(record_from_row)
        .collect::<Result<Vec<_>>>()?;

    debug!("Listed {} of {} record(s)", records.len(), total_results);

    Ok(RecordPage {
        total_results,
        page: pagination.page,
        page_size: PAGE_SIZE,
        total_pages: pagination.total_pages,
        records,
    })
}

/// Year, then numeric sequence, so `2025-1000` follows `2025-999`
const NUMBER_ORDER: &str = "substr(rnc_number, 1, instr(rnc_number, '-')), \
     CAST(substr(rnc_number, instr(rnc_number, '-') + 1) AS INTEGER), \
     rnc_number";

/// Every record ordered by RNC number (export)
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<NonConformity>> {
    let rows = sqlx::query(&format!("{} ORDER BY {}", SELECT_RECORD, NUMBER_ORDER))
        .fetch_all(pool)
        .await?;
    rows.iter().map(record_from_row).collect()
}

/// Replace the descriptive fields of a live record.
///
/// Number, status and lifecycle fields are never touched here.
pub async fn update(pool: &SqlitePool, id: i64, fields: &RecordFields) -> Result<NonConformity> {
    fields.validate()?;

    let mut tx = pool.begin().await?;
    let status = current_status(&mut tx, id).await?;
    if !status.is_editable() {
        return Err(Error::InvalidInput(format!(
            "record {} is {} and can no longer be edited",
            id, status
        )));
    }

    let occurred_on = fields.occurred_on.map(|d| d.format("%Y-%m-%d").to_string());
    sqlx::query(
        r#"
        UPDATE non_conformities
           SET occurred_on = COALESCE(?, occurred_on),
               issuer = ?, area = ?, project_code = ?, title = ?, inspector = ?,
               description = ?, reference_docs = ?, cause = ?, process = ?, origin = ?,
               corrective_action = ?, severity = ?, category = ?, action_owner = ?,
               updated_at = ?
         WHERE id = ?
        "#,
    )
    .bind(occurred_on)
    .bind(fields.issuer.trim())
    .bind(fields.area.trim())
    .bind(fields.project_code())
    .bind(fields.title.trim())
    .bind(fields.inspector.trim())
    .bind(fields.description.trim())
    .bind(fields.references.trim())
    .bind(join_list(&fields.cause))
    .bind(join_list(&fields.process))
    .bind(join_list(&fields.origin))
    .bind(join_list(&fields.corrective_action))
    .bind(fields.severity.map(Severity::as_str))
    .bind(fields.category.trim())
    .bind(fields.action_owner.trim())
    .bind(now().to_rfc3339())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    info!("Updated record {}", id);
    get(pool, id).await
}

async fn current_status(conn: &mut SqliteConnection, id: i64) -> Result<Status> {
    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM non_conformities WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    match status {
        Some(status) => status.parse(),
        None => Err(Error::NotFound(format!("record {}", id))),
    }
}

/// Look up the current status and check `transition` is allowed from it
async fn begin_transition(
    conn: &mut SqliteConnection,
    id: i64,
    transition: Transition,
) -> Result<Status> {
    let status = current_status(conn, id).await?;
    Ok(status.apply(transition)?)
}

/// Close a record (from `open` or `reopened`) with optional evidence photos
pub async fn close(
    pool: &SqlitePool,
    id: i64,
    request: &CloseRequest,
    photos: &[NewPhoto],
) -> Result<NonConformity> {
    let (actor, notes) = Transition::Close.check_request(&request.actor, &request.notes)?;
    let effectiveness = request.effectiveness.unwrap_or(Effectiveness::Pending);

    let mut tx = pool.begin().await?;
    let next = begin_transition(&mut tx, id, Transition::Close).await?;
    let at = now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE non_conformities
           SET status = ?, closed_at = ?, closed_by = ?, closing_notes = ?,
               effectiveness = ?, updated_at = ?
         WHERE id = ?
        "#,
    )
    .bind(next.as_str())
    .bind(&at)
    .bind(&actor)
    .bind(&notes)
    .bind(effectiveness.as_str())
    .bind(&at)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    attachments::insert(&mut tx, id, Stage::Closing, photos).await?;
    tx.commit().await?;

    info!("Record {} closed by {}", id, actor);
    get(pool, id).await
}

/// Reopen a closed record
pub async fn reopen(
    pool: &SqlitePool,
    id: i64,
    request: &ReasonRequest,
    photos: &[NewPhoto],
) -> Result<NonConformity> {
    let (actor, reason) = Transition::Reopen.check_request(&request.actor, &request.reason)?;

    let mut tx = pool.begin().await?;
    let next = begin_transition(&mut tx, id, Transition::Reopen).await?;
    let at = now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE non_conformities
           SET status = ?, reopened_at = ?, reopened_by = ?, reopening_reason = ?,
               updated_at = ?
         WHERE id = ?
        "#,
    )
    .bind(next.as_str())
    .bind(&at)
    .bind(&actor)
    .bind(&reason)
    .bind(&at)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    attachments::insert(&mut tx, id, Stage::Reopening, photos).await?;
    tx.commit().await?;

    info!("Record {} reopened by {}", id, actor);
    get(pool, id).await
}

/// Soft delete: mark the record cancelled, keeping it and its photos
pub async fn cancel(pool: &SqlitePool, id: i64, request: &ReasonRequest) -> Result<NonConformity> {
    let (actor, reason) = Transition::Cancel.check_request(&request.actor, &request.reason)?;

    let mut tx = pool.begin().await?;
    let next = begin_transition(&mut tx, id, Transition::Cancel).await?;
    let at = now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE non_conformities
           SET status = ?, cancelled_at = ?, cancelled_by = ?, cancel_reason = ?,
               updated_at = ?
         WHERE id = ?
        "#,
    )
    .bind(next.as_str())
    .bind(&at)
    .bind(&actor)
    .bind(&reason)
    .bind(&at)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!("Record {} cancelled by {}", id, actor);
    get(pool, id).await
}

/// Hard delete: remove the record and every attachment.
///
/// Returns the number of attachments removed.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<u64> {
    let mut tx = pool.begin().await?;

    let removed = attachments::delete_for_record(&mut tx, id).await?;
    let result = sqlx::query("DELETE FROM non_conformities WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        // Dropping the transaction rolls back
        return Err(Error::NotFound(format!("record {}", id)));
    }

    tx.commit().await?;
    info!("Deleted record {} and {} attachment(s)", id, removed);
    Ok(removed)
}

/// Insert or update records keyed by RNC number, all in one transaction.
///
/// The `id` field of the input is ignored. A cancelled record stays
/// cancelled: a row giving it any other status fails the whole batch.
pub async fn upsert_many(pool: &SqlitePool, records: &[NonConformity]) -> Result<UpsertSummary> {
    let mut summary = UpsertSummary::default();
    let mut tx = pool.begin().await?;

    for record in records {
        let existing: Option<String> =
            sqlx::query_scalar("SELECT status FROM non_conformities WHERE rnc_number = ?")
                .bind(&record.rnc_number)
                .fetch_optional(&mut *tx)
                .await?;

        if let Some(current) = existing.as_deref() {
            let current: Status = current.parse()?;
            if current == Status::Cancelled && record.status != Status::Cancelled {
                return Err(Error::Import(format!(
                    "RNC {} is cancelled and cannot become {}",
                    record.rnc_number, record.status
                )));
            }
        }

        let sql = match existing {
            Some(_) => {
                r#"
                UPDATE non_conformities
                   SET occurred_on = ?, issuer = ?, area = ?, project_code = ?, title = ?,
                       inspector = ?, description = ?, reference_docs = ?, cause = ?,
                       process = ?, origin = ?, corrective_action = ?, severity = ?,
                       category = ?, action_owner = ?, status = ?, opened_at = ?,
                       closed_at = ?, closed_by = ?, closing_notes = ?, effectiveness = ?,
                       reopened_at = ?, reopened_by = ?, reopening_reason = ?,
                       cancelled_at = ?, cancelled_by = ?, cancel_reason = ?,
                       updated_at = ?
                 WHERE rnc_number = ?
                "#
            }
            None => {
                r#"
                INSERT INTO non_conformities (
                    occurred_on, issuer, area, project_code, title,
                    inspector, description, reference_docs, cause,
                    process, origin, corrective_action, severity,
                    category, action_owner, status, opened_at,
                    closed_at, closed_by, closing_notes, effectiveness,
                    reopened_at, reopened_by, reopening_reason,
                    cancelled_at, cancelled_by, cancel_reason,
                    updated_at, rnc_number
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#
            }
        };

        sqlx::query(sql)
            .bind(record.occurred_on.map(|d| d.format("%Y-%m-%d").to_string()))
            .bind(&record.issuer)
            .bind(&record.area)
            .bind(&record.project_code)
            .bind(&record.title)
            .bind(&record.inspector)
            .bind(&record.description)
            .bind(&record.references)
            .bind(&record.cause)
            .bind(&record.process)
            .bind(&record.origin)
            .bind(&record.corrective_action)
            .bind(record.severity.map(Severity::as_str))
            .bind(&record.category)
            .bind(&record.action_owner)
            .bind(record.status.as_str())
            .bind(record.opened_at.map(|t| t.to_rfc3339()))
            .bind(record.closed_at.map(|t| t.to_rfc3339()))
            .bind(&record.closed_by)
            .bind(&record.closing_notes)
            .bind(record.effectiveness.map(Effectiveness::as_str))
            .bind(record.reopened_at.map(|t| t.to_rfc3339()))
            .bind(&record.reopened_by)
            .bind(&record.reopening_reason)
            .bind(record.cancelled_at.map(|t| t.to_rfc3339()))
            .bind(&record.cancelled_by)
            .bind(&record.cancel_reason)
            .bind(now().to_rfc3339())
            .bind(&record.rnc_number)
            .execute(&mut *tx)
            .await?;

        match existing {
            Some(_) => summary.updated += 1,
            None => summary.inserted += 1,
        }
    }

    tx.commit().await?;
    info!(
        "Upserted {} record(s): {} inserted, {} updated",
        records.len(),
        summary.inserted,
        summary.updated
    );
    Ok(summary)
}

fn parse_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            DateTime::parse_from_rfc3339(s.trim())
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| Error::Internal(format!("stored timestamp '{}' is invalid: {}", s, e)))
        })
        .transpose()
}

fn parse_date(value: Option<String>) -> Result<Option<NaiveDate>> {
    value
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|e| Error::Internal(format!("stored date '{}' is invalid: {}", s, e)))
        })
        .transpose()
}

fn record_from_row(row: &SqliteRow) -> Result<NonConformity> {
    let status: String = row.try_get("status")?;
    let severity: Option<String> = row.try_get("severity")?;
    let effectiveness: Option<String> = row.try_get("effectiveness")?;

    Ok(NonConformity {
        id: row.try_get("id")?,
        rnc_number: row.try_get("rnc_number")?,
        occurred_on: parse_date(row.try_get("occurred_on")?)?,
        issuer: row.try_get("issuer")?,
        area: row.try_get("area")?,
        project_code: row.try_get("project_code")?,
        title: row.try_get("title")?,
        inspector: row.try_get("inspector")?,
        description: row.try_get("description")?,
        references: row.try_get("reference_docs")?,
        cause: row.try_get("cause")?,
        process: row.try_get("process")?,
        origin: row.try_get("origin")?,
        corrective_action: row.try_get("corrective_action")?,
        severity: severity
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<Severity>())
            .transpose()?,
        category: row.try_get("category")?,
        action_owner: row.try_get("action_owner")?,
        status: status.parse()?,
        opened_at: parse_timestamp(row.try_get("opened_at")?)?,
        closed_at: parse_timestamp(row.try_get("closed_at")?)?,
        closed_by: row.try_get("closed_by")?,
        closing_notes: row.try_get("closing_notes")?,
        effectiveness: effectiveness
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<Effectiveness>())
            .transpose()?,
        reopened_at: parse_timestamp(row.try_get("reopened_at")?)?,
        reopened_by: row.try_get("reopened_by")?,
        reopening_reason: row.try_get("reopening_reason")?,
        cancelled_at: parse_timestamp(row.try_get("cancelled_at")?)?,
        cancelled_by: row.try_get("cancelled_by")?,
        cancel_reason: row.try_get("cancel_reason")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_number_starts_at_one() {
        assert_eq!(next_number(2024, Vec::<&str>::new()), "2024-001");
    }

    #[test]
    fn test_next_number_uses_max_of_year() {
        let existing = ["2024-001", "2024-007", "2023-099", "2024-003"];
        assert_eq!(next_number(2024, existing), "2024-008");
    }

    #[test]
    fn test_next_number_ignores_foreign_formats() {
        let existing = ["2024-ABC", "2024-", "X2024-500", "2024-002 "];
        assert_eq!(next_number(2024, existing), "2024-003");
    }

    #[test]
    fn test_next_number_grows_past_three_digits() {
        assert_eq!(next_number(2025, ["2025-999"]), "2025-1000");
    }
}
