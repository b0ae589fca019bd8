//! Record endpoints: list, read, create, edit, lifecycle, delete

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Datelike, Utc};
use rnc_common::db::{NonConformity, Severity};
use rnc_common::Status;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::form::{parse_json, Form};
use crate::db::records::{self, CloseRequest, ReasonRequest, RecordFields, RecordFilter, RecordPage};
use crate::error::{ApiError, ApiResult};
use crate::notifier::NotifyOutcome;
use crate::AppState;

/// Query parameters for GET /api/records
///
/// `status` and `severity` take comma-separated lists.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub severity: Option<String>,
    pub area: Option<String>,
    pub inspector: Option<String>,
    pub project_code: Option<String>,
    pub q: Option<String>,
    pub page: Option<i64>,
}

fn parse_list<T>(value: Option<&str>) -> ApiResult<Vec<T>>
where
    T: std::str::FromStr<Err = rnc_common::Error>,
{
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<T>().map_err(ApiError::from))
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl ListQuery {
    fn into_filter(self) -> ApiResult<RecordFilter> {
        Ok(RecordFilter {
            statuses: parse_list::<Status>(self.status.as_deref())?,
            severities: parse_list::<Severity>(self.severity.as_deref())?,
            area: non_blank(self.area),
            inspector: non_blank(self.inspector),
            project_code: non_blank(self.project_code),
            text: non_blank(self.q),
            page: self.page,
        })
    }
}

/// A saved record plus what happened to its e-mail notification
#[derive(Debug, Serialize)]
pub struct NotifiedRecord {
    pub record: NonConformity,
    pub notification: NotifyOutcome,
}

/// GET /api/records
pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<RecordPage>> {
    let filter = query.into_filter()?;
    Ok(Json(records::list(&state.db, &filter).await?))
}

/// GET /api/records/next-number
pub async fn next_number(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let number = records::next_rnc_number(&state.db, Utc::now().year()).await?;
    Ok(Json(json!({ "rnc_number": number })))
}

/// GET /api/records/:id
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<NonConformity>> {
    Ok(Json(records::get(&state.db, id).await?))
}

/// POST /api/records
///
/// Multipart: `record` JSON part plus optional `photo` files (opening stage).
/// The record is saved first; the notification result is reported alongside.
pub async fn create_record(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<NotifiedRecord>)> {
    let form = Form::read(multipart).await?;
    let fields: RecordFields = form.json("record")?;

    let record = records::create(&state.db, &fields, &form.photos).await?;
    let notification = state.notifier.notify_opened(&record).await;

    Ok((
        StatusCode::CREATED,
        Json(NotifiedRecord {
            record,
            notification,
        }),
    ))
}

/// PUT /api/records/:id
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<NonConformity>> {
    let fields: RecordFields = parse_json(&body)?;
    Ok(Json(records::update(&state.db, id, &fields).await?))
}

/// POST /api/records/:id/close
///
/// Multipart: `request` JSON part (`actor`, `notes`, `effectiveness`) plus
/// optional closing evidence photos.
pub async fn close_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<NotifiedRecord>> {
    let form = Form::read(multipart).await?;
    let request: CloseRequest = form.json("request")?;

    let record = records::close(&state.db, id, &request, &form.photos).await?;
    let notification = state.notifier.notify_closed(&record).await;

    Ok(Json(NotifiedRecord {
        record,
        notification,
    }))
}

/// POST /api/records/:id/reopen
///
/// Multipart: `request` JSON part (`actor`, `reason`) plus optional photos.
pub async fn reopen_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<NonConformity>> {
    let form = Form::read(multipart).await?;
    let request: ReasonRequest = form.json("request")?;
    Ok(Json(records::reopen(&state.db, id, &request, &form.photos).await?))
}

/// POST /api/records/:id/cancel
pub async fn cancel_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<NonConformity>> {
    let request: ReasonRequest = parse_json(&body)?;
    Ok(Json(records::cancel(&state.db, id, &request).await?))
}

/// DELETE /api/records/:id
///
/// Permanent: the record and all of its photos are removed.
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let removed = records::delete(&state.db, id).await?;
    Ok(Json(json!({ "deleted": id, "attachments_removed": removed })))
}
