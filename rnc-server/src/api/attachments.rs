//! Photo attachment endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rnc_common::db::{Attachment, Stage};
use serde::Deserialize;

use super::form::Form;
use crate::db::{attachments, records};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StageQuery {
    pub stage: Option<String>,
}

fn parse_stage(value: Option<&str>) -> ApiResult<Option<Stage>> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(Some(s.parse::<Stage>()?)),
        None => Ok(None),
    }
}

/// GET /api/records/:id/attachments[?stage=]
pub async fn list_attachments(
    State(state): State<AppState>,
    Path(record_id): Path<i64>,
    Query(query): Query<StageQuery>,
) -> ApiResult<Json<Vec<Attachment>>> {
    let stage = parse_stage(query.stage.as_deref())?;
    // 404 for a missing record rather than an empty list
    records::get(&state.db, record_id).await?;
    Ok(Json(attachments::list(&state.db, record_id, stage).await?))
}

/// Raster images render in the page; anything else downloads
fn disposition_kind(mime_type: &str) -> &'static str {
    if mime_type.starts_with("image/") && mime_type != "image/svg+xml" {
        "inline"
    } else {
        "attachment"
    }
}

/// GET /api/attachments/:id
pub async fn get_attachment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let (attachment, data) = attachments::get_with_data(&state.db, id).await?;
    let filename = attachment
        .filename
        .unwrap_or_else(|| format!("photo-{}", attachment.id))
        .replace(['"', '\\', '\r', '\n'], "");
    let disposition = format!(
        "{}; filename=\"{}\"",
        disposition_kind(&attachment.mime_type),
        filename
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, attachment.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        data,
    )
        .into_response())
}

/// POST /api/records/:id/attachments
///
/// Multipart: optional `stage` field (default `opening`) plus `photo` files.
pub async fn add_attachments(
    State(state): State<AppState>,
    Path(record_id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Vec<Attachment>>)> {
    let form = Form::read(multipart).await?;
    let stage = parse_stage(form.text("stage"))?.unwrap_or(Stage::Opening);
    if form.photos.is_empty() {
        return Err(ApiError::BadRequest("no photo files in request".to_string()));
    }

    let added = attachments::add(&state.db, record_id, stage, &form.photos).await?;
    Ok((StatusCode::CREATED, Json(added)))
}

/// DELETE /api/attachments/:id
pub async fn delete_attachment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    attachments::remove(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_raster_images_inline() {
        assert_eq!(disposition_kind("image/png"), "inline");
        assert_eq!(disposition_kind("image/jpeg"), "inline");
        assert_eq!(disposition_kind("image/svg+xml"), "attachment");
        assert_eq!(disposition_kind("text/html"), "attachment");
        assert_eq!(disposition_kind("application/octet-stream"), "attachment");
    }
}
