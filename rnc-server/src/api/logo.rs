//! Company logo endpoints

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::logo;
use crate::AppState;

/// GET /api/logo
pub async fn get_logo(State(state): State<AppState>) -> ApiResult<Response> {
    match logo::load(&state.config.logo_path()).await? {
        Some((bytes, mime_type)) => {
            Ok((StatusCode::OK, [(header::CONTENT_TYPE, mime_type)], bytes).into_response())
        }
        None => Err(ApiError::NotFound("logo".to_string())),
    }
}

/// PUT /api/logo (raw image body)
pub async fn upload_logo(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
    let format = logo::save(&state.config.logo_path(), &body).await?;
    Ok(Json(json!({ "mime_type": format.to_mime_type() })))
}

/// DELETE /api/logo
pub async fn delete_logo(State(state): State<AppState>) -> ApiResult<StatusCode> {
    if logo::remove(&state.config.logo_path()).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("logo".to_string()))
    }
}
