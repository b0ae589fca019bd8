//! CSV export and import endpoints

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::db::records::UpsertSummary;
use crate::error::{ApiError, ApiResult};
use crate::transfer::{self, FORMAT_VERSION};
use crate::AppState;

/// GET /api/export.csv
pub async fn export_csv(State(state): State<AppState>) -> ApiResult<Response> {
    let bytes = transfer::export(&state.db).await?;
    let disposition = format!(
        "attachment; filename=\"rnc_export_v{}.csv\"",
        FORMAT_VERSION
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// POST /api/import
///
/// Raw CSV body. Either every row is applied or none is.
pub async fn import_csv(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<UpsertSummary>> {
    let text = std::str::from_utf8(&body)
        .map_err(|_| ApiError::Import("file is not UTF-8 text".to_string()))?;
    Ok(Json(transfer::import(&state.db, text).await?))
}
