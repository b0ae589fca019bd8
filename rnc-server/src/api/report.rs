//! PDF report download

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::db::{attachments, records};
use crate::error::{ApiError, ApiResult};
use crate::report::{render_pdf, ReportLayout};
use crate::{logo, AppState};

/// GET /api/records/:id/report.pdf
pub async fn download_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let record = records::get(&state.db, id).await?;
    let photos = attachments::load_all(&state.db, id).await?;
    let logo = logo::load(&state.config.logo_path())
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Logo unavailable for report: {}", e);
            None
        })
        .map(|(bytes, _)| bytes);

    let filename = format!("RNC_{}.pdf", record.rnc_number);
    let layout = ReportLayout::build(&record, photos);

    // Image decoding and PDF assembly are CPU-bound
    let pdf = tokio::task::spawn_blocking(move || render_pdf(&layout, logo.as_deref()))
        .await
        .map_err(|e| ApiError::Internal(format!("report task failed: {}", e)))??;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", filename),
            ),
        ],
        pdf,
    )
        .into_response())
}
