//! Project code (PEP) list endpoints

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rnc_common::db::ProjectCode;
use serde::{Deserialize, Serialize};

use super::form::parse_json;
use crate::db::project_codes::{self, BulkSummary};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// A code with its display label
#[derive(Debug, Serialize)]
pub struct ProjectCodeEntry {
    #[serde(flatten)]
    pub code: ProjectCode,
    pub label: String,
}

/// Body of POST /api/project-codes: one code, or a list of labels
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AddProjectCodes {
    One {
        code: String,
        #[serde(default)]
        description: Option<String>,
    },
    Many {
        labels: Vec<String>,
    },
}

/// GET /api/project-codes
pub async fn list_project_codes(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ProjectCodeEntry>>> {
    let entries = project_codes::list(&state.db)
        .await?
        .into_iter()
        .map(|code| ProjectCodeEntry {
            label: code.label(),
            code,
        })
        .collect();
    Ok(Json(entries))
}

/// POST /api/project-codes
pub async fn add_project_codes(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<BulkSummary>)> {
    let summary = match parse_json::<AddProjectCodes>(&body)? {
        AddProjectCodes::One { code, description } => {
            let added = project_codes::add(&state.db, &code, description.as_deref()).await?;
            BulkSummary {
                added: usize::from(added),
                skipped: usize::from(!added),
            }
        }
        AddProjectCodes::Many { labels } => project_codes::add_bulk(&state.db, &labels).await?,
    };

    let status = if summary.added > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(summary)))
}

/// POST /api/project-codes/import
///
/// Raw CSV body with a `code` column and optional `description` column.
pub async fn import_project_codes(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<BulkSummary>> {
    let text = std::str::from_utf8(&body)
        .map_err(|_| ApiError::Import("file is not UTF-8 text".to_string()))?;
    Ok(Json(project_codes::import_csv(&state.db, text).await?))
}

/// DELETE /api/project-codes/:id
pub async fn delete_project_code(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    project_codes::remove(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
