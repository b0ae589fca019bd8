//! Build information shown in the UI footer

use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::AppState;

/// Build information response
#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub version: String,
    pub git_hash: String,
    pub build_timestamp: String,
    pub build_profile: String,
    /// Whether privileged actions can be unlocked at all
    pub privileged_enabled: bool,
    pub mail_enabled: bool,
}

/// GET /api/buildinfo
pub async fn get_build_info(State(state): State<AppState>) -> Json<BuildInfo> {
    Json(BuildInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
        privileged_enabled: state.config.access_password.is_some(),
        mail_enabled: state.notifier.is_enabled(),
    })
}
