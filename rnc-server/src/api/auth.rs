//! Access password for privileged actions
//!
//! Visitors can read everything. Mutations carry the configured password in
//! the `X-Access-Password` header. With no password configured, privileged
//! actions are disabled outright.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Json,
};
use rnc_common::config::Secret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Header carrying the access password
pub const PASSWORD_HEADER: &str = "x-access-password";

/// Compare through fixed-length digests so timing does not depend on where
/// the inputs first differ
fn password_matches(expected: &Secret, candidate: &str) -> bool {
    Sha256::digest(expected.expose().as_bytes()) == Sha256::digest(candidate.as_bytes())
}

/// Middleware for privileged routes
pub async fn require_password(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let Some(expected) = state.config.access_password.as_ref() else {
        return Err(ApiError::Forbidden(
            "privileged actions are disabled: no access password is configured".to_string(),
        ));
    };

    let provided = request
        .headers()
        .get(PASSWORD_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("access password required".to_string()))?;

    if !password_matches(expected, provided) {
        warn!(
            "Rejected {} {}: wrong access password",
            request.method(),
            request.uri().path()
        );
        return Err(ApiError::Unauthorized("wrong access password".to_string()));
    }

    Ok(next.run(request).await)
}

/// Session request from the UI's password prompt
#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub privileged: bool,
    /// False when no access password is configured
    pub enabled: bool,
}

/// POST /api/session
///
/// Lets the UI check a password before unlocking its privileged forms.
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> Json<SessionResponse> {
    let enabled = state.config.access_password.is_some();
    let privileged = state
        .config
        .access_password
        .as_ref()
        .is_some_and(|expected| password_matches(expected, &request.password));

    if enabled && !privileged {
        warn!("Session request with wrong access password");
    }

    Json(SessionResponse {
        privileged,
        enabled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_matches() {
        let secret = Secret::new("s3cret");
        assert!(password_matches(&secret, "s3cret"));
        assert!(!password_matches(&secret, "s3cret "));
        assert!(!password_matches(&secret, ""));
    }
}
