//! rnc-server library - Non-conformity register service
//!
//! Record store, attachments, PDF report, CSV transfer and e-mail
//! notification behind an axum HTTP API with an embedded browser UI.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use rnc_common::config::AppConfig;
use sqlx::SqlitePool;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod logo;
pub mod notifier;
pub mod pagination;
pub mod report;
pub mod transfer;

pub use error::{ApiError, ApiResult};
pub use notifier::{Notifier, NotifyOutcome};

/// Largest accepted request body (photo uploads, CSV imports)
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Configuration resolved once at startup
    pub config: Arc<AppConfig>,
    pub notifier: Arc<Notifier>,
}

impl AppState {
    /// Create application state; the notifier is built from the mail settings
    pub fn new(db: SqlitePool, config: AppConfig) -> Self {
        let notifier =
            Notifier::from_config(&config.mail).with_base_url(config.public_base_url.clone());
        Self {
            db,
            config: Arc::new(config),
            notifier: Arc::new(notifier),
        }
    }
}

/// Build application router
///
/// Reading is open to visitors; every mutation requires the access password.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, post, put};

    // Privileged routes (require the access password)
    let privileged = Router::new()
        .route("/api/records", post(api::records::create_record))
        .route(
            "/api/records/:id",
            put(api::records::update_record).delete(api::records::delete_record),
        )
        .route("/api/records/:id/close", post(api::records::close_record))
        .route("/api/records/:id/reopen", post(api::records::reopen_record))
        .route("/api/records/:id/cancel", post(api::records::cancel_record))
        .route(
            "/api/records/:id/attachments",
            post(api::attachments::add_attachments),
        )
        .route(
            "/api/attachments/:id",
            delete(api::attachments::delete_attachment),
        )
        .route("/api/import", post(api::transfer::import_csv))
        .route("/api/project-codes", post(api::project_codes::add_project_codes))
        .route(
            "/api/project-codes/import",
            post(api::project_codes::import_project_codes),
        )
        .route(
            "/api/project-codes/:id",
            delete(api::project_codes::delete_project_code),
        )
        .route(
            "/api/logo",
            put(api::logo::upload_logo).delete(api::logo::delete_logo),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_password,
        ));

    // Public routes (visitors)
    let public = Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/api/session", post(api::create_session))
        .route("/api/records", get(api::records::list_records))
        .route("/api/records/next-number", get(api::records::next_number))
        .route("/api/records/:id", get(api::records::get_record))
        .route(
            "/api/records/:id/attachments",
            get(api::attachments::list_attachments),
        )
        .route("/api/attachments/:id", get(api::attachments::get_attachment))
        .route("/api/records/:id/report.pdf", get(api::report::download_report))
        .route("/api/export.csv", get(api::transfer::export_csv))
        .route("/api/project-codes", get(api::project_codes::list_project_codes))
        .route("/api/logo", get(api::logo::get_logo))
        .merge(api::health_routes());

    // Combine routers
    Router::new()
        .merge(privileged)
        .merge(public)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
