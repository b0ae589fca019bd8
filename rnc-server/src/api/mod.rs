//! HTTP API handlers for rnc-server

pub mod attachments;
pub mod auth;
pub mod buildinfo;
pub mod form;
pub mod health;
pub mod logo;
pub mod project_codes;
pub mod records;
pub mod report;
pub mod transfer;
pub mod ui;

pub use auth::{create_session, require_password};
pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use ui::{serve_app_js, serve_index};
