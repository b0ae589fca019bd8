//! Database access layer for rnc-server
//!
//! Schema creation lives in `rnc_common::db::init`; these modules hold the
//! queries for each table.

pub mod attachments;
pub mod project_codes;
pub mod records;

pub use records::{CloseRequest, ReasonRequest, RecordFields, RecordFilter, RecordPage};
