//! # RNC Common Library
//!
//! Shared code for the non-conformity register:
//! - Record, attachment and project-code models
//! - Lifecycle state machine for record status
//! - Configuration loading and data folder resolution
//! - Database initialization

pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;

pub use error::{Error, Result};
pub use lifecycle::{Status, Transition};
