//! Shared utilities, configuration, and error handling for Helpdesk
//!
//! This crate provides common functionality used across the Helpdesk service:
//! - Configuration management following 12-factor principles
//! - Error types and their HTTP mapping
//! - An injectable clock for time-dependent validation
//! - Request extractors shared by domain routers

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod state;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use db::RepositoryError;
pub use error::{Error, FieldErrors, Result};
pub use extractors::{JsonBody, Pagination};
pub use state::StateError;
