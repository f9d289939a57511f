//! # Civic Tally Common Library
//!
//! Shared code for the tally service and its tooling:
//! - Error type used by every ledger operation
//! - Bootstrap configuration loading
//! - Database initialization, schema and lock-retry helpers
//! - Timestamp utilities

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
