//! # Clarify Common Library
//!
//! Shared code for the clarification services including:
//! - Common error type
//! - Configuration loading (TOML + environment overrides)
//! - Database pool and schema initialization
//! - The fixed 12-factor risk table
//! - Shared record models

pub mod config;
pub mod db;
pub mod error;
pub mod factors;
pub mod models;

pub use error::{Error, Result};
