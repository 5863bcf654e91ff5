//! # CardVault Common Library
//!
//! Shared code for the CardVault services including:
//! - Database initialization and table records
//! - Configuration loading and root folder resolution
//! - Common error type
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
