//! Shared library for the AnimeStream workspace.
//!
//! This crate provides common functionality used across all crates:
//! - Configuration management
//! - Domain models (episodes, video sources, user profiles)
//! - Fetch error taxonomy and HTTP helpers
//! - Logging infrastructure

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::FetchError;
pub use logging::LogConfig;
pub use models::*;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
