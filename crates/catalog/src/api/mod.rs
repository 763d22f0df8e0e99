//! Jikan API v4 client implementation.
//!
//! This module provides a retry-enabled client for interacting with the
//! Jikan API, behind the [`CatalogApi`] trait so callers can be tested
//! against canned responses.

pub mod client;
pub mod types;

pub use client::{CatalogApi, JikanClient};
pub use types::*;
