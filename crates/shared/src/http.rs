//! Thin helpers around `reqwest` shared by the catalog and streaming clients.

use crate::error::FetchError;
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// User agent sent with every upstream request
pub const USER_AGENT: &str = concat!("AnimeStream/", env!("CARGO_PKG_VERSION"));

/// Build an HTTP client with the given request timeout
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create HTTP client")
}

/// Issue a GET and decode the body as JSON
///
/// Non-success statuses become [`FetchError::Status`]; an empty body or a
/// JSON `null` becomes [`FetchError::EmptyResult`].
pub async fn get_json(client: &Client, url: &str) -> Result<Value, FetchError> {
    debug!(url = %url, "GET");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|source| FetchError::Network {
        url: url.to_string(),
        source,
    })?;

    parse_body(url, &body)
}

/// Decode a response body, treating blank bodies as empty results
pub fn parse_body(url: &str, body: &str) -> Result<Value, FetchError> {
    if body.trim().is_empty() {
        return Err(FetchError::EmptyResult {
            url: url.to_string(),
        });
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Null) => Err(FetchError::EmptyResult {
            url: url.to_string(),
        }),
        Ok(value) => Ok(value),
        Err(e) => Err(FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        }),
    }
}
