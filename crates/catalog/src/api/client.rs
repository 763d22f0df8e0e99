//! Jikan API client with retry logic.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::http;
use shared::FetchError;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Read access to the catalog API
///
/// `get_json` returns the whole response body; most endpoints wrap their
/// payload in a `data` field.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn get_json(&self, endpoint: &str) -> Result<Value, FetchError>;
}

/// Jikan API v4 client
pub struct JikanClient {
    /// HTTP client
    client: Client,
    /// Base URL for Jikan API
    base_url: String,
    /// Maximum retries for transient failures
    max_retries: u32,
    /// Base delay for retry (exponential backoff)
    retry_delay_ms: u64,
}

impl JikanClient {
    /// Create a new Jikan client
    pub fn new(
        base_url: impl Into<String>,
        max_retries: u32,
        retry_delay_ms: u64,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries,
            retry_delay_ms,
        })
    }

    /// Build a client from the `[catalog]` configuration section
    pub fn from_config(config: &shared::config::CatalogConfig) -> anyhow::Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.max_retries,
            config.retry_delay_ms,
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    /// Base URL requests are issued against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(2u64.saturating_pow(attempt)))
    }
}

#[async_trait]
impl CatalogApi for JikanClient {
    /// GET with retry on transport errors, 429 and 5xx
    async fn get_json(&self, endpoint: &str) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut attempt = 0;

        loop {
            debug!(url = %url, attempt = attempt + 1, "Making catalog request");

            match http::get_json(&self.client, &url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    warn!(
                        url = %url,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Catalog request failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Catalog request failed");
                    return Err(e);
                }
            }
        }
    }
}
