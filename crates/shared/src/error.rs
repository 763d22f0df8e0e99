//! Error taxonomy for upstream fetches.
//!
//! Every remote read (catalog, video providers) fails with a [`FetchError`].
//! Callers decide whether to propagate it or degrade to a fallback value.

use thiserror::Error;

/// Failure of a single upstream request
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure: DNS, connect, TLS, timeout
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Upstream answered with a non-success status
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    /// Upstream answered successfully but with nothing usable in it
    #[error("{url} returned no usable payload")]
    EmptyResult { url: String },

    /// Body could not be decoded into the expected shape
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    /// URL of the request that failed
    pub fn url(&self) -> &str {
        match self {
            FetchError::Network { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::EmptyResult { url }
            | FetchError::Decode { url, .. } => url,
        }
    }

    /// Whether retrying the same request could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::EmptyResult { .. } | FetchError::Decode { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        let rate_limited = FetchError::Status {
            url: "http://x".to_string(),
            status: 429,
        };
        let unavailable = FetchError::Status {
            url: "http://x".to_string(),
            status: 503,
        };
        let not_found = FetchError::Status {
            url: "http://x".to_string(),
            status: 404,
        };

        assert!(rate_limited.is_transient());
        assert!(unavailable.is_transient());
        assert!(!not_found.is_transient());
    }

    #[test]
    fn test_empty_result_is_not_transient() {
        let err = FetchError::EmptyResult {
            url: "http://x/empty".to_string(),
        };
        assert!(!err.is_transient());
        assert_eq!(err.url(), "http://x/empty");
        assert_eq!(err.to_string(), "http://x/empty returned no usable payload");
    }
}
