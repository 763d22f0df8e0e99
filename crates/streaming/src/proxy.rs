//! Cross-origin proxy rewriting for provider URLs.

/// Rewrites provider URLs through a fixed proxy service
///
/// The proxy prefix is followed by the percent-encoded target URL, e.g.
/// `https://corsproxy.io/?url=` + `https%3A%2F%2F...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsProxy {
    prefix: Option<String>,
}

impl CorsProxy {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Pass URLs through unchanged
    pub fn direct() -> Self {
        Self { prefix: None }
    }

    pub fn from_config(prefix: Option<&str>) -> Self {
        match prefix.map(str::trim).filter(|p| !p.is_empty()) {
            Some(prefix) => Self::new(prefix),
            None => Self::direct(),
        }
    }

    /// URL to request instead of `target`
    pub fn rewrite(&self, target: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, urlencoding::encode(target)),
            None => target.to_string(),
        }
    }
}

impl Default for CorsProxy {
    fn default() -> Self {
        Self::new("https://corsproxy.io/?url=")
    }
}
