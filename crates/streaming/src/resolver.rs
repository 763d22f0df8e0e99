//! Multi-provider video source resolution.

use crate::fallback;
use crate::provider::{ConsumetProvider, HttpTransport, VideoProvider};
use crate::proxy::CorsProxy;
use anyhow::Result;
use futures::future::join_all;
use shared::config::{ResolveMode, StreamingConfig};
use shared::{http, FetchError, VideoSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Queries every provider and collects whatever they return
pub struct SourceResolver {
    providers: Vec<Box<dyn VideoProvider>>,
    mode: ResolveMode,
}

impl SourceResolver {
    /// Create a resolver over providers in priority order
    pub fn new(providers: Vec<Box<dyn VideoProvider>>, mode: ResolveMode) -> Self {
        Self { providers, mode }
    }

    /// Resolver over the built-in providers, configured from `[streaming]`
    pub fn from_config(config: &StreamingConfig) -> Result<Self> {
        let client = http::build_client(Duration::from_secs(config.request_timeout_seconds))?;
        let transport = Arc::new(HttpTransport::new(client));
        let proxy = CorsProxy::from_config(config.cors_proxy.as_deref());

        Ok(Self::new(
            ConsumetProvider::all(&config.provider_base_url, &proxy, transport),
            config.resolve_mode,
        ))
    }

    /// Names of the configured providers, in order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }

    /// Playable sources for one episode, best first; never empty
    ///
    /// Every provider is attempted, even after an earlier one succeeded.
    /// Failures are logged and skipped. Successful sources keep provider
    /// order. If nothing succeeds, a single demo source is returned.
    pub async fn resolve(&self, anime_id: u32, episode: u32) -> Vec<VideoSource> {
        let attempts = self.attempt_all(anime_id, episode).await;

        let mut sources = Vec::with_capacity(attempts.len());
        for (provider, attempt) in self.providers.iter().zip(attempts) {
            match attempt {
                Ok(source) => {
                    info!(
                        provider = provider.name(),
                        anime_id = anime_id,
                        episode = episode,
                        quality = %source.quality,
                        "Provider returned a source"
                    );
                    sources.push(source);
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        anime_id = anime_id,
                        episode = episode,
                        error = %e,
                        "Provider failed"
                    );
                }
            }
        }

        if sources.is_empty() {
            let demo = fallback::demo_source();
            warn!(
                anime_id = anime_id,
                episode = episode,
                url = %demo.url,
                "All providers failed, using demo stream"
            );
            sources.push(demo);
        }

        sources
    }

    async fn attempt_all(
        &self,
        anime_id: u32,
        episode: u32,
    ) -> Vec<Result<VideoSource, FetchError>> {
        match self.mode {
            ResolveMode::Sequential => {
                let mut attempts = Vec::with_capacity(self.providers.len());
                for provider in &self.providers {
                    attempts.push(provider.fetch_source(anime_id, episode).await);
                }
                attempts
            }
            ResolveMode::Concurrent => {
                join_all(
                    self.providers
                        .iter()
                        .map(|provider| provider.fetch_source(anime_id, episode)),
                )
                .await
            }
        }
    }
}
