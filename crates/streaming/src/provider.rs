//! Upstream video providers.
//!
//! Each provider turns `(anime id, episode)` into at most one playable
//! source. The built-in providers are three Consumet scrapers reached
//! through the CORS proxy.

use crate::proxy::CorsProxy;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use shared::{http, FetchError, VideoSource};
use std::sync::Arc;
use tracing::debug;

/// Quality label used when a provider does not report one
pub const DEFAULT_QUALITY: &str = "720p";

/// MIME type reported for progressive sources
pub const DEFAULT_MIME_TYPE: &str = "mp4";

/// MIME type reported for HLS playlists
pub const HLS_MIME_TYPE: &str = "application/x-mpegURL";

/// A source of playable video links
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Server name attached to the sources this provider produces
    fn name(&self) -> &str;

    async fn fetch_source(&self, anime_id: u32, episode: u32) -> Result<VideoSource, FetchError>;
}

/// Transport used by providers to fetch JSON documents
#[async_trait]
pub trait SourceTransport: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError>;
}

/// Plain HTTP transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceTransport for HttpTransport {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        http::get_json(&self.client, url).await
    }
}

/// Consumet scraper backends, in their fixed query order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderRoute {
    GogoAnime,
    AnimePahe,
    NineAnime,
}

impl ProviderRoute {
    pub const ALL: [ProviderRoute; 3] = [
        ProviderRoute::GogoAnime,
        ProviderRoute::AnimePahe,
        ProviderRoute::NineAnime,
    ];

    pub fn server_name(&self) -> &'static str {
        match self {
            ProviderRoute::GogoAnime => "GogoAnime",
            ProviderRoute::AnimePahe => "AnimePahe",
            ProviderRoute::NineAnime => "9Anime",
        }
    }

    /// Watch URL for one episode, before proxy rewriting
    pub fn watch_url(&self, base_url: &str, anime_id: u32, episode: u32) -> String {
        let base_url = base_url.trim_end_matches('/');
        match self {
            ProviderRoute::GogoAnime => format!(
                "{}/anime/gogoanime/watch/{}-episode-{}",
                base_url, anime_id, episode
            ),
            ProviderRoute::AnimePahe => format!(
                "{}/anime/animepahe/watch/{}/{}",
                base_url, anime_id, episode
            ),
            ProviderRoute::NineAnime => {
                format!("{}/anime/9anime/watch/{}/{}", base_url, anime_id, episode)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct SourcesResponse {
    #[serde(default)]
    sources: Vec<SourceItem>,
}

#[derive(Debug, Deserialize)]
struct SourceItem {
    #[serde(default)]
    url: String,
    #[serde(default)]
    quality: Option<String>,
    #[serde(rename = "isM3U8", default)]
    is_m3u8: bool,
}

/// Provider backed by one Consumet route
pub struct ConsumetProvider {
    route: ProviderRoute,
    base_url: String,
    proxy: CorsProxy,
    transport: Arc<dyn SourceTransport>,
}

impl ConsumetProvider {
    pub fn new(
        route: ProviderRoute,
        base_url: impl Into<String>,
        proxy: CorsProxy,
        transport: Arc<dyn SourceTransport>,
    ) -> Self {
        Self {
            route,
            base_url: base_url.into(),
            proxy,
            transport,
        }
    }

    /// The three built-in providers in query order, sharing one transport
    pub fn all(
        base_url: &str,
        proxy: &CorsProxy,
        transport: Arc<dyn SourceTransport>,
    ) -> Vec<Box<dyn VideoProvider>> {
        ProviderRoute::ALL
            .iter()
            .map(|&route| {
                Box::new(Self::new(
                    route,
                    base_url,
                    proxy.clone(),
                    Arc::clone(&transport),
                )) as Box<dyn VideoProvider>
            })
            .collect()
    }
}

#[async_trait]
impl VideoProvider for ConsumetProvider {
    fn name(&self) -> &str {
        self.route.server_name()
    }

    async fn fetch_source(&self, anime_id: u32, episode: u32) -> Result<VideoSource, FetchError> {
        let target = self.route.watch_url(&self.base_url, anime_id, episode);
        let url = self.proxy.rewrite(&target);
        debug!(provider = self.name(), watch_url = %target, "Querying provider");

        let body = self.transport.get_json(&url).await?;
        let response: SourcesResponse =
            serde_json::from_value(body).map_err(|e| FetchError::Decode {
                url: target.clone(),
                message: e.to_string(),
            })?;

        let first = response
            .sources
            .into_iter()
            .find(|source| !source.url.trim().is_empty())
            .ok_or(FetchError::EmptyResult { url: target })?;

        let mime_type = if first.is_m3u8 || first.url.contains(".m3u8") {
            HLS_MIME_TYPE
        } else {
            DEFAULT_MIME_TYPE
        };

        Ok(VideoSource {
            server_name: self.route.server_name().to_string(),
            url: first.url,
            quality: first
                .quality
                .filter(|quality| !quality.is_empty())
                .unwrap_or_else(|| DEFAULT_QUALITY.to_string()),
            mime_type: mime_type.to_string(),
        })
    }
}
