//! Cached catalog reads used by the front end.

use crate::api::{AnimeDetails, AnimeSummary, CatalogApi};
use crate::cache::TtlCache;
use crate::episodes::{CatalogEpisodes, EpisodeDirectory};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{EpisodeDescriptor, FetchError, Locale};
use std::sync::Arc;
use tracing::{debug, warn};

/// Browsable genre shown on the home screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    /// MAL genre id
    pub id: u32,
    pub name: &'static str,
    pub name_localized: &'static str,
    pub description: &'static str,
}

const CATEGORIES: [Category; 6] = [
    Category {
        id: 1,
        name: "Action",
        name_localized: "أكشن",
        description: "Anime packed with action scenes",
    },
    Category {
        id: 2,
        name: "Adventure",
        name_localized: "مغامرة",
        description: "Journeys and new worlds to explore",
    },
    Category {
        id: 4,
        name: "Comedy",
        name_localized: "كوميديا",
        description: "Funny and entertaining situations",
    },
    Category {
        id: 8,
        name: "Drama",
        name_localized: "دراما",
        description: "Moving, emotional stories",
    },
    Category {
        id: 10,
        name: "Fantasy",
        name_localized: "فانتازيا",
        description: "Magical and mythical worlds",
    },
    Category {
        id: 22,
        name: "Romance",
        name_localized: "رومانسية",
        description: "Love stories and relationships",
    },
];

/// Fixed list of browsable genres
pub fn categories() -> &'static [Category] {
    &CATEGORIES
}

/// Catalog reads with a TTL cache in front of the API
pub struct CatalogService {
    api: Arc<dyn CatalogApi>,
    cache: TtlCache<Value>,
    episodes: Arc<EpisodeDirectory>,
}

impl CatalogService {
    /// Create a service whose episode directory reads from the same API
    pub fn new(api: Arc<dyn CatalogApi>, cache: TtlCache<Value>, locale: Locale) -> Self {
        let source = Arc::new(CatalogEpisodes::new(Arc::clone(&api)));
        Self {
            api,
            cache,
            episodes: Arc::new(EpisodeDirectory::new(source, locale)),
        }
    }

    /// Create a service with an explicit episode directory
    pub fn with_episodes(
        api: Arc<dyn CatalogApi>,
        cache: TtlCache<Value>,
        episodes: Arc<EpisodeDirectory>,
    ) -> Self {
        Self {
            api,
            cache,
            episodes,
        }
    }

    /// Currently airing season
    pub async fn latest(&self, limit: u32) -> Result<Vec<AnimeSummary>, FetchError> {
        self.fetch_with_cache(
            &format!("/seasons/now?limit={}", limit),
            &format!("latest_anime:{}", limit),
        )
        .await
    }

    /// Most popular of all time
    pub async fn popular(&self, limit: u32) -> Result<Vec<AnimeSummary>, FetchError> {
        self.fetch_with_cache(
            &format!("/top/anime?filter=bypopularity&limit={}", limit),
            &format!("popular_anime:{}", limit),
        )
        .await
    }

    /// Top rated
    pub async fn trending(&self, limit: u32) -> Result<Vec<AnimeSummary>, FetchError> {
        self.fetch_with_cache(
            &format!("/top/anime?limit={}", limit),
            &format!("trending_anime:{}", limit),
        )
        .await
    }

    /// Full details of one anime
    pub async fn details(&self, anime_id: u32) -> Result<AnimeDetails, FetchError> {
        self.fetch_with_cache(
            &format!("/anime/{}/full", anime_id),
            &format!("anime_{}", anime_id),
        )
        .await
    }

    /// Title search, uncached; any failure yields an empty list
    pub async fn search(&self, query: &str, limit: u32) -> Vec<AnimeSummary> {
        let endpoint = format!(
            "/anime?q={}&limit={}",
            urlencoding::encode(query),
            limit
        );

        let result = async {
            let body = self.api.get_json(&endpoint).await?;
            decode_data::<Vec<AnimeSummary>>(&endpoint, body)
        }
        .await;

        match result {
            Ok(results) => {
                debug!(query = query, count = results.len(), "Search complete");
                results
            }
            Err(e) => {
                warn!(query = query, error = %e, "Search failed");
                Vec::new()
            }
        }
    }

    /// Episodes of an anime (see [`EpisodeDirectory::episodes_for`])
    pub async fn episodes(&self, anime_id: u32) -> Arc<Vec<EpisodeDescriptor>> {
        self.episodes.episodes_for(anime_id).await
    }

    /// Shared handle to the episode directory
    pub fn episode_directory(&self) -> Arc<EpisodeDirectory> {
        Arc::clone(&self.episodes)
    }

    /// Response cache, for statistics
    pub fn cache(&self) -> &TtlCache<Value> {
        &self.cache
    }

    async fn fetch_with_cache<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        cache_key: &str,
    ) -> Result<T, FetchError> {
        let data = self
            .cache
            .get_or_fetch(cache_key, || async {
                let body = self.api.get_json(endpoint).await?;
                match body {
                    Value::Object(mut map) => map.remove("data").ok_or(FetchError::EmptyResult {
                        url: endpoint.to_string(),
                    }),
                    _ => Err(FetchError::EmptyResult {
                        url: endpoint.to_string(),
                    }),
                }
            })
            .await?;

        serde_json::from_value(data).map_err(|e| FetchError::Decode {
            url: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}

fn decode_data<T: DeserializeOwned>(endpoint: &str, body: Value) -> Result<T, FetchError> {
    let data = body.get("data").cloned().unwrap_or(Value::Null);
    if data.is_null() {
        return Err(FetchError::EmptyResult {
            url: endpoint.to_string(),
        });
    }
    serde_json::from_value(data).map_err(|e| FetchError::Decode {
        url: endpoint.to_string(),
        message: e.to_string(),
    })
}
