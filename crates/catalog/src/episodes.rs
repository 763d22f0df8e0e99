//! Per-anime episode directory.
//!
//! Episode lists are fetched once per anime and kept for the lifetime of the
//! directory. When the catalog has nothing for an anime, a generic
//! 24-episode list is synthesized and kept in the same way.

use crate::api::{CatalogApi, EpisodeEntry, PaginatedResponse};
use async_trait::async_trait;
use shared::{EpisodeDescriptor, FetchError, Locale};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Number of episodes synthesized when the catalog returns none
pub const FALLBACK_EPISODE_COUNT: u32 = 24;

/// Upper bound on episode pages followed for a single anime
const MAX_EPISODE_PAGES: u32 = 20;

/// Remote source of episode lists
#[async_trait]
pub trait EpisodeSource: Send + Sync {
    async fn fetch_episodes(&self, anime_id: u32) -> Result<Vec<EpisodeDescriptor>, FetchError>;
}

/// Episode source backed by the catalog API's paginated episodes endpoint
pub struct CatalogEpisodes {
    api: Arc<dyn CatalogApi>,
}

impl CatalogEpisodes {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self { api }
    }

    async fn fetch_page(
        &self,
        anime_id: u32,
        page: u32,
    ) -> Result<PaginatedResponse<EpisodeEntry>, FetchError> {
        let endpoint = format!("/anime/{}/episodes?page={}", anime_id, page);
        let body = self.api.get_json(&endpoint).await?;

        serde_json::from_value(body).map_err(|e| FetchError::Decode {
            url: endpoint,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl EpisodeSource for CatalogEpisodes {
    /// Follows pagination until the last page
    ///
    /// Only a failure on the first page is an error. A later page failing
    /// ends the walk with the episodes collected so far.
    async fn fetch_episodes(&self, anime_id: u32) -> Result<Vec<EpisodeDescriptor>, FetchError> {
        let mut episodes = Vec::new();

        for page in 1..=MAX_EPISODE_PAGES {
            let response = match self.fetch_page(anime_id, page).await {
                Ok(response) => response,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    warn!(
                        anime_id = anime_id,
                        page = page,
                        collected = episodes.len(),
                        error = %e,
                        "Episode page failed, keeping earlier pages"
                    );
                    break;
                }
            };

            debug!(
                anime_id = anime_id,
                page = page,
                count = response.data.len(),
                "Fetched episode page"
            );

            episodes.extend(response.data.into_iter().map(to_descriptor));

            if !response.pagination.has_next_page {
                break;
            }
        }

        Ok(episodes)
    }
}

fn to_descriptor(entry: EpisodeEntry) -> EpisodeDescriptor {
    let title = entry
        .title
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| Locale::English.episode_title(entry.mal_id));
    let title_localized = entry
        .title_romanji
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| title.clone());

    EpisodeDescriptor {
        id: entry.mal_id,
        title,
        title_localized,
        is_filler: entry.filler,
        is_recap: entry.recap,
        aired: entry.aired,
        score: entry.score,
    }
}

/// Memoized episode lists keyed by anime id
pub struct EpisodeDirectory {
    source: Arc<dyn EpisodeSource>,
    locale: Locale,
    episodes: Mutex<HashMap<u32, Arc<Vec<EpisodeDescriptor>>>>,
}

impl EpisodeDirectory {
    pub fn new(source: Arc<dyn EpisodeSource>, locale: Locale) -> Self {
        Self {
            source,
            locale,
            episodes: Mutex::new(HashMap::new()),
        }
    }

    /// Episodes of an anime, in order
    ///
    /// The first call per anime queries the source. An empty or failed
    /// response yields [`FALLBACK_EPISODE_COUNT`] synthetic episodes, and
    /// that list is memoized too: later calls never retry the source.
    pub async fn episodes_for(&self, anime_id: u32) -> Arc<Vec<EpisodeDescriptor>> {
        let cached = self.lock().get(&anime_id).cloned();
        if let Some(episodes) = cached {
            debug!(anime_id = anime_id, "Episode directory hit");
            return episodes;
        }

        let episodes = match self.source.fetch_episodes(anime_id).await {
            Ok(episodes) if !episodes.is_empty() => {
                info!(anime_id = anime_id, count = episodes.len(), "Loaded episode list");
                episodes
            }
            Ok(_) => {
                info!(anime_id = anime_id, "No episodes listed, using generated list");
                self.synthesize()
            }
            Err(e) => {
                warn!(anime_id = anime_id, error = %e, "Failed to fetch episodes, using generated list");
                self.synthesize()
            }
        };

        let episodes = Arc::new(episodes);
        self.lock()
            .entry(anime_id)
            .or_insert_with(|| Arc::clone(&episodes))
            .clone()
    }

    /// Look up a single episode by number
    pub async fn find(&self, anime_id: u32, number: u32) -> Option<EpisodeDescriptor> {
        self.episodes_for(anime_id)
            .await
            .iter()
            .find(|episode| episode.id == number)
            .cloned()
    }

    /// Whether the episode list of an anime has been loaded
    pub fn is_loaded(&self, anime_id: u32) -> bool {
        self.lock().contains_key(&anime_id)
    }

    fn synthesize(&self) -> Vec<EpisodeDescriptor> {
        (1..=FALLBACK_EPISODE_COUNT)
            .map(|number| EpisodeDescriptor::synthetic(number, self.locale))
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u32, Arc<Vec<EpisodeDescriptor>>>> {
        self.episodes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Episode source returning a fixed result and counting calls
    struct FixedSource {
        episodes: Option<Vec<EpisodeDescriptor>>,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(episodes: Option<Vec<EpisodeDescriptor>>) -> Arc<Self> {
            Arc::new(Self {
                episodes,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl EpisodeSource for FixedSource {
        async fn fetch_episodes(&self, anime_id: u32) -> Result<Vec<EpisodeDescriptor>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.episodes.clone().ok_or(FetchError::Status {
                url: format!("/anime/{}/episodes", anime_id),
                status: 500,
            })
        }
    }

    /// Catalog API serving canned pages keyed by endpoint
    struct PagedApi {
        pages: HashMap<String, Value>,
        missing_status: u16,
    }

    #[async_trait]
    impl CatalogApi for PagedApi {
        async fn get_json(&self, endpoint: &str) -> Result<Value, FetchError> {
            self.pages.get(endpoint).cloned().ok_or(FetchError::Status {
                url: endpoint.to_string(),
                status: self.missing_status,
            })
        }
    }

    fn episode(id: u32) -> EpisodeDescriptor {
        EpisodeDescriptor {
            id,
            title: format!("Title {}", id),
            title_localized: format!("Title {}", id),
            is_filler: false,
            is_recap: false,
            aired: None,
            score: None,
        }
    }

    #[tokio::test]
    async fn test_empty_source_synthesizes_24_episodes() {
        let source = FixedSource::new(Some(Vec::new()));
        let directory = EpisodeDirectory::new(source, Locale::Arabic);

        let episodes = directory.episodes_for(1).await;
        assert_eq!(episodes.len(), 24);
        for (index, episode) in episodes.iter().enumerate() {
            assert_eq!(episode.id, index as u32 + 1);
            assert!(!episode.is_filler);
            assert!(!episode.is_recap);
        }
        assert_eq!(episodes[0].title_localized, "الحلقة 1");
    }

    #[tokio::test]
    async fn test_failed_source_synthesizes_and_memoizes() {
        let source = FixedSource::new(None);
        let directory = EpisodeDirectory::new(source.clone(), Locale::English);

        let first = directory.episodes_for(7).await;
        let second = directory.episodes_for(7).await;

        assert_eq!(first.len(), FALLBACK_EPISODE_COUNT as usize);
        assert_eq!(second[23].title_localized, "Episode 24");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_list_is_memoized() {
        let source = FixedSource::new(Some(vec![episode(1), episode(2), episode(3)]));
        let directory = EpisodeDirectory::new(source.clone(), Locale::Arabic);

        assert!(!directory.is_loaded(5));
        assert_eq!(directory.episodes_for(5).await.len(), 3);
        assert_eq!(directory.episodes_for(5).await.len(), 3);
        assert!(directory.is_loaded(5));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let found = directory.find(5, 2).await.unwrap();
        assert_eq!(found.title, "Title 2");
        assert!(directory.find(5, 4).await.is_none());
    }

    #[tokio::test]
    async fn test_catalog_episodes_follows_pages() {
        let mut pages = HashMap::new();
        pages.insert(
            "/anime/21/episodes?page=1".to_string(),
            json!({
                "pagination": {"last_visible_page": 2, "has_next_page": true},
                "data": [{"mal_id": 1, "title": "Romance Dawn", "filler": false, "recap": false}]
            }),
        );
        pages.insert(
            "/anime/21/episodes?page=2".to_string(),
            json!({
                "pagination": {"last_visible_page": 2, "has_next_page": false},
                "data": [{"mal_id": 2, "title": null, "title_romanji": "Ore wa Luffy", "filler": true}]
            }),
        );

        let source = CatalogEpisodes::new(Arc::new(PagedApi {
            pages,
            missing_status: 404,
        }));
        let episodes = source.fetch_episodes(21).await.unwrap();

        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].title, "Romance Dawn");
        assert_eq!(episodes[0].title_localized, "Romance Dawn");
        assert_eq!(episodes[1].title, "Episode 2");
        assert_eq!(episodes[1].title_localized, "Ore wa Luffy");
        assert!(episodes[1].is_filler);
    }

    #[tokio::test]
    async fn test_catalog_episodes_propagates_failure() {
        let source = CatalogEpisodes::new(Arc::new(PagedApi {
            pages: HashMap::new(),
            missing_status: 404,
        }));
        assert!(source.fetch_episodes(1).await.is_err());
    }

    #[tokio::test]
    async fn test_later_page_failure_keeps_collected_episodes() {
        let data: Vec<Value> = (1..=100)
            .map(|id| json!({"mal_id": id, "title": format!("Chapter {}", id)}))
            .collect();
        let mut pages = HashMap::new();
        pages.insert(
            "/anime/21/episodes?page=1".to_string(),
            json!({
                "pagination": {"last_visible_page": 11, "has_next_page": true},
                "data": data
            }),
        );

        let api = Arc::new(PagedApi {
            pages,
            missing_status: 429,
        });
        let source = Arc::new(CatalogEpisodes::new(api));

        let fetched = source.fetch_episodes(21).await.unwrap();
        assert_eq!(fetched.len(), 100);

        let directory = EpisodeDirectory::new(source, Locale::Arabic);
        let episodes = directory.episodes_for(21).await;
        assert_eq!(episodes.len(), 100);
        assert_eq!(episodes[0].title, "Chapter 1");
        assert_eq!(episodes[99].title, "Chapter 100");
    }
}
