//! Anime catalog access for AnimeStream.
//!
//! This library wraps the Jikan API v4 (MyAnimeList unofficial API) with a
//! TTL response cache and a per-anime episode directory.

pub mod api;
pub mod cache;
pub mod episodes;
pub mod service;

pub use api::{CatalogApi, JikanClient};
pub use cache::{CacheStats, TtlCache};
pub use episodes::{CatalogEpisodes, EpisodeDirectory, EpisodeSource, FALLBACK_EPISODE_COUNT};
pub use service::{categories, CatalogService, Category};
