//! Jikan API v4 response types.
//!
//! Only the fields the front end shows are modelled; everything is lenient
//! because Jikan omits or nulls fields freely.

use serde::{Deserialize, Serialize};

/// Pagination metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub last_visible_page: u32,
    #[serde(default)]
    pub has_next_page: bool,
}

/// Paginated list wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Anime entry as returned by list and search endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimeSummary {
    pub mal_id: u32,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub images: AnimeImages,
    pub title: String,
    #[serde(default)]
    pub title_english: Option<String>,
    #[serde(default)]
    pub title_japanese: Option<String>,
    #[serde(rename = "type", default)]
    pub anime_type: Option<String>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub genres: Vec<MalEntity>,
}

impl AnimeSummary {
    /// Best cover image available
    pub fn cover_url(&self) -> Option<&str> {
        self.images.jpg.large_image_url.as_deref()
            .or(self.images.jpg.image_url.as_deref())
    }
}

/// Full anime details (`/anime/{id}/full`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimeDetails {
    pub mal_id: u32,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub images: AnimeImages,
    pub title: String,
    #[serde(default)]
    pub title_english: Option<String>,
    #[serde(default)]
    pub title_japanese: Option<String>,
    #[serde(default)]
    pub title_synonyms: Vec<String>,
    #[serde(rename = "type", default)]
    pub anime_type: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub airing: bool,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub studios: Vec<MalEntity>,
    #[serde(default)]
    pub genres: Vec<MalEntity>,
    #[serde(default)]
    pub themes: Vec<MalEntity>,
    #[serde(default)]
    pub trailer: Option<Trailer>,
}

/// Episode entry (`/anime/{id}/episodes`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeEntry {
    /// Episode number, 1-based
    pub mal_id: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub title_japanese: Option<String>,
    #[serde(default)]
    pub title_romanji: Option<String>,
    #[serde(default)]
    pub aired: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub filler: bool,
    #[serde(default)]
    pub recap: bool,
}

/// Anime images
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnimeImages {
    #[serde(default)]
    pub jpg: ImageSet,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImageSet {
    pub image_url: Option<String>,
    pub small_image_url: Option<String>,
    pub large_image_url: Option<String>,
}

/// Trailer metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trailer {
    pub youtube_id: Option<String>,
    pub url: Option<String>,
}

/// MAL entity (genre, studio, producer, etc.)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MalEntity {
    pub mal_id: u32,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
}
