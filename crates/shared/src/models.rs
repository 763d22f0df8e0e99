//! Data models for the project.
//!
//! This module defines the data structures passed between the catalog,
//! streaming and accounts crates: episode descriptors, playable video
//! sources and the per-user profile document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maximum number of entries kept in a user's watch history
pub const WATCH_HISTORY_LIMIT: usize = 50;

/// UI language used for generated titles and user-facing messages
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Locale {
    #[default]
    #[serde(rename = "ar")]
    Arabic,
    #[serde(rename = "en")]
    English,
}

impl Locale {
    /// Generic title for an episode that has no title of its own
    pub fn episode_title(&self, number: u32) -> String {
        match self {
            Locale::Arabic => format!("الحلقة {}", number),
            Locale::English => format!("Episode {}", number),
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locale::Arabic => write!(f, "ar"),
            Locale::English => write!(f, "en"),
        }
    }
}

impl std::str::FromStr for Locale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ar" => Ok(Locale::Arabic),
            "en" => Ok(Locale::English),
            _ => Err(anyhow::anyhow!("Invalid locale: {}", s)),
        }
    }
}

/// A single episode of an anime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeDescriptor {
    /// 1-based episode number
    pub id: u32,
    pub title: String,
    pub title_localized: String,
    pub is_filler: bool,
    pub is_recap: bool,
    pub aired: Option<String>,
    pub score: Option<f64>,
}

impl EpisodeDescriptor {
    /// Placeholder descriptor used when the catalog knows no episodes
    pub fn synthetic(number: u32, locale: Locale) -> Self {
        Self {
            id: number,
            title: Locale::English.episode_title(number),
            title_localized: locale.episode_title(number),
            is_filler: false,
            is_recap: false,
            aired: None,
            score: None,
        }
    }
}

/// A playable stream for one episode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoSource {
    /// Human-readable name of the provider that produced this source
    pub server_name: String,
    pub url: String,
    /// Quality label as reported by the provider ("720p", "1080p", ...)
    pub quality: String,
    pub mime_type: String,
}

/// Role attached to a user profile
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// One entry of the watch history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchEntry {
    pub anime_id: u32,
    pub episode_number: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub title: String,
}

/// Per-user document persisted in the profile store
///
/// Field names follow the stored document layout (camelCase).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub favorites: BTreeSet<u32>,
    /// Newest first, at most [`WATCH_HISTORY_LIMIT`] entries
    #[serde(default)]
    pub watch_history: Vec<WatchEntry>,
    #[serde(default)]
    pub watch_list: BTreeSet<u32>,
    #[serde(default)]
    pub profile_image: String,
    #[serde(default)]
    pub role: Role,
    /// Set by the store on creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Fresh profile with empty favorites, history and watch list
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    /// Toggle an anime in the favorites set. Returns true if it is now a favorite.
    pub fn toggle_favorite(&mut self, anime_id: u32) -> bool {
        if self.favorites.remove(&anime_id) {
            false
        } else {
            self.favorites.insert(anime_id);
            true
        }
    }

    /// Toggle an anime in the watch list. Returns true if it is now listed.
    pub fn toggle_watch_list(&mut self, anime_id: u32) -> bool {
        if self.watch_list.remove(&anime_id) {
            false
        } else {
            self.watch_list.insert(anime_id);
            true
        }
    }

    /// Prepend a watch entry, keeping only the most recent entries
    pub fn record_watch(&mut self, entry: WatchEntry) {
        self.watch_history.insert(0, entry);
        self.watch_history.truncate(WATCH_HISTORY_LIMIT);
    }
}
