//! Per-user favorites, watch list and watch history.

use crate::error::{AccountError, StoreError};
use crate::session::USERS_COLLECTION;
use crate::store::{DocumentStore, DocumentWrite};
use chrono::Utc;
use serde_json::Value;
use shared::{UserProfile, WatchEntry};
use std::sync::Arc;
use tracing::debug;

/// Typed access to profile documents
pub struct ProfileStore {
    store: Arc<dyn DocumentStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self, user_id: &str) -> Result<Option<UserProfile>, AccountError> {
        let Some(document) = self.store.get(USERS_COLLECTION, user_id).await? else {
            return Ok(None);
        };

        let profile = serde_json::from_value(document).map_err(|e| StoreError::Invalid {
            path: format!("{}/{}", USERS_COLLECTION, user_id),
            message: e.to_string(),
        })?;
        Ok(Some(profile))
    }

    /// Merge the profile into its document
    ///
    /// Creation and last-login times are owned by the store and never
    /// overwritten from here.
    pub async fn save(&self, user_id: &str, profile: &UserProfile) -> Result<(), AccountError> {
        let write = DocumentWrite::from_serializable(profile)?
            .without("createdAt")
            .without("lastLogin");
        self.store.set_merge(USERS_COLLECTION, user_id, write).await?;
        Ok(())
    }

    /// Returns true if the anime is now a favorite
    pub async fn toggle_favorite(&self, user_id: &str, anime_id: u32) -> Result<bool, AccountError> {
        let mut profile = self.require(user_id).await?;
        let added = profile.toggle_favorite(anime_id);
        self.write_field(user_id, "favorites", serde_json::to_value(&profile.favorites))
            .await?;

        debug!(user_id = user_id, anime_id = anime_id, added = added, "Toggled favorite");
        Ok(added)
    }

    /// Returns true if the anime is now on the watch list
    pub async fn toggle_watch_list(
        &self,
        user_id: &str,
        anime_id: u32,
    ) -> Result<bool, AccountError> {
        let mut profile = self.require(user_id).await?;
        let added = profile.toggle_watch_list(anime_id);
        self.write_field(user_id, "watchList", serde_json::to_value(&profile.watch_list))
            .await?;

        debug!(user_id = user_id, anime_id = anime_id, added = added, "Toggled watch list");
        Ok(added)
    }

    /// Prepend an entry to the watch history
    pub async fn record_watch(
        &self,
        user_id: &str,
        anime_id: u32,
        episode_number: u32,
        title: &str,
    ) -> Result<(), AccountError> {
        let mut profile = self.require(user_id).await?;
        profile.record_watch(WatchEntry {
            anime_id,
            episode_number,
            timestamp: Utc::now(),
            title: title.to_string(),
        });
        self.write_field(
            user_id,
            "watchHistory",
            serde_json::to_value(&profile.watch_history),
        )
        .await
    }

    async fn require(&self, user_id: &str) -> Result<UserProfile, AccountError> {
        self.load(user_id).await?.ok_or_else(|| {
            StoreError::NotFound(format!("{}/{}", USERS_COLLECTION, user_id)).into()
        })
    }

    async fn write_field(
        &self,
        user_id: &str,
        field: &str,
        value: serde_json::Result<Value>,
    ) -> Result<(), AccountError> {
        let value = value.map_err(|e| StoreError::Invalid {
            path: format!("{}/{}", USERS_COLLECTION, user_id),
            message: e.to_string(),
        })?;
        self.store
            .update(USERS_COLLECTION, user_id, DocumentWrite::new().field(field, value))
            .await?;
        Ok(())
    }
}
