//! Document storage for user profiles.
//!
//! Profiles are JSON objects addressed by `(collection, id)`. Writes are
//! partial: a [`DocumentWrite`] names the top-level fields it sets, plus any
//! fields the store must fill with its own current time.

mod firestore;
mod memory;
mod sqlite;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// A partial document write
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentWrite {
    fields: Map<String, Value>,
    server_timestamps: Vec<String>,
}

impl DocumentWrite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write every top-level field of a serializable object
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, StoreError> {
        match serde_json::to_value(value) {
            Ok(Value::Object(fields)) => Ok(Self {
                fields,
                server_timestamps: Vec::new(),
            }),
            Ok(other) => Err(StoreError::Invalid {
                path: String::new(),
                message: format!("expected an object, got {}", other),
            }),
            Err(e) => Err(StoreError::Invalid {
                path: String::new(),
                message: e.to_string(),
            }),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set a field to the store's clock at commit time
    pub fn server_timestamp(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.fields.remove(&name);
        if !self.server_timestamps.contains(&name) {
            self.server_timestamps.push(name);
        }
        self
    }

    /// Leave a field untouched
    pub fn without(mut self, name: &str) -> Self {
        self.fields.remove(name);
        self.server_timestamps.retain(|field| field != name);
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn server_timestamps(&self) -> &[String] {
        &self.server_timestamps
    }

    /// Every field this write touches
    pub fn field_paths(&self) -> Vec<String> {
        self.fields
            .keys()
            .cloned()
            .chain(self.server_timestamps.iter().cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.server_timestamps.is_empty()
    }
}

/// Keyed JSON document storage
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document; `None` if it does not exist
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Write fields, creating the document if needed and keeping other fields
    async fn set_merge(
        &self,
        collection: &str,
        id: &str,
        write: DocumentWrite,
    ) -> Result<(), StoreError>;

    /// Write fields of an existing document
    ///
    /// Fails with [`StoreError::NotFound`] if the document does not exist.
    async fn update(&self, collection: &str, id: &str, write: DocumentWrite)
        -> Result<(), StoreError>;

    /// Credentials for subsequent requests; local stores ignore them
    fn set_auth_token(&self, _token: Option<&str>) {}
}

/// `collection/id`, used in logs and errors
pub(crate) fn document_path(collection: &str, id: &str) -> String {
    format!("{}/{}", collection, id)
}

/// Apply a write to a document held locally
pub(crate) fn apply_write(document: &mut Map<String, Value>, write: DocumentWrite, now: DateTime<Utc>) {
    let timestamp = Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true));
    for name in write.server_timestamps {
        document.insert(name, timestamp.clone());
    }
    for (name, value) in write.fields {
        document.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::UserProfile;

    #[test]
    fn test_write_from_profile() {
        let profile = UserProfile::new("sakura", "sakura@example.com");
        let write = DocumentWrite::from_serializable(&profile)
            .unwrap()
            .server_timestamp("createdAt");

        assert_eq!(write.fields()["username"], "sakura");
        assert!(write.fields().get("createdAt").is_none());
        assert_eq!(write.server_timestamps(), ["createdAt".to_string()]);
        assert!(write.field_paths().contains(&"createdAt".to_string()));
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = DocumentWrite::from_serializable(&vec![1, 2]).unwrap_err();
        assert!(matches!(err, StoreError::Invalid { .. }));
    }

    #[test]
    fn test_apply_write_keeps_other_fields() {
        let mut document = json!({"username": "a", "favorites": [1]})
            .as_object()
            .cloned()
            .unwrap();
        let write = DocumentWrite::new()
            .field("favorites", json!([1, 2]))
            .server_timestamp("lastLogin");

        apply_write(&mut document, write, Utc::now());

        assert_eq!(document["username"], "a");
        assert_eq!(document["favorites"], json!([1, 2]));
        let stamp = document["lastLogin"].as_str().unwrap();
        assert!(stamp.parse::<DateTime<Utc>>().is_ok());
    }

    #[test]
    fn test_without_drops_field() {
        let write = DocumentWrite::new()
            .field("a", 1)
            .server_timestamp("b")
            .without("a")
            .without("b");
        assert!(write.is_empty());
    }
}
