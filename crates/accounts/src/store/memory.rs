use super::{apply_write, document_path, DocumentStore, DocumentWrite};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

type Documents = HashMap<(String, String), Map<String, Value>>;

/// In-process store, used for tests and offline runs
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<Documents>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Documents> {
        self.documents.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let documents = self.lock();
        Ok(documents
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
            .map(Value::Object))
    }

    async fn set_merge(
        &self,
        collection: &str,
        id: &str,
        write: DocumentWrite,
    ) -> Result<(), StoreError> {
        let mut documents = self.lock();
        let document = documents
            .entry((collection.to_string(), id.to_string()))
            .or_default();
        apply_write(document, write, Utc::now());
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        write: DocumentWrite,
    ) -> Result<(), StoreError> {
        let mut documents = self.lock();
        let document = documents
            .get_mut(&(collection.to_string(), id.to_string()))
            .ok_or_else(|| StoreError::NotFound(document_path(collection, id)))?;
        apply_write(document, write, Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_merge_then_get() {
        let store = MemoryStore::new();
        assert!(store.get("users", "u1").await.unwrap().is_none());

        store
            .set_merge("users", "u1", DocumentWrite::new().field("username", "a"))
            .await
            .unwrap();
        store
            .set_merge("users", "u1", DocumentWrite::new().field("email", "a@b.c"))
            .await
            .unwrap();

        let document = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(document, json!({"username": "a", "email": "a@b.c"}));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = MemoryStore::new();
        let err = store
            .update("users", "ghost", DocumentWrite::new().server_timestamp("lastLogin"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(path) if path == "users/ghost"));
        assert!(store.is_empty());
    }
}
