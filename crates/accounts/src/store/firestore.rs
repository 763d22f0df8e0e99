//! Cloud Firestore REST backend.
//!
//! Documents travel as Firestore typed values (`{"stringValue": ..}`) and
//! are converted to plain JSON at the boundary. Server timestamps are
//! applied with `REQUEST_TIME` field transforms.

use super::{document_path, DocumentStore, DocumentWrite};
use crate::error::StoreError;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Map, Number, Value};
use shared::config::IdentityConfig;
use shared::{http, FetchError};
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

/// Public Firestore endpoint
pub const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Profile store backed by Cloud Firestore
pub struct FirestoreStore {
    client: Client,
    base_url: String,
    project_id: String,
    token: RwLock<Option<String>>,
}

impl FirestoreStore {
    pub fn new(project_id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http::build_client(REQUEST_TIMEOUT)?,
            base_url: FIRESTORE_URL.to_string(),
            project_id: project_id.into(),
            token: RwLock::new(None),
        })
    }

    pub fn from_config(config: &IdentityConfig) -> Result<Self> {
        Self::new(config.project_id.clone())
    }

    /// Point the store at another endpoint (emulator)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Resource name of a document
    fn document_name(&self, collection: &str, id: &str) -> String {
        format!(
            "projects/{}/databases/(default)/documents/{}/{}",
            self.project_id, collection, id
        )
    }

    fn commit_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents:commit",
            self.base_url, self.project_id
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .token
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn commit(
        &self,
        collection: &str,
        id: &str,
        write: DocumentWrite,
        must_exist: bool,
    ) -> Result<(), StoreError> {
        let path = document_path(collection, id);
        let body = commit_body(&self.document_name(collection, id), &write, must_exist);
        let url = self.commit_url();
        debug!(document = %path, fields = ?write.field_paths(), "Committing document");

        let response = self
            .authorize(self.client.post(&url).json(&body))
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.clone(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(path)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::Unauthorized),
            status => Err(FetchError::Status {
                url,
                status: status.as_u16(),
            }
            .into()),
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let url = format!("{}/{}", self.base_url, self.document_name(collection, id));

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(StoreError::Unauthorized)
            }
            status if !status.is_success() => {
                return Err(FetchError::Status {
                    url,
                    status: status.as_u16(),
                }
                .into())
            }
            _ => {}
        }

        let text = response.text().await.map_err(|source| FetchError::Network {
            url: url.clone(),
            source,
        })?;
        let document = http::parse_body(&url, &text)?;

        let fields = document
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Ok(Some(Value::Object(decode_fields(&fields))))
    }

    async fn set_merge(
        &self,
        collection: &str,
        id: &str,
        write: DocumentWrite,
    ) -> Result<(), StoreError> {
        self.commit(collection, id, write, false).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        write: DocumentWrite,
    ) -> Result<(), StoreError> {
        self.commit(collection, id, write, true).await
    }

    fn set_auth_token(&self, token: Option<&str>) {
        let mut slot = self.token.write().unwrap_or_else(|p| p.into_inner());
        *slot = token.map(str::to_string);
    }
}

/// Body of a `documents:commit` request with a single write
fn commit_body(name: &str, write: &DocumentWrite, must_exist: bool) -> Value {
    let fields: Map<String, Value> = write
        .fields()
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect();

    let mut entry = json!({
        "update": {"name": name, "fields": fields},
        "updateMask": {"fieldPaths": write.fields().keys().collect::<Vec<_>>()},
    });

    if !write.server_timestamps().is_empty() {
        let transforms: Vec<Value> = write
            .server_timestamps()
            .iter()
            .map(|field| json!({"fieldPath": field, "setToServerValue": "REQUEST_TIME"}))
            .collect();
        entry["updateTransforms"] = Value::Array(transforms);
    }

    if must_exist {
        entry["currentDocument"] = json!({"exists": true});
    }

    json!({ "writes": [entry] })
}

/// Plain JSON to a Firestore typed value
fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({"nullValue": null}),
        Value::Bool(b) => json!({"booleanValue": b}),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({"integerValue": i.to_string()}),
            None => json!({"doubleValue": n.as_f64().unwrap_or_default()}),
        },
        Value::String(s) => json!({"stringValue": s}),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({"arrayValue": {"values": values}})
        }
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(key, value)| (key.clone(), encode_value(value)))
                .collect();
            json!({"mapValue": {"fields": fields}})
        }
    }
}

fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), decode_value(value)))
        .collect()
}

/// Firestore typed value to plain JSON
///
/// Timestamps and references become strings.
fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|map| map.iter().next()) else {
        return Value::Null;
    };

    match kind.as_str() {
        "booleanValue" => inner.clone(),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .or_else(|| inner.as_i64())
            .map(Value::from)
            .unwrap_or(Value::Null),
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default(),
        ),
        "geoPointValue" => inner.clone(),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::UserProfile;

    #[test]
    fn test_profile_survives_value_encoding() {
        let mut profile = UserProfile::new("sakura", "sakura@example.com");
        profile.toggle_favorite(21);
        profile.toggle_watch_list(5114);

        let plain = serde_json::to_value(&profile).unwrap();
        let decoded = decode_value(&encode_value(&plain));
        let restored: UserProfile = serde_json::from_value(decoded).unwrap();

        assert_eq!(restored, profile);
    }

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode_value(&json!(42)), json!({"integerValue": "42"}));
        assert_eq!(encode_value(&json!(1.5)), json!({"doubleValue": 1.5}));
        assert_eq!(encode_value(&json!(null)), json!({"nullValue": null}));
        assert_eq!(
            encode_value(&json!(["a"])),
            json!({"arrayValue": {"values": [{"stringValue": "a"}]}})
        );
    }

    #[test]
    fn test_decode_timestamp_and_empty_array() {
        let fields = json!({
            "lastLogin": {"timestampValue": "2024-01-15T10:00:00.123456Z"},
            "favorites": {"arrayValue": {}}
        });
        let decoded = decode_fields(fields.as_object().unwrap());

        assert_eq!(decoded["lastLogin"], "2024-01-15T10:00:00.123456Z");
        assert_eq!(decoded["favorites"], json!([]));
    }

    #[test]
    fn test_commit_body_for_update() {
        let write = DocumentWrite::new().server_timestamp("lastLogin");
        let body = commit_body("projects/p/databases/(default)/documents/users/u1", &write, true);
        let entry = &body["writes"][0];

        assert_eq!(entry["updateMask"]["fieldPaths"], json!([]));
        assert_eq!(entry["currentDocument"]["exists"], true);
        assert_eq!(entry["updateTransforms"][0]["fieldPath"], "lastLogin");
        assert_eq!(entry["updateTransforms"][0]["setToServerValue"], "REQUEST_TIME");
    }

    #[test]
    fn test_commit_body_for_merge() {
        let write = DocumentWrite::new().field("favorites", json!([1]));
        let body = commit_body("name", &write, false);
        let entry = &body["writes"][0];

        assert_eq!(entry["updateMask"]["fieldPaths"], json!(["favorites"]));
        assert_eq!(
            entry["update"]["fields"]["favorites"],
            json!({"arrayValue": {"values": [{"integerValue": "1"}]}})
        );
        assert!(entry.get("currentDocument").is_none());
        assert!(entry.get("updateTransforms").is_none());
    }

    #[test]
    fn test_urls() {
        let store = FirestoreStore::new("demo")
            .unwrap()
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(
            store.commit_url(),
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents:commit"
        );
        assert_eq!(
            store.document_name("users", "u1"),
            "projects/demo/databases/(default)/documents/users/u1"
        );
    }
}
