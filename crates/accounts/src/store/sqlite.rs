//! Local SQLite document store.
//!
//! Each document is one row holding its JSON body.

use super::{apply_write, document_path, DocumentStore, DocumentWrite};
use crate::error::StoreError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    updated_at TIMESTAMP NOT NULL,
    PRIMARY KEY (collection, id)
);
";

/// Profile store backed by a SQLite file
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening profile database");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Self::with_connection(conn)
    }

    /// Store that lives only as long as the process
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .context("Failed to read schema version")?;

        if version < SCHEMA_VERSION {
            info!(from = version, to = SCHEMA_VERSION, "Creating profile schema");
            conn.execute_batch(SCHEMA)
                .context("Failed to create profile schema")?;
            conn.execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
                .context("Failed to set schema version")?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Read-modify-write inside one transaction
    fn write(
        &self,
        collection: &str,
        id: &str,
        write: DocumentWrite,
        must_exist: bool,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let existing = load(&tx, collection, id)?;
        if must_exist && existing.is_none() {
            return Err(StoreError::NotFound(document_path(collection, id)));
        }

        let mut document = existing.unwrap_or_default();
        let now = Utc::now();
        apply_write(&mut document, write, now);

        let body = Value::Object(document).to_string();
        tx.execute(
            "INSERT INTO documents (collection, id, body, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![collection, id, body, now],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn load(
    conn: &Connection,
    collection: &str,
    id: &str,
) -> Result<Option<Map<String, Value>>, StoreError> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;

    match body {
        None => Ok(None),
        Some(body) => match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(document)) => Ok(Some(document)),
            Ok(_) => Err(StoreError::Invalid {
                path: document_path(collection, id),
                message: "stored body is not an object".to_string(),
            }),
            Err(e) => Err(StoreError::Invalid {
                path: document_path(collection, id),
                message: e.to_string(),
            }),
        },
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.lock();
        Ok(load(&conn, collection, id)?.map(Value::Object))
    }

    async fn set_merge(
        &self,
        collection: &str,
        id: &str,
        write: DocumentWrite,
    ) -> Result<(), StoreError> {
        self.write(collection, id, write, false)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        write: DocumentWrite,
    ) -> Result<(), StoreError> {
        self.write(collection, id, write, true)
    }
}
