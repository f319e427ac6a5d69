//! Remembers the last city the user picked.
//!
//! [`KeyValueStore`] is the durable string store; [`SqliteStore`] backs it
//! with a single table and [`MemoryStore`] keeps it in process. Writes on
//! SQLite are synchronous, so a value saved before exit is there on the next
//! launch and two saves to the same key always land in issue order.
//! [`PersistedSelection`] layers the key and the default slug on top and
//! swallows storage failures, which only cost the user their preference.

use crate::error::GuideError;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

pub trait KeyValueStore: Send {
    /// `Ok(None)` when nothing has been written under `key` yet.
    fn get(&self, key: &str) -> Result<Option<String>, GuideError>;
    fn set(&self, key: &str, value: &str) -> Result<(), GuideError>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GuideError> {
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, GuideError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), GuideError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, GuideError> {
        Ok(self
            .values
            .lock()
            .ok()
            .and_then(|values| values.get(key).cloned()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), GuideError> {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

pub struct PersistedSelection {
    store: Box<dyn KeyValueStore>,
    key: String,
    default_slug: String,
}

impl PersistedSelection {
    pub fn new(
        store: Box<dyn KeyValueStore>,
        key: impl Into<String>,
        default_slug: impl Into<String>,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            default_slug: default_slug.into(),
        }
    }

    pub fn default_slug(&self) -> &str {
        &self.default_slug
    }

    /// The stored slug, or the default when nothing is stored or the read fails.
    pub fn load(&self) -> String {
        match self.store.get(&self.key) {
            Ok(Some(slug)) if !slug.trim().is_empty() => slug,
            Ok(_) => {
                debug!("No saved city under '{}', using '{}'", self.key, self.default_slug);
                self.default_slug.clone()
            }
            Err(e) => {
                warn!("Failed to read saved city: {}. Using '{}'.", e, self.default_slug);
                self.default_slug.clone()
            }
        }
    }

    pub fn save(&self, slug: &str) {
        if let Err(e) = self.store.set(&self.key, slug) {
            warn!("Failed to save city '{}': {}", slug, e);
        }
    }
}
