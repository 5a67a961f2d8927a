//! Key/value settings store for OAuth app credentials, the access token and
//! the transient error message shown after a failed authorization.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       Settings                           │
//! │  - Prefix namespacing                    │
//! │  - Fallback defaults (config / env)      │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       SettingStore (trait)               │
//! │  - MemorySettingStore (DashMap)          │
//! │  - SqliteSettingStore (AES-256-GCM)      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use github_api::settings::{keys, Settings, SqliteSettingStore};
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = SqliteSettingStore::new("settings.db", None)?;
//! let settings = Settings::new(Arc::new(store), "github_api_");
//!
//! settings.set(keys::CLIENT_ID, "abc123")?;
//! assert_eq!(settings.get(keys::CLIENT_ID)?.as_deref(), Some("abc123"));
//! settings.delete(keys::CLIENT_ID)?;
//! # Ok(())
//! # }
//! ```

mod encryption;
mod memory;
mod storage;

pub use encryption::{validate_key, SettingCipher};
pub use memory::MemorySettingStore;
pub use storage::SqliteSettingStore;

use crate::config::GitHubApiConfig;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Setting keys used across the crate (unprefixed).
pub mod keys {
    pub const CLIENT_ID: &str = "client_id";
    pub const CLIENT_SECRET: &str = "client_secret";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const ERROR_MESSAGE: &str = "error_message";
}

/// Scalar key/value persistence.
///
/// Implementations receive fully prefixed keys and must serialize writes
/// themselves.
pub trait SettingStore: Send + Sync {
    /// Returns the stored value, `None` when the key was never set or deleted.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a value. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Removes a value and returns what was stored, atomically: of two
    /// concurrent calls only one sees the value.
    fn take(&self, key: &str) -> Result<Option<String>>;
}

/// Prefix-namespaced view over a [`SettingStore`].
///
/// Keys passed in may be bare (`client_id`) or already prefixed
/// (`github_api_client_id`); the prefix is applied exactly once.
/// Empty stored values fall back to the registered default for that key.
#[derive(Clone)]
pub struct Settings {
    store: Arc<dyn SettingStore>,
    prefix: String,
    defaults: HashMap<String, String>,
}

impl Settings {
    pub fn new(store: Arc<dyn SettingStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            defaults: HashMap::new(),
        }
    }

    /// Opens the SQLite store named in the configuration, with the
    /// configured OAuth app credentials as fallbacks.
    pub fn open(config: &GitHubApiConfig) -> Result<Self> {
        let store = SqliteSettingStore::new(
            &config.storage.settings_db,
            config.storage.encryption_key.as_deref(),
        )
        .context("Failed to initialize settings store")?;

        let mut settings = Self::new(Arc::new(store), config.storage.prefix.clone());
        if let Some(client_id) = &config.oauth.client_id {
            settings = settings.with_default(keys::CLIENT_ID, client_id.as_str());
        }
        if let Some(client_secret) = &config.oauth.client_secret {
            settings = settings.with_default(keys::CLIENT_SECRET, client_secret.as_str());
        }
        Ok(settings)
    }

    /// Registers a fallback returned by [`Settings::get`] when the stored
    /// value is missing or empty.
    pub fn with_default(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.defaults.insert(self.full_key(key), value);
        }
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Applies the prefix unless the key already carries it.
    pub fn full_key(&self, key: &str) -> String {
        if key.starts_with(&self.prefix) {
            key.to_string()
        } else {
            format!("{}{}", self.prefix, key)
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let key = self.full_key(key);
        let value = self.store.get(&key)?.filter(|v| !v.is_empty());
        Ok(value.or_else(|| self.defaults.get(&key).cloned()))
    }

    /// Like [`Settings::get`] but maps a missing value to an empty string.
    pub fn get_or_empty(&self, key: &str) -> Result<String> {
        Ok(self.get(key)?.unwrap_or_default())
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = self.full_key(key);
        tracing::debug!(key = %key, "Setting updated");
        self.store.set(&key, value)
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        let key = self.full_key(key);
        tracing::debug!(key = %key, "Setting deleted");
        self.store.delete(&key)
    }

    /// Reads and deletes a value in one step. Defaults do not apply.
    pub fn take(&self, key: &str) -> Result<Option<String>> {
        let key = self.full_key(key);
        let value = self.store.take(&key)?.filter(|v| !v.is_empty());
        if value.is_some() {
            tracing::debug!(key = %key, "Setting taken");
        }
        Ok(value)
    }
}

/// Sanitizes an OAuth app credential entered through the settings form.
///
/// Values must match `[0-9A-Za-z]+` in full; anything else, surrounding
/// whitespace included, becomes empty.
pub fn sanitize_credential(value: &str) -> String {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric()) {
        value.to_string()
    } else {
        String::new()
    }
}
