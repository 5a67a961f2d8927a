//! SQLite-backed settings store.
//!
//! Values are encrypted with AES-256-GCM when the store is opened with a
//! master key, and kept as plaintext otherwise.

use super::encryption::SettingCipher;
use super::SettingStore;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Settings persisted in a single SQLite table.
///
/// # Schema
/// ```sql
/// CREATE TABLE settings (
///     key TEXT PRIMARY KEY,
///     value TEXT NOT NULL,   -- ciphertext when encrypted
///     nonce TEXT,            -- NULL for plaintext rows
///     updated_at TEXT NOT NULL
/// );
/// ```
///
/// The connection sits behind a mutex, so writes are serialized.
pub struct SqliteSettingStore {
    conn: Mutex<Connection>,
    cipher: Option<SettingCipher>,
}

impl SqliteSettingStore {
    /// Creates or opens a settings database.
    ///
    /// `encryption_key` is a base64-encoded 32-byte key; `None` stores
    /// values in plaintext.
    pub fn new<P: AsRef<Path>>(db_path: P, encryption_key: Option<&str>) -> Result<Self> {
        let cipher = encryption_key
            .map(SettingCipher::from_base64_key)
            .transpose()
            .context("Invalid encryption key")?;

        let conn = Connection::open(db_path).context("Failed to open settings database")?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                nonce TEXT,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )
        .context("Failed to create settings table")?;

        Ok(Self {
            conn: Mutex::new(conn),
            cipher,
        })
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    /// Turns a stored `(value, nonce)` row into plaintext.
    fn decode(&self, key: &str, row: Option<(String, Option<String>)>) -> Result<Option<String>> {
        match (row, &self.cipher) {
            (None, _) => Ok(None),
            (Some((value, None)), _) => Ok(Some(value)),
            (Some((value, Some(nonce))), Some(cipher)) => cipher
                .decrypt(&value, &nonce)
                .map(Some)
                .with_context(|| format!("Failed to decrypt setting {}", key)),
            (Some((_, Some(_))), None) => Err(anyhow!(
                "Setting {} is encrypted but no encryption key is configured",
                key
            )),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Settings database lock poisoned"))
    }
}

impl SettingStore for SqliteSettingStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String, Option<String>)> = self
            .conn()?
            .query_row(
                "SELECT value, nonce FROM settings WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("Failed to read setting")?;

        self.decode(key, row)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let (value, nonce) = match &self.cipher {
            Some(cipher) => {
                let (ciphertext, nonce) = cipher
                    .encrypt(value)
                    .with_context(|| format!("Failed to encrypt setting {}", key))?;
                (ciphertext, Some(nonce))
            }
            None => (value.to_string(), None),
        };

        self.conn()?
            .execute(
                r#"
                INSERT INTO settings (key, value, nonce, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    nonce = excluded.nonce,
                    updated_at = excluded.updated_at
                "#,
                params![key, value, nonce, Utc::now().to_rfc3339()],
            )
            .context("Failed to store setting")?;

        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM settings WHERE key = ?1", params![key])
            .context("Failed to delete setting")?;
        Ok(())
    }

    fn take(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String, Option<String>)> = self
            .conn()?
            .query_row(
                "DELETE FROM settings WHERE key = ?1 RETURNING value, nonce",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("Failed to take setting")?;

        self.decode(key, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

    fn test_key() -> String {
        BASE64.encode([0u8; 32])
    }

    #[test]
    fn test_plaintext_store() {
        let store = SqliteSettingStore::new(":memory:", None).unwrap();
        assert!(!store.is_encrypted());

        store.set("github_api_client_id", "abc").unwrap();
        assert_eq!(
            store.get("github_api_client_id").unwrap().as_deref(),
            Some("abc")
        );

        store.set("github_api_client_id", "def").unwrap();
        assert_eq!(
            store.get("github_api_client_id").unwrap().as_deref(),
            Some("def")
        );

        store.delete("github_api_client_id").unwrap();
        assert!(store.get("github_api_client_id").unwrap().is_none());
    }

    #[test]
    fn test_take_removes_row() {
        let store = SqliteSettingStore::new(":memory:", Some(&test_key())).unwrap();
        store.set("github_api_error_message", "Failed to verify state").unwrap();

        assert_eq!(
            store.take("github_api_error_message").unwrap().as_deref(),
            Some("Failed to verify state")
        );
        assert!(store.take("github_api_error_message").unwrap().is_none());
        assert!(store.get("github_api_error_message").unwrap().is_none());
    }

    #[test]
    fn test_values_encrypted_at_rest() {
        let store = SqliteSettingStore::new(":memory:", Some(&test_key())).unwrap();
        store.set("github_api_access_token", "gho_abc123").unwrap();

        let raw: String = store
            .conn()
            .unwrap()
            .query_row(
                "SELECT value FROM settings WHERE key = 'github_api_access_token'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_ne!(raw, "gho_abc123");

        assert_eq!(
            store.get("github_api_access_token").unwrap().as_deref(),
            Some("gho_abc123")
        );
    }

    #[test]
    fn test_reopen_with_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.db");

        {
            let store = SqliteSettingStore::new(&path, Some(&test_key())).unwrap();
            store.set("github_api_client_secret", "s3cr3t").unwrap();
        }

        let store = SqliteSettingStore::new(&path, Some(&test_key())).unwrap();
        assert_eq!(
            store.get("github_api_client_secret").unwrap().as_deref(),
            Some("s3cr3t")
        );

        // Opening without the key cannot read encrypted rows
        let plain = SqliteSettingStore::new(&path, None).unwrap();
        assert!(plain.get("github_api_client_secret").is_err());
    }

    #[test]
    fn test_invalid_encryption_key() {
        assert!(SqliteSettingStore::new(":memory:", Some("short")).is_err());
        assert!(SqliteSettingStore::new(":memory:", Some("not-valid-base64!@#$")).is_err());
    }
}
