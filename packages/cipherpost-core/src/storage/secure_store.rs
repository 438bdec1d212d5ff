//! # Secure Storage
//!
//! SQLite-backed key store that survives process restarts.
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    KEY STORAGE SECURITY                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  What We Store:                                                        │
//! │  ───────────────                                                        │
//! │                                                                         │
//! │  1. Encryption private key (PKCS#8 DER)                                │
//! │  2. Signing public key (SPKI DER)                                      │
//! │                                                                         │
//! │  Both are sealed with AES-256-GCM under the storage key, with          │
//! │  "identifier/role" as associated data.                                 │
//! │                                                                         │
//! │  Security Properties:                                                  │
//! │  ────────────────────                                                   │
//! │                                                                         │
//! │  • Data encrypted at rest                                              │
//! │  • A row moved to another identifier or role fails to open            │
//! │  • Replacement is delete-then-insert inside one transaction           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The storage key itself belongs in platform secure storage; on Apple
//! targets [`super::KeychainKeyStore`] can be used directly instead.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::seal::SealingKey;
use super::{not_found, schema, KeyRole, KeyStore};
use crate::crypto::KeyMaterial;
use crate::error::{Error, Result};

/// Durable key store backed by a SQLite database
pub struct SqliteKeyStore {
    /// The underlying SQLite connection
    conn: Arc<Mutex<Connection>>,
    /// At-rest sealing key
    sealing_key: SealingKey,
}

impl SqliteKeyStore {
    /// Open or create a key store
    ///
    /// If path is None, creates an in-memory database (useful for testing).
    pub fn open(path: Option<&str>, storage_key: [u8; 32]) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)?,
            None => Connection::open_in_memory()?,
        };

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            sealing_key: SealingKey::from_bytes(storage_key),
        };

        store.init_schema()?;

        tracing::debug!(path = path.unwrap_or(":memory:"), "Key store opened");
        Ok(store)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .ok();

        match version {
            None => {
                conn.execute_batch(schema::CREATE_TABLES)?;
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    params![schema::SCHEMA_VERSION],
                )?;

                tracing::info!("Key store schema created (version {})", schema::SCHEMA_VERSION);
            }
            Some(v) if v > schema::SCHEMA_VERSION => {
                return Err(Error::StorageCorrupted(format!(
                    "Key store schema version {} is newer than supported version {}",
                    v,
                    schema::SCHEMA_VERSION
                )));
            }
            Some(v) => {
                tracing::debug!("Key store schema version: {}", v);
            }
        }

        Ok(())
    }

    fn associated_data(role: KeyRole, identifier: &str) -> Vec<u8> {
        format!("{}/{}", identifier, role.as_str()).into_bytes()
    }

    fn store_entry(&self, material: &KeyMaterial, role: KeyRole, identifier: &str) -> Result<()> {
        let sealed = self
            .sealing_key
            .seal(material.as_bytes(), &Self::associated_data(role, identifier))?;
        let created_at = chrono::Utc::now().timestamp_millis();

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM key_entries WHERE identifier = ?1", params![identifier])?;
        tx.execute(
            "INSERT INTO key_entries (identifier, role, material, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![identifier, role.as_str(), sealed, created_at],
        )?;
        tx.commit()?;

        Ok(())
    }

    fn retrieve_entry(&self, role: KeyRole, identifier: &str) -> Result<KeyMaterial> {
        let row: Option<(String, Vec<u8>)> = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT role, material FROM key_entries WHERE identifier = ?1",
                params![identifier],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
        };

        let blob = match row {
            Some((stored_role, blob)) if stored_role == role.as_str() => blob,
            _ => return Err(not_found(role, identifier)),
        };

        let opened = self
            .sealing_key
            .open(&blob, &Self::associated_data(role, identifier))?;
        Ok(KeyMaterial::from_bytes(opened.to_vec()))
    }

    fn delete_entry(&self, role: KeyRole, identifier: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM key_entries WHERE identifier = ?1 AND role = ?2",
            params![identifier, role.as_str()],
        )?;
        Ok(removed > 0)
    }
}

#[async_trait]
impl KeyStore for SqliteKeyStore {
    async fn store(&self, material: &KeyMaterial, role: KeyRole, identifier: &str) -> Result<()> {
        self.store_entry(material, role, identifier)
    }

    async fn retrieve(&self, role: KeyRole, identifier: &str) -> Result<KeyMaterial> {
        self.retrieve_entry(role, identifier)
    }

    async fn delete(&self, role: KeyRole, identifier: &str) -> Result<bool> {
        self.delete_entry(role, identifier)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const STORAGE_KEY: [u8; 32] = [42u8; 32];

    fn material(byte: u8) -> KeyMaterial {
        KeyMaterial::from_bytes(vec![byte; 64])
    }

    fn row_count(store: &SqliteKeyStore) -> i64 {
        store
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM key_entries", [], |row| row.get(0))
            .unwrap()
    }

    #[tokio::test]
    async fn test_store_retrieve() {
        let store = SqliteKeyStore::open(None, STORAGE_KEY).unwrap();

        store.store(&material(1), KeyRole::EncryptionPrivate, "id").await.unwrap();
        let value = store.retrieve(KeyRole::EncryptionPrivate, "id").await.unwrap();
        assert_eq!(value, material(1));

        assert!(store.delete(KeyRole::EncryptionPrivate, "id").await.unwrap());
        assert!(matches!(
            store.retrieve(KeyRole::EncryptionPrivate, "id").await,
            Err(Error::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_store_is_idempotent_per_identifier() {
        let store = SqliteKeyStore::open(None, STORAGE_KEY).unwrap();

        store.store(&material(1), KeyRole::SigningPublic, "id").await.unwrap();
        store.store(&material(2), KeyRole::SigningPublic, "id").await.unwrap();

        assert_eq!(row_count(&store), 1);
        assert_eq!(store.retrieve(KeyRole::SigningPublic, "id").await.unwrap(), material(2));
    }

    #[tokio::test]
    async fn test_material_is_sealed_at_rest() {
        let store = SqliteKeyStore::open(None, STORAGE_KEY).unwrap();
        store.store(&material(7), KeyRole::SigningPublic, "id").await.unwrap();

        let raw: Vec<u8> = store
            .conn
            .lock()
            .query_row("SELECT material FROM key_entries", [], |row| row.get(0))
            .unwrap();
        assert!(!raw.windows(64).any(|w| w == material(7).as_bytes()));
    }

    #[tokio::test]
    async fn test_role_mismatch_is_not_found() {
        let store = SqliteKeyStore::open(None, STORAGE_KEY).unwrap();
        store.store(&material(1), KeyRole::SigningPublic, "id").await.unwrap();

        assert!(matches!(
            store.retrieve(KeyRole::EncryptionPrivate, "id").await,
            Err(Error::KeyNotFound(_))
        ));
        assert!(!store.delete(KeyRole::EncryptionPrivate, "id").await.unwrap());
        assert!(store.contains(KeyRole::SigningPublic, "id").await.unwrap());
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteKeyStore::open(Some(path), STORAGE_KEY).unwrap();
            store.store(&material(3), KeyRole::EncryptionPrivate, "id").await.unwrap();
        }

        let reopened = SqliteKeyStore::open(Some(path), STORAGE_KEY).unwrap();
        assert_eq!(
            reopened.retrieve(KeyRole::EncryptionPrivate, "id").await.unwrap(),
            material(3)
        );
    }

    #[tokio::test]
    async fn test_wrong_storage_key_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteKeyStore::open(Some(path), STORAGE_KEY).unwrap();
            store.store(&material(3), KeyRole::EncryptionPrivate, "id").await.unwrap();
        }

        let reopened = SqliteKeyStore::open(Some(path), [1u8; 32]).unwrap();
        assert!(matches!(
            reopened.retrieve(KeyRole::EncryptionPrivate, "id").await,
            Err(Error::StorageCorrupted(_))
        ));
    }

    #[tokio::test]
    async fn test_unopenable_path_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("keys.db");

        let err = SqliteKeyStore::open(path.to_str(), STORAGE_KEY).err().unwrap();
        assert!(matches!(err, Error::StorageError { .. }));
        assert_eq!(err.code(), 300);
    }
}
