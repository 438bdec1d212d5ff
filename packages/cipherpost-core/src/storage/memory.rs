//! In-memory key store (tests and ephemeral sessions)

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{not_found, KeyRole, KeyStore, StoredKeyEntry};
use crate::crypto::KeyMaterial;
use crate::error::Result;

/// Key store that lives only as long as the process
///
/// Does not survive restarts; use [`super::SqliteKeyStore`] for that.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    entries: RwLock<HashMap<String, StoredKeyEntry>>,
}

impl MemoryKeyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn store(&self, material: &KeyMaterial, role: KeyRole, identifier: &str) -> Result<()> {
        let entry = StoredKeyEntry {
            identifier: identifier.to_string(),
            role,
            material: material.clone(),
        };
        self.entries.write().insert(identifier.to_string(), entry);
        Ok(())
    }

    async fn retrieve(&self, role: KeyRole, identifier: &str) -> Result<KeyMaterial> {
        let entries = self.entries.read();
        match entries.get(identifier) {
            Some(entry) if entry.role == role => Ok(entry.material.clone()),
            _ => Err(not_found(role, identifier)),
        }
    }

    async fn delete(&self, role: KeyRole, identifier: &str) -> Result<bool> {
        let mut entries = self.entries.write();
        let matches = entries.get(identifier).is_some_and(|entry| entry.role == role);
        if matches {
            entries.remove(identifier);
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn material(byte: u8) -> KeyMaterial {
        KeyMaterial::from_bytes(vec![byte; 16])
    }

    #[tokio::test]
    async fn test_store_retrieve_delete() {
        let store = MemoryKeyStore::new();

        store.store(&material(1), KeyRole::SigningPublic, "id").await.unwrap();
        assert_eq!(store.retrieve(KeyRole::SigningPublic, "id").await.unwrap(), material(1));

        assert!(store.delete(KeyRole::SigningPublic, "id").await.unwrap());
        assert!(!store.delete(KeyRole::SigningPublic, "id").await.unwrap());
        assert!(matches!(
            store.retrieve(KeyRole::SigningPublic, "id").await,
            Err(Error::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_store_replaces_not_duplicates() {
        let store = MemoryKeyStore::new();

        store.store(&material(1), KeyRole::EncryptionPrivate, "id").await.unwrap();
        store.store(&material(2), KeyRole::EncryptionPrivate, "id").await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.retrieve(KeyRole::EncryptionPrivate, "id").await.unwrap(), material(2));
    }

    #[tokio::test]
    async fn test_role_mismatch_is_not_found() {
        let store = MemoryKeyStore::new();
        store.store(&material(1), KeyRole::SigningPublic, "id").await.unwrap();

        assert!(matches!(
            store.retrieve(KeyRole::EncryptionPrivate, "id").await,
            Err(Error::KeyNotFound(_))
        ));
        assert!(!store.contains(KeyRole::EncryptionPrivate, "id").await.unwrap());
        assert!(store.contains(KeyRole::SigningPublic, "id").await.unwrap());
        assert!(!store.delete(KeyRole::EncryptionPrivate, "id").await.unwrap());
    }
}
