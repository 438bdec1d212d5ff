//! # Storage Module
//!
//! Durable storage for per-message key material.
//!
//! ## Storage Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         KEY STORAGE                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  KeyStore Trait                                                 │   │
//! │  │  ──────────────                                                  │   │
//! │  │                                                                 │   │
//! │  │  • store(material, role, id)  - delete-then-insert              │   │
//! │  │  • retrieve(role, id)         - KeyNotFound when absent         │   │
//! │  │  • delete(role, id)           - remove an entry                 │   │
//! │  │  • contains(role, id)         - existence check                 │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌───────────────┐  ┌───────────────────────┐  ┌───────────────┐      │
//! │  │  Memory       │  │  SQLite               │  │  Keychain     │      │
//! │  │               │  │                       │  │  (iOS/macOS)  │      │
//! │  │ - Tests       │  │ - Survives restarts   │  │ - OS-managed  │      │
//! │  │ - No restart  │  │ - AES-256-GCM at rest │  │   protection  │      │
//! │  │   survival    │  │ - One row per id      │  │               │      │
//! │  └───────────────┘  └───────────────────────┘  └───────────────┘      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What We Store
//!
//! Exactly what a later decode needs, under fixed identifiers:
//!
//! | Role | Identifier | Format |
//! |------|------------|--------|
//! | `EncryptionPrivate` | `cipherpost.keys.encryption.private` | PKCS#8 DER |
//! | `SigningPublic` | `cipherpost.keys.signing.public` | SPKI DER |
//!
//! Identifiers are not per-message, so only one message's keys can be
//! outstanding at a time; a new encode replaces both entries.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::crypto::KeyMaterial;
use crate::error::{Error, Result};

mod memory;
mod schema;
mod seal;
mod secure_store;

#[cfg(any(target_os = "ios", target_os = "macos"))]
mod keychain;

pub use memory::MemoryKeyStore;
pub use seal::generate_storage_key;
pub use secure_store::SqliteKeyStore;

#[cfg(any(target_os = "ios", target_os = "macos"))]
pub use keychain::KeychainKeyStore;

/// Key names for secure storage
pub mod keys {
    /// Private half of the per-message encryption pair
    pub const ENCRYPTION_PRIVATE: &str = "cipherpost.keys.encryption.private";

    /// Public half of the per-message signing pair
    pub const SIGNING_PUBLIC: &str = "cipherpost.keys.signing.public";
}

/// The roles under which key material is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyRole {
    /// Decrypts the message on the decode side
    EncryptionPrivate,
    /// Verifies the message signature on the decode side
    SigningPublic,
}

impl KeyRole {
    /// Stable name used in storage rows
    pub fn as_str(self) -> &'static str {
        match self {
            KeyRole::EncryptionPrivate => "encryption_private",
            KeyRole::SigningPublic => "signing_public",
        }
    }

    /// The fixed identifier the pipeline uses for this role
    pub fn default_identifier(self) -> &'static str {
        match self {
            KeyRole::EncryptionPrivate => keys::ENCRYPTION_PRIVATE,
            KeyRole::SigningPublic => keys::SIGNING_PUBLIC,
        }
    }
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "encryption_private" => Ok(KeyRole::EncryptionPrivate),
            "signing_public" => Ok(KeyRole::SigningPublic),
            other => Err(Error::StorageCorrupted(format!("Unknown key role: {}", other))),
        }
    }
}

/// One persisted entry: identifier → material, role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredKeyEntry {
    /// Logical identifier (fixed string)
    pub identifier: String,
    /// Role the material was stored under
    pub role: KeyRole,
    /// DER-encoded key
    pub material: KeyMaterial,
}

/// Persists and retrieves key material under logical identifiers
///
/// Implementations hold at most one entry per identifier; storing under an
/// existing identifier replaces the previous entry.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Store `material` for `role` under `identifier`, replacing any entry
    async fn store(&self, material: &KeyMaterial, role: KeyRole, identifier: &str) -> Result<()>;

    /// Retrieve the material stored for `role` under `identifier`
    ///
    /// An entry stored under a different role counts as absent.
    async fn retrieve(&self, role: KeyRole, identifier: &str) -> Result<KeyMaterial>;

    /// Delete the entry for `role` under `identifier`
    ///
    /// Returns whether anything was removed.
    async fn delete(&self, role: KeyRole, identifier: &str) -> Result<bool>;

    /// Check whether an entry exists for `role` under `identifier`
    async fn contains(&self, role: KeyRole, identifier: &str) -> Result<bool> {
        match self.retrieve(role, identifier).await {
            Ok(_) => Ok(true),
            Err(Error::KeyNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

pub(crate) fn not_found(role: KeyRole, identifier: &str) -> Error {
    Error::KeyNotFound(format!("{} ({})", identifier, role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names_round_trip() {
        for role in [KeyRole::EncryptionPrivate, KeyRole::SigningPublic] {
            assert_eq!(role.as_str().parse::<KeyRole>().unwrap(), role);
        }
        assert!("signing_private".parse::<KeyRole>().is_err());
    }

    #[test]
    fn test_default_identifiers_are_distinct() {
        assert_ne!(
            KeyRole::EncryptionPrivate.default_identifier(),
            KeyRole::SigningPublic.default_identifier()
        );
    }
}
