//! iOS / macOS Keychain key store.
//!
//! Items are generic passwords under one service name. The first byte of
//! each item records the role; the rest is the DER key material.

use async_trait::async_trait;
use security_framework::passwords::{
    delete_generic_password, get_generic_password, set_generic_password,
};

use super::{not_found, KeyRole, KeyStore};
use crate::crypto::KeyMaterial;
use crate::error::{Error, Result};

/// Keychain service all Cipherpost items live under
pub const SERVICE_NAME: &str = "com.cipherpost.keychain";

/// errSecItemNotFound
const ERR_SEC_ITEM_NOT_FOUND: i32 = -25300;

fn role_tag(role: KeyRole) -> u8 {
    match role {
        KeyRole::EncryptionPrivate => 1,
        KeyRole::SigningPublic => 2,
    }
}

/// Key store backed by the platform keychain
#[derive(Debug, Clone)]
pub struct KeychainKeyStore {
    service: String,
}

impl KeychainKeyStore {
    /// Use the default service name
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a custom service name (separate apps, tests)
    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn read(&self, identifier: &str) -> Result<Option<Vec<u8>>> {
        match get_generic_password(&self.service, identifier) {
            Ok(data) => Ok(Some(data.to_vec())),
            Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => Ok(None),
            Err(e) => Err(Error::StorageError {
                code: e.code(),
                message: format!("Keychain read failed: {}", e),
            }),
        }
    }
}

impl Default for KeychainKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyStore for KeychainKeyStore {
    async fn store(&self, material: &KeyMaterial, role: KeyRole, identifier: &str) -> Result<()> {
        // Delete first so the item is replaced rather than duplicated
        match delete_generic_password(&self.service, identifier) {
            Ok(()) => {}
            Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => {}
            Err(e) => {
                return Err(Error::StorageError {
                    code: e.code(),
                    message: format!("Keychain delete failed: {}", e),
                })
            }
        }

        let mut value = zeroize::Zeroizing::new(Vec::with_capacity(material.len() + 1));
        value.push(role_tag(role));
        value.extend_from_slice(material.as_bytes());

        set_generic_password(&self.service, identifier, &value).map_err(|e| Error::StorageError {
            code: e.code(),
            message: format!("Keychain write failed: {}", e),
        })
    }

    async fn retrieve(&self, role: KeyRole, identifier: &str) -> Result<KeyMaterial> {
        match self.read(identifier)? {
            Some(data) if data.first() == Some(&role_tag(role)) => {
                Ok(KeyMaterial::from_bytes(data[1..].to_vec()))
            }
            _ => Err(not_found(role, identifier)),
        }
    }

    async fn delete(&self, role: KeyRole, identifier: &str) -> Result<bool> {
        match self.read(identifier)? {
            Some(data) if data.first() == Some(&role_tag(role)) => {
                delete_generic_password(&self.service, identifier).map_err(|e| {
                    Error::StorageError {
                        code: e.code(),
                        message: format!("Keychain delete failed: {}", e),
                    }
                })?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
