//! AES-256-GCM sealing for key material at rest.
//!
//! ```text
//! [ nonce (12 bytes) ][ ciphertext + GCM tag ]
//! ```
//!
//! The associated data binds a blob to the identifier and role it was stored
//! under, so a row copied to another identifier fails to open.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce as AesNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{ZeroizeOnDrop, Zeroizing};

use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub(crate) const NONCE_SIZE: usize = 12;

/// Size of the sealing key in bytes (256 bits)
pub(crate) const KEY_SIZE: usize = 32;

/// Generate a random 256-bit storage key from the OS RNG
pub fn generate_storage_key() -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    OsRng.fill_bytes(&mut key);
    key
}

/// The at-rest sealing key
///
/// Zeroized when dropped.
#[derive(ZeroizeOnDrop)]
pub(crate) struct SealingKey([u8; KEY_SIZE]);

impl SealingKey {
    pub(crate) fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.0).map_err(|e| Error::StorageError {
            code: -1,
            message: format!("Invalid storage key: {}", e),
        })
    }

    /// Seal `plaintext`, returning `nonce || ciphertext_with_tag`
    pub(crate) fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher()?
            .encrypt(AesNonce::from_slice(&nonce), Payload { msg: plaintext, aad })
            .map_err(|e| Error::StorageError {
                code: -1,
                message: format!("Sealing failed: {}", e),
            })?;

        let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Open a blob produced by [`SealingKey::seal`]
    pub(crate) fn open(&self, blob: &[u8], aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if blob.len() < NONCE_SIZE {
            return Err(Error::StorageCorrupted("Stored data too short".into()));
        }

        let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher()?
            .decrypt(AesNonce::from_slice(nonce), Payload { msg: ciphertext, aad })
            .map_err(|_| Error::StorageCorrupted("Stored key material failed to open".into()))?;

        Ok(Zeroizing::new(plaintext))
    }
}
