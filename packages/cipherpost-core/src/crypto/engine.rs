//! The [`CryptoEngine`] seam used by the message pipeline.

use super::keys::{PrivateKey, PublicKey};
use super::{encryption, signing};
use crate::error::Result;

/// Encrypts, decrypts, signs and verifies message payloads
///
/// Every operation is pure given its key input.
pub trait CryptoEngine: Send + Sync {
    /// Encrypt `plaintext` under an encryption public key
    fn encrypt(&self, plaintext: &[u8], public_key: &PublicKey) -> Result<Vec<u8>>;

    /// Decrypt `ciphertext` with an encryption private key
    fn decrypt(&self, ciphertext: &[u8], private_key: &PrivateKey) -> Result<String>;

    /// Produce a detached signature over `ciphertext`
    fn sign(&self, ciphertext: &[u8], private_key: &PrivateKey) -> Result<Vec<u8>>;

    /// Check a detached signature; a mismatch is `Ok(false)`
    fn verify(&self, signature: &[u8], ciphertext: &[u8], public_key: &PublicKey) -> Result<bool>;

    /// Largest plaintext `encrypt` accepts for this key
    fn max_plaintext_len(&self, public_key: &PublicKey) -> usize;
}

/// RSA-OAEP-SHA256 encryption with PKCS#1 v1.5 / SHA-256 signatures
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaCryptoEngine;

impl RsaCryptoEngine {
    /// Create a new engine
    pub fn new() -> Self {
        Self
    }
}

impl CryptoEngine for RsaCryptoEngine {
    fn encrypt(&self, plaintext: &[u8], public_key: &PublicKey) -> Result<Vec<u8>> {
        encryption::encrypt(public_key, plaintext)
    }

    fn decrypt(&self, ciphertext: &[u8], private_key: &PrivateKey) -> Result<String> {
        encryption::decrypt(private_key, ciphertext)
    }

    fn sign(&self, ciphertext: &[u8], private_key: &PrivateKey) -> Result<Vec<u8>> {
        signing::sign(private_key, ciphertext)
    }

    fn verify(&self, signature: &[u8], ciphertext: &[u8], public_key: &PublicKey) -> Result<bool> {
        signing::verify(public_key, ciphertext, signature)
    }

    fn max_plaintext_len(&self, public_key: &PublicKey) -> usize {
        encryption::max_plaintext_len(public_key.size())
    }
}
