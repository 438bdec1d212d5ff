//! # Key Management
//!
//! Ephemeral RSA key pair generation and the DER forms used to move key
//! material across the key store boundary.
//!
//! ## Key Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      PER-MESSAGE KEY LIFECYCLE                          │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  encode run                                                            │
//! │  ──────────                                                             │
//! │    generate() ──► encryption pair ──┬── public  ──► encrypt (memory)   │
//! │                                     └── private ──► KeyStore (PKCS#8)  │
//! │                                                                         │
//! │    generate() ──► signing pair ─────┬── private ──► sign (memory)      │
//! │                                     └── public  ──► KeyStore (SPKI)    │
//! │                                                                         │
//! │  decode run                                                            │
//! │  ──────────                                                             │
//! │    KeyStore ──► encryption private + signing public                   │
//! │                                                                         │
//! │  The two halves are never stored together and never reassembled.     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Allowed RSA modulus sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum KeyStrength {
    /// 2048-bit modulus (256-byte ciphertexts and signatures)
    #[default]
    Bits2048,
    /// 3072-bit modulus
    Bits3072,
    /// 4096-bit modulus
    Bits4096,
}

impl KeyStrength {
    /// Modulus size in bits
    pub fn bits(self) -> usize {
        match self {
            KeyStrength::Bits2048 => 2048,
            KeyStrength::Bits3072 => 3072,
            KeyStrength::Bits4096 => 4096,
        }
    }

    /// Modulus size in bytes (also the ciphertext and signature length)
    pub fn bytes(self) -> usize {
        self.bits() / 8
    }

    /// Map a bit length onto an allowed strength
    pub fn from_bits(bits: usize) -> Result<Self> {
        match bits {
            2048 => Ok(KeyStrength::Bits2048),
            3072 => Ok(KeyStrength::Bits3072),
            4096 => Ok(KeyStrength::Bits4096),
            other => Err(Error::KeyGenerationFailed(format!(
                "unsupported RSA key size {} (allowed: 2048, 3072, 4096)",
                other
            ))),
        }
    }
}

impl TryFrom<usize> for KeyStrength {
    type Error = Error;

    fn try_from(bits: usize) -> Result<Self> {
        Self::from_bits(bits)
    }
}

impl From<KeyStrength> for usize {
    fn from(strength: KeyStrength) -> usize {
        strength.bits()
    }
}

impl fmt::Display for KeyStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RSA-{}", self.bits())
    }
}

/// Serialized key material as it crosses the key store boundary
///
/// Private keys are PKCS#8 DER, public keys SubjectPublicKeyInfo DER.
/// The buffer is wiped when dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial(Zeroizing<Vec<u8>>);

impl KeyMaterial {
    /// Wrap raw DER bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Borrow the DER bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial({} bytes)", self.0.len())
    }
}

/// RSA public key handle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    /// Modulus size in bytes
    pub fn size(&self) -> usize {
        self.0.size()
    }

    /// Encode as SubjectPublicKeyInfo DER
    pub fn to_der(&self) -> Result<KeyMaterial> {
        let doc = self
            .0
            .to_public_key_der()
            .map_err(|e| Error::KeyGenerationFailed(format!("Public key encoding failed: {}", e)))?;
        Ok(KeyMaterial::from_bytes(doc.as_bytes().to_vec()))
    }

    /// Decode from SubjectPublicKeyInfo DER
    pub fn from_der(material: &KeyMaterial) -> Result<Self> {
        RsaPublicKey::from_public_key_der(material.as_bytes())
            .map(Self)
            .map_err(|e| Error::StorageCorrupted(format!("Invalid public key DER: {}", e)))
    }

    /// Short SHA-256 fingerprint of the DER encoding, safe to log
    pub fn fingerprint(&self) -> String {
        match self.0.to_public_key_der() {
            Ok(doc) => hex::encode(&Sha256::digest(doc.as_bytes())[..8]),
            Err(_) => "unencodable".to_string(),
        }
    }

    pub(crate) fn as_rsa(&self) -> &RsaPublicKey {
        &self.0
    }
}

/// RSA private key handle
///
/// The inner key zeroizes itself on drop.
#[derive(Clone)]
pub struct PrivateKey(RsaPrivateKey);

impl PrivateKey {
    /// Modulus size in bytes
    pub fn size(&self) -> usize {
        self.0.size()
    }

    /// Encode as PKCS#8 DER
    ///
    /// ## Security Warning
    ///
    /// Only use this for secure storage. Never log or transmit these bytes.
    pub fn to_der(&self) -> Result<KeyMaterial> {
        let doc = self
            .0
            .to_pkcs8_der()
            .map_err(|e| Error::KeyGenerationFailed(format!("Private key encoding failed: {}", e)))?;
        Ok(KeyMaterial::from_bytes(doc.as_bytes().to_vec()))
    }

    /// Decode from PKCS#8 DER
    pub fn from_der(material: &KeyMaterial) -> Result<Self> {
        RsaPrivateKey::from_pkcs8_der(material.as_bytes())
            .map(Self)
            .map_err(|e| Error::StorageCorrupted(format!("Invalid private key DER: {}", e)))
    }

    /// Derive the matching public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.to_public_key())
    }

    pub(crate) fn as_rsa(&self) -> &RsaPrivateKey {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(RSA-{}, redacted)", self.0.size() * 8)
    }
}

/// An ephemeral key pair, generated once per message and never reused
///
/// Not serializable: the halves are persisted separately through
/// [`PublicKey::to_der`] and [`PrivateKey::to_der`].
#[derive(Clone, Debug)]
pub struct KeyPair {
    public: PublicKey,
    private: PrivateKey,
}

impl KeyPair {
    /// Public half
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Private half
    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    /// Split into the two halves
    pub fn into_parts(self) -> (PublicKey, PrivateKey) {
        (self.public, self.private)
    }
}

/// Produces fresh key pairs
///
/// Implementations must be safe to call twice in a row for the same run
/// with no correlation between the resulting pairs.
pub trait KeyPairGenerator: Send + Sync {
    /// Generate a new key pair of the given strength
    fn generate(&self, strength: KeyStrength) -> Result<KeyPair>;
}

/// Key pair generator backed by the operating system RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaKeyPairGenerator;

impl RsaKeyPairGenerator {
    /// Create a new generator
    pub fn new() -> Self {
        Self
    }
}

impl KeyPairGenerator for RsaKeyPairGenerator {
    fn generate(&self, strength: KeyStrength) -> Result<KeyPair> {
        let private = RsaPrivateKey::new(&mut OsRng, strength.bits())
            .map_err(|e| Error::KeyGenerationFailed(format!("{} generation failed: {}", strength, e)))?;
        let public = private.to_public_key();

        Ok(KeyPair {
            public: PublicKey(public),
            private: PrivateKey(private),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_keys;

    #[test]
    fn test_strength_from_bits() {
        assert_eq!(KeyStrength::from_bits(2048).unwrap(), KeyStrength::Bits2048);
        assert_eq!(KeyStrength::from_bits(4096).unwrap().bytes(), 512);

        let err = KeyStrength::from_bits(1024).unwrap_err();
        assert_eq!(err.code(), 200);
    }

    #[test]
    fn test_strength_serde_as_bits() {
        let json = serde_json::to_string(&KeyStrength::Bits3072).unwrap();
        assert_eq!(json, "3072");

        let restored: KeyStrength = serde_json::from_str("4096").unwrap();
        assert_eq!(restored, KeyStrength::Bits4096);

        assert!(serde_json::from_str::<KeyStrength>("512").is_err());
    }

    #[test]
    fn test_generated_pair_has_requested_size() {
        let pair = test_keys::encryption();
        assert_eq!(pair.public_key().size(), 256);
        assert_eq!(pair.private_key().size(), 256);
        assert_eq!(pair.private_key().public_key(), *pair.public_key());
    }

    #[test]
    fn test_pairs_are_uncorrelated() {
        let a = test_keys::encryption();
        let b = test_keys::signing();
        assert_ne!(a.public_key(), b.public_key());
        assert_ne!(a.public_key().fingerprint(), b.public_key().fingerprint());
    }

    #[test]
    fn test_der_round_trip() {
        let pair = test_keys::encryption();

        let private_der = pair.private_key().to_der().unwrap();
        let restored = PrivateKey::from_der(&private_der).unwrap();
        assert_eq!(restored.public_key(), *pair.public_key());

        let public_der = pair.public_key().to_der().unwrap();
        assert_eq!(PublicKey::from_der(&public_der).unwrap(), *pair.public_key());
    }

    #[test]
    fn test_garbage_der_is_corruption() {
        let garbage = KeyMaterial::from_bytes(vec![0x30, 0x03, 0x01, 0x02]);
        assert!(matches!(PrivateKey::from_der(&garbage), Err(Error::StorageCorrupted(_))));
        assert!(matches!(PublicKey::from_der(&garbage), Err(Error::StorageCorrupted(_))));
    }

    #[test]
    fn test_debug_redacts_private_material() {
        let pair = test_keys::signing();
        let rendered = format!("{:?}", pair.private_key());
        assert_eq!(rendered, "PrivateKey(RSA-2048, redacted)");

        let material = pair.private_key().to_der().unwrap();
        assert!(format!("{:?}", material).ends_with("bytes)"));
    }
}
