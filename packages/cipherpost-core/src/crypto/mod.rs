//! # Cryptography Module
//!
//! All cryptographic primitives used by Cipherpost Core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  plaintext ──► RSA-OAEP-SHA256(encryption public) ──► ciphertext      │
//! │                                                          │              │
//! │                                                          ▼              │
//! │            PKCS#1 v1.5 / SHA-256(signing private) ──► signature       │
//! │                                                                         │
//! │  { ciphertext, signature }  travels as one EncryptedMessage           │
//! │                                                                         │
//! │  decode: verify(signing public) FIRST, then decrypt(encryption        │
//! │          private). A failed verify never reaches decryption.          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose | Notes |
//! |-----------|---------|-------|
//! | RSA-OAEP (SHA-256) | Payload encryption | Capacity bounded by key size |
//! | RSASSA-PKCS1-v1_5 (SHA-256) | Detached signature | Deterministic |
//! | AES-256-GCM | Key material at rest | See `storage` |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: private keys and their DER forms are wiped on drop
//! 2. **Secure Random**: `rand::rngs::OsRng` for key generation and OAEP seeds
//! 3. **No Key Reuse**: two fresh key pairs per encoded message

mod encryption;
mod engine;
mod keys;
mod signing;

pub use encryption::{decrypt, encrypt, max_plaintext_len, OAEP_DIGEST_SIZE};
pub use engine::{CryptoEngine, RsaCryptoEngine};
pub use keys::{
    KeyMaterial, KeyPair, KeyPairGenerator, KeyStrength, PrivateKey, PublicKey,
    RsaKeyPairGenerator,
};
pub use signing::{sign, verify};

/// Shared 2048-bit key pairs, generated once per test binary
#[cfg(test)]
pub(crate) mod test_keys {
    use std::sync::OnceLock;

    use super::{KeyPair, KeyPairGenerator, KeyStrength, RsaKeyPairGenerator};

    static ENCRYPTION: OnceLock<KeyPair> = OnceLock::new();
    static SIGNING: OnceLock<KeyPair> = OnceLock::new();

    fn generate() -> KeyPair {
        RsaKeyPairGenerator::new()
            .generate(KeyStrength::Bits2048)
            .expect("test key generation")
    }

    pub(crate) fn encryption() -> &'static KeyPair {
        ENCRYPTION.get_or_init(generate)
    }

    pub(crate) fn signing() -> &'static KeyPair {
        SIGNING.get_or_init(generate)
    }
}
