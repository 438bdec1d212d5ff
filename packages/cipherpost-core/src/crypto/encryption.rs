//! # Encryption Module
//!
//! RSA-OAEP (SHA-256, MGF1-SHA-256, empty label) for the message payload.
//!
//! ## Capacity
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   PADDING-ADJUSTED CAPACITY                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  max_plaintext = key_bytes - 2 * digest_bytes - 2                      │
//! │                                                                         │
//! │  │ Key      │ key_bytes │ max_plaintext │                               │
//! │  │──────────│───────────│───────────────│                               │
//! │  │ RSA-2048 │    256    │      190      │                               │
//! │  │ RSA-3072 │    384    │      318      │                               │
//! │  │ RSA-4096 │    512    │      446      │                               │
//! │                                                                         │
//! │  There is no hybrid fallback: longer payloads are rejected.           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rand::rngs::OsRng;
use rsa::Oaep;
use sha2::Sha256;

use super::keys::{PrivateKey, PublicKey};
use crate::error::{Error, Result};

/// Size of the OAEP digest in bytes (SHA-256)
pub const OAEP_DIGEST_SIZE: usize = 32;

/// Maximum plaintext length for a modulus of `key_bytes` bytes
pub fn max_plaintext_len(key_bytes: usize) -> usize {
    key_bytes.saturating_sub(2 * OAEP_DIGEST_SIZE + 2)
}

/// Encrypt a payload under a public key
///
/// Oversize payloads fail with [`Error::PayloadTooLarge`] before the
/// primitive runs, so no ciphertext is ever produced for them.
pub fn encrypt(public_key: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let max = max_plaintext_len(public_key.size());
    if plaintext.len() > max {
        return Err(Error::PayloadTooLarge {
            len: plaintext.len(),
            max,
        });
    }

    public_key
        .as_rsa()
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|e| Error::EncryptionFailed(format!("RSA-OAEP encryption failed: {}", e)))
}

/// Decrypt a ciphertext and decode it as UTF-8 text
pub fn decrypt(private_key: &PrivateKey, ciphertext: &[u8]) -> Result<String> {
    if ciphertext.len() != private_key.size() {
        return Err(Error::DecryptionFailed(format!(
            "ciphertext is {} bytes, expected {}",
            ciphertext.len(),
            private_key.size()
        )));
    }

    let plaintext = private_key
        .as_rsa()
        .decrypt(Oaep::new::<Sha256>(), ciphertext)
        .map_err(|e| Error::DecryptionFailed(format!("RSA-OAEP decryption failed: {}", e)))?;

    String::from_utf8(plaintext)
        .map_err(|_| Error::DecryptionFailed("decrypted bytes are not valid UTF-8".into()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_keys;

    #[test]
    fn test_capacity_formula() {
        assert_eq!(max_plaintext_len(256), 190);
        assert_eq!(max_plaintext_len(384), 318);
        assert_eq!(max_plaintext_len(512), 446);
        assert_eq!(max_plaintext_len(10), 0);
    }

    #[test]
    fn test_encrypt_decrypt() {
        let pair = test_keys::encryption();

        let ciphertext = encrypt(pair.public_key(), b"hello").unwrap();
        assert_eq!(ciphertext.len(), 256);

        let plaintext = decrypt(pair.private_key(), &ciphertext).unwrap();
        assert_eq!(plaintext, "hello");
    }

    #[test]
    fn test_encryption_is_randomized() {
        let pair = test_keys::encryption();

        let a = encrypt(pair.public_key(), b"same text").unwrap();
        let b = encrypt(pair.public_key(), b"same text").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_capacity_boundary() {
        let pair = test_keys::encryption();

        let fits = vec![b'a'; 190];
        assert!(encrypt(pair.public_key(), &fits).is_ok());

        let too_long = vec![b'a'; 191];
        let err = encrypt(pair.public_key(), &too_long).unwrap_err();
        assert_eq!(err, Error::PayloadTooLarge { len: 191, max: 190 });
    }

    #[test]
    fn test_multibyte_text_capacity_counts_bytes() {
        let pair = test_keys::encryption();

        // 64 three-byte characters = 192 bytes
        let text = "€".repeat(64);
        assert!(matches!(
            encrypt(pair.public_key(), text.as_bytes()),
            Err(Error::PayloadTooLarge { len: 192, .. })
        ));
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let right = test_keys::encryption();
        let wrong = test_keys::signing();

        let ciphertext = encrypt(right.public_key(), b"secret").unwrap();
        let result = decrypt(wrong.private_key(), &ciphertext);
        assert!(matches!(result, Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_decrypt_malformed_fails() {
        let pair = test_keys::encryption();

        assert!(matches!(decrypt(pair.private_key(), &[1, 2, 3]), Err(Error::DecryptionFailed(_))));

        let mut ciphertext = encrypt(pair.public_key(), b"secret").unwrap();
        ciphertext[100] ^= 0x01;
        assert!(matches!(decrypt(pair.private_key(), &ciphertext), Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_decrypt_non_utf8_fails() {
        let pair = test_keys::encryption();

        let ciphertext = encrypt(pair.public_key(), &[0xff, 0xfe, 0xfd]).unwrap();
        let err = decrypt(pair.private_key(), &ciphertext).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }
}
