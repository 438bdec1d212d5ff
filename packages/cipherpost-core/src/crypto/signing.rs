//! # Signing Module
//!
//! Detached RSASSA-PKCS1-v1_5 / SHA-256 signatures over ciphertext bytes.
//!
//! The signature covers the exact bytes that travel, not the plaintext, so
//! any change made after encryption is caught before decryption is tried.

use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256};

use super::keys::{PrivateKey, PublicKey};
use crate::error::{Error, Result};

/// Sign `message` (the ciphertext) with a signing private key
///
/// PKCS#1 v1.5 signatures are deterministic: the same bytes and key always
/// give the same signature.
pub fn sign(private_key: &PrivateKey, message: &[u8]) -> Result<Vec<u8>> {
    let digest = Sha256::digest(message);

    private_key
        .as_rsa()
        .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| Error::SigningFailed(format!("RSA signing failed: {}", e)))
}

/// Verify a detached signature over `message`
///
/// ## Returns
///
/// `Ok(true)` if valid, `Ok(false)` on any mismatch (altered message,
/// altered signature, wrong key). `Err(VerificationFailed)` is reserved for
/// input that cannot be checked at all.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &[u8]) -> Result<bool> {
    if signature.is_empty() {
        return Err(Error::VerificationFailed("signature is empty".into()));
    }
    if signature.len() > public_key.size() {
        return Err(Error::VerificationFailed(format!(
            "signature is {} bytes, longer than the {} byte modulus",
            signature.len(),
            public_key.size()
        )));
    }

    let digest = Sha256::digest(message);
    let valid = public_key
        .as_rsa()
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
        .is_ok();

    Ok(valid)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_keys;

    #[test]
    fn test_sign_verify() {
        let pair = test_keys::signing();
        let message = b"ciphertext bytes";

        let signature = sign(pair.private_key(), message).unwrap();
        assert_eq!(signature.len(), 256);
        assert!(verify(pair.public_key(), message, &signature).unwrap());
    }

    #[test]
    fn test_deterministic_signatures() {
        let pair = test_keys::signing();

        let sig1 = sign(pair.private_key(), b"same").unwrap();
        let sig2 = sign(pair.private_key(), b"same").unwrap();
        assert_eq!(sig1, sig2);
    }

    #[test]
    fn test_verify_wrong_message_is_false() {
        let pair = test_keys::signing();

        let signature = sign(pair.private_key(), b"original").unwrap();
        assert!(!verify(pair.public_key(), b"tampered", &signature).unwrap());
    }

    #[test]
    fn test_verify_wrong_key_is_false() {
        let signer = test_keys::signing();
        let other = test_keys::encryption();

        let signature = sign(signer.private_key(), b"message").unwrap();
        assert!(!verify(other.public_key(), b"message", &signature).unwrap());
    }

    #[test]
    fn test_every_signature_bit_flip_is_false() {
        let pair = test_keys::signing();
        let message = b"message";
        let signature = sign(pair.private_key(), message).unwrap();

        for byte in [0, 1, 127, 255] {
            for bit in [0, 7] {
                let mut tampered = signature.clone();
                tampered[byte] ^= 1 << bit;
                assert!(!verify(pair.public_key(), message, &tampered).unwrap());
            }
        }
    }

    #[test]
    fn test_short_signature_is_false() {
        let pair = test_keys::signing();
        let signature = sign(pair.private_key(), b"message").unwrap();

        assert!(!verify(pair.public_key(), b"message", &signature[..200]).unwrap());
    }

    #[test]
    fn test_structural_errors() {
        let pair = test_keys::signing();

        assert!(matches!(
            verify(pair.public_key(), b"message", &[]),
            Err(Error::VerificationFailed(_))
        ));
        assert!(matches!(
            verify(pair.public_key(), b"message", &[0u8; 300]),
            Err(Error::VerificationFailed(_))
        ));
    }
}
