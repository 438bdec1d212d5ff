//! # Error Handling
//!
//! This module provides the error type shared by every Cipherpost component.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Input Errors                                                      │
//! │  │   └── ValidationFailed      - Empty or whitespace-only text         │
//! │  │                                                                      │
//! │  ├── Key Errors                                                        │
//! │  │   └── KeyGenerationFailed   - Bad strength, RNG or task failure     │
//! │  │                                                                      │
//! │  ├── Storage Errors                                                    │
//! │  │   ├── StorageError          - Backend failure (native status code)  │
//! │  │   ├── KeyNotFound           - No entry for role + identifier        │
//! │  │   └── StorageCorrupted      - Stored blob failed to open/decode     │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── EncryptionFailed      - OAEP encryption failed                │
//! │  │   ├── PayloadTooLarge       - Plaintext exceeds OAEP capacity       │
//! │  │   ├── SigningFailed         - Signature production failed           │
//! │  │   ├── VerificationFailed    - Structural verify error (NOT mismatch)│
//! │  │   ├── DecryptionFailed      - Bad ciphertext, wrong key, not UTF-8  │
//! │  │   └── IntegrityCheckFailed  - Signature did not match ciphertext    │
//! │  │                                                                      │
//! │  ├── Access Errors                                                     │
//! │  │   └── AuthenticationFailed  - Device authentication refused         │
//! │  │                                                                      │
//! │  └── Internal Errors                                                   │
//! │      ├── SerializationError    - Transport payload malformed           │
//! │      ├── Internal              - Task or runtime failure               │
//! │      └── InvalidConfig         - Unusable configuration                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A signature *mismatch* is never a `VerificationFailed`: the crypto engine
//! reports it as `Ok(false)` and the decode pipeline turns it into a terminal
//! integrity-check failure.

use thiserror::Error;

/// Result type alias for Cipherpost operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Cipherpost Core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ========================================================================
    // Input Errors (100-199)
    // ========================================================================

    /// Input was rejected before any key material was generated
    #[error("Invalid input: {0}")]
    ValidationFailed(String),

    // ========================================================================
    // Key Errors (200-299)
    // ========================================================================

    /// Key pair generation failed
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    // ========================================================================
    // Storage Errors (300-399)
    // ========================================================================

    /// The storage backend reported a failure
    #[error("Storage error ({code}): {message}")]
    StorageError {
        /// Backend-native status (SQLite extended result code, OSStatus, ...)
        code: i32,
        /// Human-readable description
        message: String,
    },

    /// No key entry exists for the requested role and identifier
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// A stored entry exists but could not be opened or decoded
    #[error("Stored data corrupted: {0}")]
    StorageCorrupted(String),

    // ========================================================================
    // Crypto Errors (400-499)
    // ========================================================================

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Plaintext does not fit the padding-adjusted capacity of the key
    #[error("Payload too large: {len} bytes exceeds the {max} byte capacity of the key")]
    PayloadTooLarge {
        /// Plaintext length in bytes
        len: usize,
        /// Maximum plaintext length for the key and padding
        max: usize,
    },

    /// Signing failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Signature verification could not be performed
    #[error("Signature verification error: {0}")]
    VerificationFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// The signature does not match the ciphertext
    #[error("Integrity check failed: signature does not match the message")]
    IntegrityCheckFailed,

    // ========================================================================
    // Access Errors (500-599)
    // ========================================================================

    /// The device-level authenticator refused access
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Serialization or payload decoding failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error (task join failure, runtime shutdown)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Configuration cannot be used as given
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// SQLite primary result codes that signal a transient condition
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

impl Error {
    /// Get the numeric error code
    ///
    /// Error codes are grouped by category:
    /// - 100-199: Input
    /// - 200-299: Key generation
    /// - 300-399: Storage
    /// - 400-499: Crypto
    /// - 500-599: Access
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            Error::ValidationFailed(_) => 100,

            Error::KeyGenerationFailed(_) => 200,

            Error::StorageError { .. } => 300,
            Error::KeyNotFound(_) => 301,
            Error::StorageCorrupted(_) => 302,

            Error::EncryptionFailed(_) => 400,
            Error::PayloadTooLarge { .. } => 401,
            Error::SigningFailed(_) => 402,
            Error::VerificationFailed(_) => 403,
            Error::DecryptionFailed(_) => 404,
            Error::IntegrityCheckFailed => 405,

            Error::AuthenticationFailed(_) => 500,

            Error::SerializationError(_) => 900,
            Error::Internal(_) => 901,
            Error::InvalidConfig(_) => 902,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Nothing is retried internally; this only tells the caller whether
    /// re-invoking the operation can succeed without other changes.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::AuthenticationFailed(_) => true,
            Error::StorageError { code, .. } => {
                matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)
            }
            _ => false,
        }
    }

    /// Check if this error indicates the message was altered in transit
    pub fn is_tampering(&self) -> bool {
        matches!(self, Error::IntegrityCheckFailed)
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        let code = err.sqlite_error().map(|e| e.extended_code).unwrap_or(-1);
        Error::StorageError {
            code,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::SerializationError(format!("Invalid base64: {}", err))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::ValidationFailed("empty".into()).code(), 100);
        assert_eq!(Error::KeyGenerationFailed("test".into()).code(), 200);
        assert_eq!(Error::KeyNotFound("test".into()).code(), 301);
        assert_eq!(Error::PayloadTooLarge { len: 300, max: 190 }.code(), 401);
        assert_eq!(Error::IntegrityCheckFailed.code(), 405);
        assert_eq!(Error::AuthenticationFailed("cancelled".into()).code(), 500);
        assert_eq!(Error::Internal("test".into()).code(), 901);
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::AuthenticationFailed("cancelled".into()).is_recoverable());
        assert!(Error::StorageError { code: 5, message: "busy".into() }.is_recoverable());
        // SQLITE_BUSY_SNAPSHOT is an extended form of SQLITE_BUSY
        assert!(Error::StorageError { code: 517, message: "busy".into() }.is_recoverable());
        assert!(!Error::StorageError { code: 14, message: "cantopen".into() }.is_recoverable());
        assert!(!Error::IntegrityCheckFailed.is_recoverable());
        assert!(!Error::DecryptionFailed("test".into()).is_recoverable());
    }

    #[test]
    fn test_tampering_is_distinct_from_decryption() {
        assert!(Error::IntegrityCheckFailed.is_tampering());
        assert!(!Error::DecryptionFailed("bad padding".into()).is_tampering());
    }

    #[test]
    fn test_payload_too_large_message() {
        let err = Error::PayloadTooLarge { len: 300, max: 190 };
        let message = err.to_string();
        assert!(message.contains("300"));
        assert!(message.contains("190"));
    }

    #[test]
    fn test_base64_conversion() {
        use base64::Engine as _;
        let err: Error = base64::engine::general_purpose::STANDARD
            .decode("not base64!")
            .unwrap_err()
            .into();
        assert_eq!(err.code(), 900);
    }
}
