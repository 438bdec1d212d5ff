//! The unit that crosses the transport boundary.
//!
//! ## Wire Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     TRANSPORT PAYLOAD                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  "encryptedMessage"  ──► ciphertext bytes (key-size long)              │
//! │  "messageSignature"  ──► detached signature bytes (key-size long)      │
//! │                                                                         │
//! │  Binary carriers use the bytes as-is; string-only carriers get the     │
//! │  JSON form with standard base64 values.                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Payload key carrying the ciphertext
pub const PAYLOAD_CIPHERTEXT_KEY: &str = "encryptedMessage";

/// Payload key carrying the signature
pub const PAYLOAD_SIGNATURE_KEY: &str = "messageSignature";

/// Ciphertext plus detached signature over it
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessage {
    /// RSA-OAEP ciphertext
    #[serde(rename = "encryptedMessage", with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    /// Signature over `ciphertext`
    #[serde(rename = "messageSignature", with = "base64_bytes")]
    pub signature: Vec<u8>,
}

impl EncryptedMessage {
    /// Bundle a ciphertext with its signature
    pub fn new(ciphertext: Vec<u8>, signature: Vec<u8>) -> Self {
        Self {
            ciphertext,
            signature,
        }
    }

    /// Convert into the two-key transport payload
    pub fn to_payload(&self) -> HashMap<String, Vec<u8>> {
        HashMap::from([
            (PAYLOAD_CIPHERTEXT_KEY.to_string(), self.ciphertext.clone()),
            (PAYLOAD_SIGNATURE_KEY.to_string(), self.signature.clone()),
        ])
    }

    /// Rebuild from a transport payload
    ///
    /// Extra keys are ignored; a missing or empty value is an error.
    pub fn from_payload(payload: &HashMap<String, Vec<u8>>) -> Result<Self> {
        let field = |key: &str| -> Result<Vec<u8>> {
            match payload.get(key) {
                Some(value) if !value.is_empty() => Ok(value.clone()),
                Some(_) => Err(Error::SerializationError(format!("Payload field '{}' is empty", key))),
                None => Err(Error::SerializationError(format!("Payload field '{}' is missing", key))),
            }
        };

        Ok(Self {
            ciphertext: field(PAYLOAD_CIPHERTEXT_KEY)?,
            signature: field(PAYLOAD_SIGNATURE_KEY)?,
        })
    }

    /// Encode as a JSON object with base64 values
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        let message: Self = serde_json::from_str(json)?;
        if message.ciphertext.is_empty() || message.signature.is_empty() {
            return Err(Error::SerializationError("Payload field is empty".into()));
        }
        Ok(message)
    }
}

impl fmt::Debug for EncryptedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedMessage")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("signature_len", &self.signature.len())
            .finish()
    }
}

/// Serde helper for byte vectors as base64 strings
mod base64_bytes {
    use super::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}
