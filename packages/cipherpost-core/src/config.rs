//! Runtime configuration.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::auth::DEFAULT_AUTH_REASON;
use crate::crypto::KeyStrength;
use crate::error::{Error, Result};
use crate::messaging::{PipelineConfig, DEFAULT_EVENT_BUFFER};

/// Configuration for a [`crate::CoreContext`]
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use cipherpost_core::CoreConfig;
///
/// let config: CoreConfig = serde_json::from_str(r#"{ "key_strength": 3072 }"#).unwrap();
/// assert_eq!(config.key_strength.bits(), 3072);
/// assert!(config.storage_path.is_none());
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Key store database file (in-memory database if None)
    pub storage_path: Option<String>,
    /// At-rest sealing key for the key store, hex-encoded in config files
    ///
    /// Required when `storage_path` is set. The in-memory store draws a
    /// random key when absent.
    #[serde(with = "hex_key")]
    pub storage_key: Option<[u8; 32]>,
    /// Modulus size for per-message key pairs
    pub key_strength: KeyStrength,
    /// Pause before the encrypt and sign stages, in milliseconds
    pub stage_delay_ms: u64,
    /// Capacity of each run's status channel
    pub event_buffer: usize,
    /// Prompt text shown by the device authenticator
    pub auth_reason: String,
    /// Enable verbose logging
    pub verbose_logging: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            storage_path: None,
            storage_key: None,
            key_strength: KeyStrength::default(),
            stage_delay_ms: 0,
            event_buffer: DEFAULT_EVENT_BUFFER,
            auth_reason: DEFAULT_AUTH_REASON.to_string(),
            verbose_logging: false,
        }
    }
}

impl CoreConfig {
    /// Reject configurations that cannot be used
    pub fn validate(&self) -> Result<()> {
        if self.storage_path.is_some() && self.storage_key.is_none() {
            return Err(Error::InvalidConfig(
                "storage_key is required for a file-backed key store".into(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(Error::InvalidConfig("event_buffer must be at least 1".into()));
        }
        Ok(())
    }

    /// The pipeline tunables this configuration implies
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            key_strength: self.key_strength,
            stage_delay: Duration::from_millis(self.stage_delay_ms),
            event_buffer: self.event_buffer,
        }
    }
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("storage_path", &self.storage_path)
            .field("storage_key", &self.storage_key.map(|_| "[REDACTED]"))
            .field("key_strength", &self.key_strength)
            .field("stage_delay_ms", &self.stage_delay_ms)
            .field("event_buffer", &self.event_buffer)
            .field("auth_reason", &self.auth_reason)
            .field("verbose_logging", &self.verbose_logging)
            .finish()
    }
}

/// Serde helper for an optional 32-byte key as hex
mod hex_key {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<[u8; 32]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(s) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map(Some)
            .map_err(|_| serde::de::Error::custom("storage_key must be 32 bytes"))
    }
}
