//! # Cipherpost Core
//!
//! Encrypts a short text message with a fresh asymmetric key pair, signs the
//! ciphertext with a second fresh pair, keeps the keys the receiver needs in
//! durable storage, and later verifies and decrypts the message, optionally
//! behind device authentication.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       CIPHERPOST CORE MODULES                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │                        ┌──────────────────────┐                         │
//! │                        │   MessagePipeline    │                         │
//! │                        │                      │                         │
//! │                        │ - encode ─► stream   │                         │
//! │                        │ - decode ─► stream   │                         │
//! │                        └──────────┬───────────┘                         │
//! │                                   │                                     │
//! │     ┌──────────────┬──────────────┼──────────────┬──────────────┐      │
//! │     ▼              ▼              ▼              ▼              ▼      │
//! │  ┌────────┐  ┌──────────┐  ┌────────────┐  ┌──────────┐  ┌─────────┐  │
//! │  │KeyPair │  │ Crypto   │  │  KeyStore  │  │ Mailbox  │  │AuthGate │  │
//! │  │Generator│ │ Engine   │  │            │  │          │  │         │  │
//! │  │        │  │ - OAEP   │  │ - SQLite   │  │ - 1 slot │  │ - prefs │  │
//! │  │ - RSA  │  │ - PKCS#1 │  │ - Keychain │  │          │  │ - device│  │
//! │  └────────┘  └──────────┘  └────────────┘  └──────────┘  └─────────┘  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Key pairs, encryption and signatures
//! - [`storage`] - Durable key storage (SQLite, keychain, in-memory)
//! - [`auth`] - Device authentication gate
//! - [`messaging`] - The encode/decode pipeline, its events and the mailbox
//! - [`logging`] - Optional log subscriber setup
//!
//! ## Usage
//!
//! ```ignore
//! use cipherpost_core::{CoreConfig, CoreContext, EncodeStatus};
//!
//! let context = CoreContext::open(CoreConfig::default(), authenticator, preferences)?;
//!
//! let mut events = context.encode("hello");
//! while let Some(status) = events.next_status().await {
//!     println!("{:?}", status);
//! }
//!
//! let payload = context.send_pending().expect("encoded message");
//! let decoded = context.receive(&payload)?.terminal().await;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod storage;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use auth::{AuthGate, AuthOutcome, AuthPreferences, Authenticator, MemoryPreferences};
pub use config::CoreConfig;
pub use crypto::{CryptoEngine, KeyPairGenerator, KeyStrength, RsaCryptoEngine, RsaKeyPairGenerator};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use messaging::{
    DecodeStatus, EncodeStatus, EncryptedMessage, MessageMailbox, MessagePipeline, PipelineFailure,
    StatusStream,
};
pub use storage::{KeyRole, KeyStore, MemoryKeyStore, SqliteKeyStore};

// ============================================================================
// CORE CONTEXT
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use messaging::PipelineParts;

/// Owns the components of one Cipherpost instance
///
/// Built once at startup and shared by reference or `Arc`; there is no
/// global instance.
///
/// ## Lifecycle
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                        CONTEXT LIFECYCLE                                │
/// ├─────────────────────────────────────────────────────────────────────────┤
/// │                                                                         │
/// │  1. Open                                                               │
/// │     ┌─────────────┐                                                    │
/// │     │ CoreContext │──► Validate config                                 │
/// │     │ ::open()    │──► Open key store (file or in-memory)              │
/// │     └─────────────┘──► Wire pipeline, mailbox, auth gate               │
/// │            │                                                           │
/// │            ▼                                                           │
/// │  2. Encode                                                             │
/// │     ┌─────────────┐                                                    │
/// │     │ encode()    │──► Keys persisted, message placed in mailbox       │
/// │     └─────────────┘                                                    │
/// │            │                                                           │
/// │            ▼                                                           │
/// │  3. Send                                                               │
/// │     ┌─────────────┐                                                    │
/// │     │ send_       │──► Mailbox drained into a transport payload        │
/// │     │ pending()   │                                                    │
/// │     └─────────────┘                                                    │
/// │            │                                                           │
/// │            ▼                                                           │
/// │  4. Receive                                                            │
/// │     ┌─────────────┐                                                    │
/// │     │ receive()   │──► Payload parsed, auth gate, verify, decrypt      │
/// │     └─────────────┘                                                    │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub struct CoreContext {
    config: CoreConfig,
    key_store: Arc<dyn KeyStore>,
    mailbox: Arc<MessageMailbox>,
    pipeline: MessagePipeline,
}

impl CoreContext {
    /// Open a context backed by a [`SqliteKeyStore`]
    ///
    /// Uses the file at `storage_path` (which then requires `storage_key`),
    /// or an in-memory database with a random sealing key.
    pub fn open(
        config: CoreConfig,
        authenticator: Arc<dyn Authenticator>,
        preferences: Arc<dyn AuthPreferences>,
    ) -> Result<Self> {
        config.validate()?;

        let storage_key = match config.storage_key {
            Some(key) => key,
            None => storage::generate_storage_key(),
        };
        let key_store = SqliteKeyStore::open(config.storage_path.as_deref(), storage_key)?;

        Self::with_key_store(config, Arc::new(key_store), authenticator, preferences)
    }

    /// Build a context around an existing key store
    pub fn with_key_store(
        config: CoreConfig,
        key_store: Arc<dyn KeyStore>,
        authenticator: Arc<dyn Authenticator>,
        preferences: Arc<dyn AuthPreferences>,
    ) -> Result<Self> {
        config.validate()?;
        tracing::info!("Opening Cipherpost Core v{}", version());
        tracing::debug!(?config, "Core configuration");

        let mailbox = Arc::new(MessageMailbox::new());
        let auth_gate = Arc::new(AuthGate::with_reason(
            authenticator,
            preferences,
            &config.auth_reason,
        ));
        let pipeline = MessagePipeline::new(
            PipelineParts {
                generator: Arc::new(RsaKeyPairGenerator::new()),
                engine: Arc::new(RsaCryptoEngine::new()),
                key_store: Arc::clone(&key_store),
                mailbox: Arc::clone(&mailbox),
                auth_gate,
            },
            config.pipeline_config(),
        );

        Ok(Self {
            config,
            key_store,
            mailbox,
            pipeline,
        })
    }

    /// The configuration this context was opened with
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// The message pipeline
    pub fn pipeline(&self) -> &MessagePipeline {
        &self.pipeline
    }

    /// The encode → send mailbox
    pub fn mailbox(&self) -> &MessageMailbox {
        &self.mailbox
    }

    /// The key store
    pub fn key_store(&self) -> &Arc<dyn KeyStore> {
        &self.key_store
    }

    /// Start an encode run
    pub fn encode(&self, text: impl Into<String>) -> StatusStream<EncodeStatus> {
        self.pipeline.encode(text)
    }

    /// Start a decode run
    pub fn decode(&self, message: EncryptedMessage) -> StatusStream<DecodeStatus> {
        self.pipeline.decode(message)
    }

    /// Take the pending message as a transport payload
    ///
    /// Empties the mailbox. `None` if nothing is waiting to be sent.
    pub fn send_pending(&self) -> Option<HashMap<String, Vec<u8>>> {
        let message = self.mailbox.take()?;
        tracing::debug!(?message, "Handing pending message to transport");
        Some(message.to_payload())
    }

    /// Parse a received transport payload and start decoding it
    pub fn receive(&self, payload: &HashMap<String, Vec<u8>>) -> Result<StatusStream<DecodeStatus>> {
        let message = EncryptedMessage::from_payload(payload)?;
        Ok(self.pipeline.decode(message))
    }
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Cipherpost Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns build information for debugging
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        #[cfg(target_os = "ios")]
        target: "ios",
        #[cfg(target_os = "android")]
        target: "android",
        #[cfg(target_os = "macos")]
        target: "macos",
        #[cfg(target_os = "linux")]
        target: "linux",
        #[cfg(target_os = "windows")]
        target: "windows",
        #[cfg(not(any(
            target_os = "ios",
            target_os = "android",
            target_os = "macos",
            target_os = "linux",
            target_os = "windows"
        )))]
        target: "unknown",
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

/// Build information for debugging
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Crate version
    pub version: &'static str,
    /// Target operating system
    pub target: &'static str,
    /// Build profile (debug/release)
    pub profile: &'static str,
}

// ============================================================================
// TESTS
// ============================================================================
