//! # Message Pipeline
//!
//! Orchestrates the encode and decode runs.
//!
//! ## Encode
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  text ─► validate (non-blank) ─────────────── fail: Validation         │
//! │        ─► [run gate]                                                    │
//! │        ─► generate encryption pair + signing pair ─► KeyPairCreated    │
//! │        ─► persist private enc + public sig                              │
//! │        ─► (stage delay) ─► encrypt(public enc) ───► MessageEncrypted   │
//! │        ─► (stage delay) ─► sign(private sig)                            │
//! │        ─► mailbox.put(msg) ───────────────────────► MessageSigned(msg) │
//! │        ─► Completed                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stored keys always belong to the most recent admitted run. A run that
//! fails after persisting leaves the mailbox untouched, so a message still
//! waiting there no longer verifies against the stored keys.
//!
//! ## Decode
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  msg ─► AuthGate ─────────────────────────── fail: Authentication      │
//! │      ─► [run gate] retrieve private enc + public sig                    │
//! │      ─► verify(signature, ciphertext) ─── false: IntegrityCheckFailed  │
//! │                                        ─► SignatureVerified             │
//! │      ─► decrypt ──────────────────────────► MessageDecrypted(text)     │
//! │      ─► Completed                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tracing::Instrument;
use uuid::Uuid;

use super::mailbox::MessageMailbox;
use super::message::EncryptedMessage;
use super::status::{self, DecodeStatus, EncodeStatus, PipelineFailure, StatusEmitter, StatusStream};
use crate::auth::{AuthGate, AuthOutcome};
use crate::crypto::{CryptoEngine, KeyPair, KeyPairGenerator, KeyStrength, PrivateKey, PublicKey};
use crate::error::{Error, Result};
use crate::storage::{KeyRole, KeyStore};

/// Default capacity of a run's status channel
pub const DEFAULT_EVENT_BUFFER: usize = 8;

/// Tunables for the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// RSA modulus size for both per-message key pairs
    pub key_strength: KeyStrength,
    /// Pause before the encrypt and before the sign stage (UX pacing only)
    pub stage_delay: Duration,
    /// Capacity of each run's status channel
    ///
    /// Raised to the run's full event count when smaller, so an unread
    /// stream never stalls its run.
    pub event_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            key_strength: KeyStrength::default(),
            stage_delay: Duration::ZERO,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

/// The components a pipeline is built from
pub struct PipelineParts {
    /// Key pair source
    pub generator: Arc<dyn KeyPairGenerator>,
    /// Encrypt / decrypt / sign / verify
    pub engine: Arc<dyn CryptoEngine>,
    /// Durable key storage
    pub key_store: Arc<dyn KeyStore>,
    /// Encode → send handoff slot
    pub mailbox: Arc<MessageMailbox>,
    /// Access policy in front of decode
    pub auth_gate: Arc<AuthGate>,
}

struct PipelineInner {
    generator: Arc<dyn KeyPairGenerator>,
    engine: Arc<dyn CryptoEngine>,
    key_store: Arc<dyn KeyStore>,
    mailbox: Arc<MessageMailbox>,
    auth_gate: Arc<AuthGate>,
    config: PipelineConfig,
    /// Serializes encode runs and guards decode's key reads
    run_gate: AsyncMutex<()>,
}

/// Runs encode and decode as independent tasks with ordered status streams
///
/// Cloning is cheap; clones share the same run gate, so encodes started from
/// any clone are serialized.
#[derive(Clone)]
pub struct MessagePipeline {
    inner: Arc<PipelineInner>,
}

impl MessagePipeline {
    /// Assemble a pipeline from its parts
    pub fn new(parts: PipelineParts, config: PipelineConfig) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                generator: parts.generator,
                engine: parts.engine,
                key_store: parts.key_store,
                mailbox: parts.mailbox,
                auth_gate: parts.auth_gate,
                config,
                run_gate: AsyncMutex::new(()),
            }),
        }
    }

    /// The configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// Start an encode run
    ///
    /// Returns immediately; the run proceeds on its own task. Encodes are
    /// admitted one at a time: a second encode waits for the first to
    /// finish, then overwrites the stored keys and the mailbox.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn encode(&self, text: impl Into<String>) -> StatusStream<EncodeStatus> {
        let (emitter, stream) = status::channel(self.inner.config.event_buffer);
        let inner = Arc::clone(&self.inner);
        let text = text.into();
        let span = tracing::info_span!("encode", run_id = %Uuid::new_v4());

        tokio::spawn(async move { inner.run_encode(text, emitter).await }.instrument(span));
        stream
    }

    /// Start a decode run for `message`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn decode(&self, message: EncryptedMessage) -> StatusStream<DecodeStatus> {
        let (emitter, stream) = status::channel(self.inner.config.event_buffer);
        let inner = Arc::clone(&self.inner);
        let span = tracing::info_span!("decode", run_id = %Uuid::new_v4());

        tokio::spawn(async move { inner.run_decode(message, emitter).await }.instrument(span));
        stream
    }
}

impl PipelineInner {
    async fn run_encode(&self, text: String, mut emitter: StatusEmitter<EncodeStatus>) {
        tracing::info!(len = text.len(), "Encode started");

        let terminal = match self.encode_stages(&text, &mut emitter).await {
            Ok(()) => {
                tracing::info!("Encode completed");
                EncodeStatus::Completed
            }
            Err(failure) => {
                tracing::warn!(%failure, "Encode failed");
                EncodeStatus::Failed(failure)
            }
        };
        emitter.emit(terminal).await;
    }

    async fn encode_stages(
        &self,
        text: &str,
        emitter: &mut StatusEmitter<EncodeStatus>,
    ) -> std::result::Result<(), PipelineFailure> {
        if text.trim().is_empty() {
            return Err(PipelineFailure::Validation(Error::ValidationFailed(
                "message text is empty".into(),
            )));
        }

        let _admission = self.run_gate.lock().await;

        let (encryption, signing) = self
            .generate_pairs(self.config.key_strength)
            .await
            .map_err(PipelineFailure::Encryption)?;
        tracing::debug!(
            encryption = %encryption.public_key().fingerprint(),
            signing = %signing.public_key().fingerprint(),
            "Key pairs created"
        );
        emitter.emit(EncodeStatus::KeyPairCreated).await;

        self.persist_keys(encryption.private_key(), signing.public_key())
            .await
            .map_err(PipelineFailure::Encryption)?;

        self.pace().await;
        let ciphertext = self
            .engine
            .encrypt(text.as_bytes(), encryption.public_key())
            .map_err(PipelineFailure::Encryption)?;
        tracing::debug!(len = ciphertext.len(), "Message encrypted");
        emitter.emit(EncodeStatus::MessageEncrypted).await;

        self.pace().await;
        let signature = self
            .engine
            .sign(&ciphertext, signing.private_key())
            .map_err(PipelineFailure::Encryption)?;

        let message = EncryptedMessage::new(ciphertext, signature);
        self.mailbox.put(message.clone());
        tracing::debug!("Message signed and placed in mailbox");
        emitter.emit(EncodeStatus::MessageSigned(message)).await;

        Ok(())
    }

    /// Generate the two pairs off the async executor
    async fn generate_pairs(&self, strength: KeyStrength) -> Result<(KeyPair, KeyPair)> {
        let generator = Arc::clone(&self.generator);
        let joined = tokio::task::spawn_blocking(move || -> Result<(KeyPair, KeyPair)> {
            let encryption = generator.generate(strength)?;
            let signing = generator.generate(strength)?;
            Ok((encryption, signing))
        })
        .await;

        match joined {
            Ok(result) => result,
            Err(e) => Err(Error::KeyGenerationFailed(format!("key generation task failed: {}", e))),
        }
    }

    async fn persist_keys(&self, decryption_key: &PrivateKey, verifying_key: &PublicKey) -> Result<()> {
        let role = KeyRole::EncryptionPrivate;
        self.key_store
            .store(&decryption_key.to_der()?, role, role.default_identifier())
            .await?;

        let role = KeyRole::SigningPublic;
        self.key_store
            .store(&verifying_key.to_der()?, role, role.default_identifier())
            .await?;

        tracing::debug!("Decode keys persisted");
        Ok(())
    }

    async fn pace(&self) {
        if !self.config.stage_delay.is_zero() {
            tokio::time::sleep(self.config.stage_delay).await;
        }
    }

    async fn run_decode(&self, message: EncryptedMessage, mut emitter: StatusEmitter<DecodeStatus>) {
        tracing::info!(?message, "Decode started");

        let terminal = match self.decode_stages(&message, &mut emitter).await {
            Ok(()) => {
                tracing::info!("Decode completed");
                DecodeStatus::Completed
            }
            Err(failure) => {
                tracing::warn!(%failure, "Decode failed");
                DecodeStatus::Failed(failure)
            }
        };
        emitter.emit(terminal).await;
    }

    async fn decode_stages(
        &self,
        message: &EncryptedMessage,
        emitter: &mut StatusEmitter<DecodeStatus>,
    ) -> std::result::Result<(), PipelineFailure> {
        if let AuthOutcome::Failure(reason) = self.auth_gate.verify().await {
            return Err(PipelineFailure::Authentication(reason));
        }

        let (decryption_key, verifying_key) =
            self.load_keys().await.map_err(PipelineFailure::Decryption)?;

        let valid = self
            .engine
            .verify(&message.signature, &message.ciphertext, &verifying_key)
            .map_err(PipelineFailure::Decryption)?;
        if !valid {
            return Err(PipelineFailure::IntegrityCheckFailed);
        }
        emitter.emit(DecodeStatus::SignatureVerified).await;

        let text = self
            .engine
            .decrypt(&message.ciphertext, &decryption_key)
            .map_err(PipelineFailure::Decryption)?;
        emitter.emit(DecodeStatus::MessageDecrypted(text)).await;

        Ok(())
    }

    async fn load_keys(&self) -> Result<(PrivateKey, PublicKey)> {
        let _admission = self.run_gate.lock().await;

        let role = KeyRole::EncryptionPrivate;
        let private = self.key_store.retrieve(role, role.default_identifier()).await?;

        let role = KeyRole::SigningPublic;
        let public = self.key_store.retrieve(role, role.default_identifier()).await?;

        Ok((PrivateKey::from_der(&private)?, PublicKey::from_der(&public)?))
    }
}

// ============================================================================
// TESTS
// ============================================================================
