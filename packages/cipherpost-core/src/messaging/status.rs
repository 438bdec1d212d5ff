//! # Pipeline Status
//!
//! Status events, terminal failures, and the per-run event stream.
//!
//! ## State Machines
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ENCODE                                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Initial ─► KeyPairCreated ─► MessageEncrypted ─► MessageSigned(msg)   │
//! │     │            │                  │                   │              │
//! │     ▼            ▼                  ▼                   ▼              │
//! │  Failed       Failed             Failed             Completed          │
//! │                                                                         │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                        DECODE                                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Initial ─► SignatureVerified ─► MessageDecrypted(text) ─► Completed   │
//! │     │              │                                                   │
//! │     ▼              ▼                                                   │
//! │  Failed         Failed                                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transitions only move forward. `Initial` is the state before the first
//! event and is never emitted itself. Exactly one terminal event
//! (`Completed` or `Failed`) ends every run, and the stream closes after it.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;

use super::message::EncryptedMessage;
use crate::error::Error;

/// Why a run ended without completing
///
/// Encode failures after validation all surface as `Encryption`, decode
/// failures as `Decryption`, except the two cases callers must tell apart:
/// tampering and an authentication refusal. The underlying error stays
/// available through [`PipelineFailure::cause`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineFailure {
    /// Input was rejected before any key material was generated
    #[error("validation failed: {0}")]
    Validation(#[source] Error),

    /// An encode stage failed
    #[error("encryption failed: {0}")]
    Encryption(#[source] Error),

    /// A decode stage failed
    #[error("decryption failed: {0}")]
    Decryption(#[source] Error),

    /// The signature did not match the ciphertext
    #[error("integrity check failed: the message was altered or is not the one these keys signed")]
    IntegrityCheckFailed,

    /// The device authenticator refused access
    #[error("authentication failed: {0}")]
    Authentication(String),
}

impl PipelineFailure {
    /// The underlying error, where there is one
    pub fn cause(&self) -> Option<&Error> {
        match self {
            PipelineFailure::Validation(e)
            | PipelineFailure::Encryption(e)
            | PipelineFailure::Decryption(e) => Some(e),
            PipelineFailure::IntegrityCheckFailed | PipelineFailure::Authentication(_) => None,
        }
    }

    /// Flatten into the crate error type
    pub fn into_error(self) -> Error {
        match self {
            PipelineFailure::Validation(e)
            | PipelineFailure::Encryption(e)
            | PipelineFailure::Decryption(e) => e,
            PipelineFailure::IntegrityCheckFailed => Error::IntegrityCheckFailed,
            PipelineFailure::Authentication(reason) => Error::AuthenticationFailed(reason),
        }
    }
}

/// Ordering metadata for a status type
pub trait PipelineStage {
    /// Position in the forward-only traversal
    fn ordinal(&self) -> u8;

    /// Whether this status ends the run
    fn is_terminal(&self) -> bool;

    /// Most events a single run can emit, terminal event included
    const MAX_EVENTS: usize;
}

/// Encode run states
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EncodeStatus {
    /// Nothing has happened yet
    #[default]
    Initial,
    /// Encryption and signing key pairs exist
    KeyPairCreated,
    /// Ciphertext produced
    MessageEncrypted,
    /// Signature produced; the message is in the mailbox
    MessageSigned(EncryptedMessage),
    /// Run finished successfully
    Completed,
    /// Run aborted
    Failed(PipelineFailure),
}

impl PipelineStage for EncodeStatus {
    const MAX_EVENTS: usize = 4;

    fn ordinal(&self) -> u8 {
        match self {
            EncodeStatus::Initial => 0,
            EncodeStatus::KeyPairCreated => 1,
            EncodeStatus::MessageEncrypted => 2,
            EncodeStatus::MessageSigned(_) => 3,
            EncodeStatus::Completed | EncodeStatus::Failed(_) => u8::MAX,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, EncodeStatus::Completed | EncodeStatus::Failed(_))
    }
}

/// Decode run states
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DecodeStatus {
    /// Nothing has happened yet
    #[default]
    Initial,
    /// Signature matched the ciphertext
    SignatureVerified,
    /// Plaintext recovered
    MessageDecrypted(String),
    /// Run finished successfully
    Completed,
    /// Run aborted
    Failed(PipelineFailure),
}

impl PipelineStage for DecodeStatus {
    const MAX_EVENTS: usize = 3;

    fn ordinal(&self) -> u8 {
        match self {
            DecodeStatus::Initial => 0,
            DecodeStatus::SignatureVerified => 1,
            DecodeStatus::MessageDecrypted(_) => 2,
            DecodeStatus::Completed | DecodeStatus::Failed(_) => u8::MAX,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, DecodeStatus::Completed | DecodeStatus::Failed(_))
    }
}

/// Sending half of a run's event channel
///
/// Drops any event that would move backwards, repeat a stage, or follow a
/// terminal event.
pub(crate) struct StatusEmitter<S> {
    tx: mpsc::Sender<S>,
    last: u8,
    finished: bool,
}

impl<S: PipelineStage + std::fmt::Debug> StatusEmitter<S> {
    pub(crate) async fn emit(&mut self, status: S) -> bool {
        if self.finished {
            tracing::warn!(?status, "Status emitted after terminal event, dropping");
            return false;
        }
        let ordinal = status.ordinal();
        if ordinal <= self.last {
            tracing::warn!(?status, last = self.last, "Out-of-order status, dropping");
            return false;
        }

        self.last = ordinal;
        self.finished = status.is_terminal();

        // A dropped subscriber is not a cancellation; the run carries on
        if self.tx.send(status).await.is_err() {
            tracing::debug!("Status subscriber gone, event discarded");
        }
        true
    }
}

/// Receiving half of a run's event channel
///
/// Yields each status once, in order, and ends after the terminal event.
/// Dropping it does not stop the run.
pub struct StatusStream<S> {
    rx: mpsc::Receiver<S>,
    current: S,
}

/// Create a linked emitter/stream pair
///
/// Capacity never drops below [`PipelineStage::MAX_EVENTS`], so a run can
/// always emit its whole sequence without waiting on the subscriber.
pub(crate) fn channel<S: Default + PipelineStage>(
    buffer: usize,
) -> (StatusEmitter<S>, StatusStream<S>) {
    let (tx, rx) = mpsc::channel(buffer.max(S::MAX_EVENTS));
    (
        StatusEmitter {
            tx,
            last: 0,
            finished: false,
        },
        StatusStream {
            rx,
            current: S::default(),
        },
    )
}

impl<S: Clone + Unpin + PipelineStage> StatusStream<S> {
    /// The most recently received status (`Initial` before any)
    pub fn current(&self) -> &S {
        &self.current
    }

    /// Wait for the next status; `None` once the run is over
    pub async fn next_status(&mut self) -> Option<S> {
        self.next().await
    }

    /// Drain every remaining status
    pub async fn collect_all(self) -> Vec<S> {
        self.collect().await
    }

    /// Drain the stream and return its terminal status
    ///
    /// `None` if the run ended without one (the task panicked).
    pub async fn terminal(mut self) -> Option<S> {
        while self.next().await.is_some() {}
        if self.current.is_terminal() {
            Some(self.current)
        } else {
            None
        }
    }
}

impl<S: Clone + Unpin> Stream for StatusStream<S> {
    type Item = S;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S>> {
        let this = self.get_mut();
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(status)) => {
                this.current = status.clone();
                Poll::Ready(Some(status))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emitter_enforces_forward_order() {
        let (mut emitter, stream) = channel::<DecodeStatus>(8);

        assert!(emitter.emit(DecodeStatus::SignatureVerified).await);
        assert!(!emitter.emit(DecodeStatus::SignatureVerified).await);
        assert!(emitter.emit(DecodeStatus::MessageDecrypted("hi".into())).await);
        assert!(!emitter.emit(DecodeStatus::SignatureVerified).await);
        assert!(emitter.emit(DecodeStatus::Completed).await);
        assert!(!emitter.emit(DecodeStatus::Failed(PipelineFailure::IntegrityCheckFailed)).await);
        drop(emitter);

        assert_eq!(
            stream.collect_all().await,
            vec![
                DecodeStatus::SignatureVerified,
                DecodeStatus::MessageDecrypted("hi".into()),
                DecodeStatus::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_initial_is_never_emitted() {
        let (mut emitter, stream) = channel::<EncodeStatus>(8);
        assert!(!emitter.emit(EncodeStatus::Initial).await);
        drop(emitter);
        assert!(stream.collect_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_stream_tracks_current() {
        let (mut emitter, mut stream) = channel::<EncodeStatus>(8);
        assert_eq!(*stream.current(), EncodeStatus::Initial);

        emitter.emit(EncodeStatus::KeyPairCreated).await;
        assert_eq!(stream.next_status().await, Some(EncodeStatus::KeyPairCreated));
        assert_eq!(*stream.current(), EncodeStatus::KeyPairCreated);

        emitter.emit(EncodeStatus::Completed).await;
        drop(emitter);
        assert_eq!(stream.terminal().await, Some(EncodeStatus::Completed));
    }

    #[tokio::test]
    async fn test_dropped_subscriber_does_not_fail_emit() {
        let (mut emitter, stream) = channel::<EncodeStatus>(1);
        drop(stream);

        assert!(emitter.emit(EncodeStatus::KeyPairCreated).await);
        assert!(emitter.emit(EncodeStatus::Completed).await);
    }

    #[tokio::test]
    async fn test_full_run_fits_without_a_reader() {
        let (mut emitter, stream) = channel::<EncodeStatus>(1);

        let message = EncryptedMessage::new(vec![1], vec![2]);
        let sequence = [
            EncodeStatus::KeyPairCreated,
            EncodeStatus::MessageEncrypted,
            EncodeStatus::MessageSigned(message),
            EncodeStatus::Completed,
        ];
        for status in sequence.clone() {
            let sent = tokio::time::timeout(std::time::Duration::from_secs(5), emitter.emit(status))
                .await
                .expect("emit must not wait on an idle subscriber");
            assert!(sent);
        }
        drop(emitter);

        assert_eq!(stream.collect_all().await, sequence.to_vec());
    }

    #[test]
    fn test_failure_cause() {
        let failure = PipelineFailure::Encryption(Error::PayloadTooLarge { len: 191, max: 190 });
        assert_eq!(failure.cause(), Some(&Error::PayloadTooLarge { len: 191, max: 190 }));
        assert!(PipelineFailure::IntegrityCheckFailed.cause().is_none());
        assert_eq!(
            PipelineFailure::Authentication("cancelled".into()).into_error(),
            Error::AuthenticationFailed("cancelled".into())
        );
    }
}
