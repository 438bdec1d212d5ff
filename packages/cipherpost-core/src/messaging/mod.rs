//! # Messaging Module
//!
//! Single-message encode/decode pipeline and its transport handoff.
//!
//! ## Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MESSAGE LIFECYCLE                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Sender side                                                           │
//! │  ─────────────────────────────────────────────────────────────         │
//! │                                                                         │
//! │  pipeline.encode("hello")                                              │
//! │     │                                                                   │
//! │     ├──► StatusStream<EncodeStatus>  (observed by the caller)          │
//! │     ├──► KeyStore  (encryption private + signing public)               │
//! │     └──► MessageMailbox  (EncryptedMessage, last writer wins)          │
//! │                                                                         │
//! │  mailbox.take() ──► to_payload() ──► transport                         │
//! │                                                                         │
//! │  Receiver side                                                         │
//! │  ─────────────────────────────────────────────────────────────         │
//! │                                                                         │
//! │  transport ──► from_payload() ──► pipeline.decode(msg)                 │
//! │     │                                                                   │
//! │     └──► StatusStream<DecodeStatus>  (plaintext on success)            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each run owns its stream. Streams from different runs never interleave,
//! and the same run's events are delivered in order.

mod mailbox;
mod message;
mod pipeline;
mod status;

pub use mailbox::MessageMailbox;
pub use message::{EncryptedMessage, PAYLOAD_CIPHERTEXT_KEY, PAYLOAD_SIGNATURE_KEY};
pub use pipeline::{MessagePipeline, PipelineConfig, PipelineParts, DEFAULT_EVENT_BUFFER};
pub use status::{DecodeStatus, EncodeStatus, PipelineFailure, PipelineStage, StatusStream};
