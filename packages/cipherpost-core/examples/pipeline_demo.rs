//! # Pipeline Demo
//!
//! This example walks one message through the full lifecycle:
//! 1. Encode a message and watch its status events
//! 2. Hand the pending message to a (pretend) transport
//! 3. Receive and decode it behind device authentication
//! 4. Show what tampering looks like
//!
//! ## Run
//!
//! ```bash
//! cargo run --example pipeline_demo
//! RUST_LOG=cipherpost_core=debug cargo run --example pipeline_demo
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use cipherpost_core::{
    init_logging, AuthOutcome, Authenticator, CoreConfig, CoreContext, DecodeStatus,
    EncryptedMessage, MemoryPreferences,
};

/// Stands in for a biometric prompt
struct ConsoleAuthenticator;

#[async_trait]
impl Authenticator for ConsoleAuthenticator {
    async fn authenticate(&self, reason: &str) -> AuthOutcome {
        println!("   [auth] \"{}\" -> approved", reason);
        AuthOutcome::Success
    }
}

#[tokio::main]
async fn main() {
    let config = CoreConfig {
        stage_delay_ms: 200,
        ..CoreConfig::default()
    };
    init_logging(config.verbose_logging).expect("Failed to install logger");

    println!("=================================================");
    println!("          CIPHERPOST PIPELINE DEMO");
    println!("=================================================\n");

    let context = CoreContext::open(
        config,
        Arc::new(ConsoleAuthenticator),
        Arc::new(MemoryPreferences::new(true)),
    )
    .expect("Failed to open context");

    // =========================================================================
    // STEP 1: Encode
    // =========================================================================
    println!("1. Encoding \"hello\"...\n");

    let mut events = context.encode("hello");
    while let Some(status) = events.next_status().await {
        println!("   {:?}", status);
    }
    println!();

    // =========================================================================
    // STEP 2: Send
    // =========================================================================
    println!("2. Handing the pending message to the transport...\n");

    let payload = context.send_pending().expect("No pending message");
    let message = EncryptedMessage::from_payload(&payload).expect("Malformed payload");
    println!("   Ciphertext: {} bytes", message.ciphertext.len());
    println!("   Signature:  {} bytes", message.signature.len());
    println!("   JSON form:  {}...", &message.to_json().expect("JSON")[..64]);
    println!("   Mailbox empty: {}", context.mailbox().is_empty());
    println!();

    // =========================================================================
    // STEP 3: Receive
    // =========================================================================
    println!("3. Receiving and decoding...\n");

    let events = context
        .receive(&payload)
        .expect("Malformed payload")
        .collect_all()
        .await;
    for status in &events {
        println!("   {:?}", status);
    }
    println!();

    // =========================================================================
    // STEP 4: Tamper
    // =========================================================================
    println!("4. Flipping one ciphertext bit and decoding again...\n");

    let mut tampered = message.clone();
    tampered.ciphertext[0] ^= 0x01;
    match context.decode(tampered).terminal().await {
        Some(DecodeStatus::Failed(failure)) => println!("   Rejected: {}", failure),
        other => println!("   Unexpected: {:?}", other),
    }

    println!("\n=================================================");
    println!("          DEMO COMPLETE");
    println!("=================================================");
}
