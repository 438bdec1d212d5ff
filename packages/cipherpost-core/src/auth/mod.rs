//! # Authentication Gate
//!
//! Gates the decode path behind a device-level authentication check.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         AUTH GATE                                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  AuthGate::verify()                                                    │
//! │        │                                                               │
//! │        ▼                                                               │
//! │  preferences.requires_authentication()?                                │
//! │        │                                                               │
//! │        ├── no  ──► Success (authenticator never invoked)              │
//! │        │                                                               │
//! │        └── yes ──► authenticator.authenticate(reason)                 │
//! │                          │                                             │
//! │                          ├── Success          ──► Success             │
//! │                          └── Failure(reason)  ──► Failure(reason)     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This is an access policy, not part of the cryptographic guarantee: the
//! signature check runs whether or not authentication is enabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Prompt text handed to the authenticator when none is configured
pub const DEFAULT_AUTH_REASON: &str = "Authenticate to read your message";

/// Result of an authentication attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Access granted
    Success,
    /// Access refused, with a human-readable reason
    Failure(String),
}

impl AuthOutcome {
    /// Whether access was granted
    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success)
    }

    /// Convert into a `Result`, mapping a refusal to `AuthenticationFailed`
    pub fn into_result(self) -> Result<()> {
        match self {
            AuthOutcome::Success => Ok(()),
            AuthOutcome::Failure(reason) => Err(Error::AuthenticationFailed(reason)),
        }
    }
}

/// Device-level authenticator (biometrics / passcode), supplied by the host
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Prompt the user; `reason` is shown in the system prompt
    async fn authenticate(&self, reason: &str) -> AuthOutcome;
}

/// Source of the user's "require authentication" preference
///
/// Persisting the preference is the host's concern.
pub trait AuthPreferences: Send + Sync {
    /// Whether decode must be gated behind authentication
    fn requires_authentication(&self) -> bool;
}

/// Preference held in memory
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    required: AtomicBool,
}

impl MemoryPreferences {
    /// Create with an initial value
    pub fn new(required: bool) -> Self {
        Self {
            required: AtomicBool::new(required),
        }
    }

    /// Change the preference
    pub fn set_required(&self, required: bool) {
        self.required.store(required, Ordering::SeqCst);
    }
}

impl AuthPreferences for MemoryPreferences {
    fn requires_authentication(&self) -> bool {
        self.required.load(Ordering::SeqCst)
    }
}

/// Policy gate in front of the decode path
pub struct AuthGate {
    authenticator: Arc<dyn Authenticator>,
    preferences: Arc<dyn AuthPreferences>,
    reason: String,
}

impl AuthGate {
    /// Create a gate using the default prompt text
    pub fn new(authenticator: Arc<dyn Authenticator>, preferences: Arc<dyn AuthPreferences>) -> Self {
        Self::with_reason(authenticator, preferences, DEFAULT_AUTH_REASON)
    }

    /// Create a gate with custom prompt text
    pub fn with_reason(
        authenticator: Arc<dyn Authenticator>,
        preferences: Arc<dyn AuthPreferences>,
        reason: &str,
    ) -> Self {
        Self {
            authenticator,
            preferences,
            reason: reason.to_string(),
        }
    }

    /// Run the check
    ///
    /// Short-circuits to `Success` when the preference is disabled, without
    /// invoking the authenticator. Otherwise the authenticator's outcome is
    /// returned as-is. No retry is attempted.
    pub async fn verify(&self) -> AuthOutcome {
        if !self.preferences.requires_authentication() {
            tracing::debug!("Authentication not required, skipping prompt");
            return AuthOutcome::Success;
        }

        let outcome = self.authenticator.authenticate(&self.reason).await;
        match &outcome {
            AuthOutcome::Success => tracing::debug!("Device authentication succeeded"),
            AuthOutcome::Failure(reason) => {
                tracing::warn!(%reason, "Device authentication failed")
            }
        }
        outcome
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Authenticator that returns a fixed outcome and counts its calls
    pub(crate) struct ScriptedAuthenticator {
        outcome: AuthOutcome,
        pub(crate) calls: AtomicUsize,
    }

    impl ScriptedAuthenticator {
        pub(crate) fn succeeding() -> Arc<Self> {
            Arc::new(Self {
                outcome: AuthOutcome::Success,
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn failing(reason: &str) -> Arc<Self> {
            Arc::new(Self {
                outcome: AuthOutcome::Failure(reason.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Authenticator for ScriptedAuthenticator {
        async fn authenticate(&self, _reason: &str) -> AuthOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    #[tokio::test]
    async fn test_disabled_preference_bypasses_authenticator() {
        let authenticator = ScriptedAuthenticator::failing("should not be asked");
        let gate = AuthGate::new(authenticator.clone(), Arc::new(MemoryPreferences::new(false)));

        assert_eq!(gate.verify().await, AuthOutcome::Success);
        assert_eq!(authenticator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_enabled_preference_maps_outcome() {
        let ok = ScriptedAuthenticator::succeeding();
        let gate = AuthGate::new(ok.clone(), Arc::new(MemoryPreferences::new(true)));
        assert!(gate.verify().await.is_success());
        assert_eq!(ok.call_count(), 1);

        let refused = ScriptedAuthenticator::failing("User cancelled");
        let gate = AuthGate::new(refused.clone(), Arc::new(MemoryPreferences::new(true)));
        assert_eq!(gate.verify().await, AuthOutcome::Failure("User cancelled".into()));
        assert_eq!(refused.call_count(), 1);
    }

    #[tokio::test]
    async fn test_preference_is_read_on_every_check() {
        let authenticator = ScriptedAuthenticator::succeeding();
        let preferences = Arc::new(MemoryPreferences::new(false));
        let gate = AuthGate::new(authenticator.clone(), preferences.clone());

        gate.verify().await;
        preferences.set_required(true);
        gate.verify().await;

        assert_eq!(authenticator.call_count(), 1);
    }

    #[test]
    fn test_outcome_into_result() {
        assert!(AuthOutcome::Success.into_result().is_ok());
        assert_eq!(
            AuthOutcome::Failure("locked out".into()).into_result(),
            Err(Error::AuthenticationFailed("locked out".into()))
        );
    }
}
