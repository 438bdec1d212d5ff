//! Log subscriber setup for hosts that don't install their own.
//!
//! The crate only emits `tracing` events; nothing is printed until a
//! subscriber is installed. `RUST_LOG` always takes precedence over the
//! defaults below.

use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Filter used when `verbose` is set and `RUST_LOG` is absent
pub const VERBOSE_FILTER: &str = "info,cipherpost_core=debug";

/// Filter used otherwise
pub const DEFAULT_FILTER: &str = "info";

/// Install a global fmt subscriber
///
/// Fails with `Internal` if a global subscriber is already set.
pub fn init_logging(verbose: bool) -> Result<()> {
    let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to install log subscriber: {}", e)))
}
