//! Tracing subscriber setup
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the embedding controller. `init` is the one-line version of that.

use tracing_subscriber::EnvFilter;

use crate::{Error, Result};

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter` when it is set.
///
/// # Errors
///
/// Returns `Error::Logging` if the filter does not parse or a global
/// subscriber is already installed.
pub fn init(default_filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| Error::Logging(format!("invalid filter {default_filter:?}: {e}")))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}
