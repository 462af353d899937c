//! Error types for the trial reconciler
//!
//! Every variant names the experiment (and trial, where one exists) it
//! concerns, so the surrounding scheduler can log and requeue without
//! re-deriving context. Nothing in this crate retries on its own.

use thiserror::Error;

use crate::collector::ConfigError;
use crate::owner::LinkError;
use crate::store::StoreError;
use crate::template::RenderError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trial reconciler error types
#[derive(Error, Debug)]
pub enum Error {
    /// Trial template could not be rendered
    #[error("failed to render trial template for trial {trial} (experiment {experiment}): {source}")]
    Render {
        /// Experiment key (`namespace/name`)
        experiment: String,
        /// Trial name
        trial: String,
        /// Underlying render failure
        #[source]
        source: RenderError,
    },

    /// Rendered manifest is missing or structurally invalid
    #[error("invalid trial template for trial {trial} (experiment {experiment}): {reason}")]
    Validation {
        /// Experiment key (`namespace/name`)
        experiment: String,
        /// Trial name
        trial: String,
        /// What made the manifest unusable
        reason: String,
    },

    /// Ownership linkage from trial to experiment failed
    #[error("failed to set controller reference on trial {trial} (experiment {experiment}): {source}")]
    Reference {
        /// Experiment key (`namespace/name`)
        experiment: String,
        /// Trial name
        trial: String,
        /// Underlying linkage failure
        #[source]
        source: LinkError,
    },

    /// Metrics collector configuration is incompatible or incomplete
    #[error("metrics collector configuration rejected for trial {trial} (experiment {experiment}): {source}")]
    Configuration {
        /// Experiment key (`namespace/name`)
        experiment: String,
        /// Trial name
        trial: String,
        /// Underlying collector configuration failure
        #[source]
        source: ConfigError,
    },

    /// Create, update or purge against an external store failed
    #[error("{operation} failed for {object}: {source}")]
    Persistence {
        /// Operation that failed (`create trial`, `update experiment`, `purge history`)
        operation: &'static str,
        /// Object key the operation targeted
        object: String,
        /// Underlying store failure
        #[source]
        source: StoreError,
    },

    /// Operation invoked in a lifecycle state that does not permit it
    #[error("experiment {experiment} is {state}: {reason}")]
    InvalidState {
        /// Experiment key (`namespace/name`)
        experiment: String,
        /// Observed lifecycle state
        state: String,
        /// Why the operation was refused
        reason: String,
    },

    /// Controller configuration could not be loaded or is inconsistent
    #[error("controller configuration error: {0}")]
    Config(String),

    /// Tracing subscriber could not be installed
    #[error("logging initialisation failed: {0}")]
    Logging(String),
}

impl Error {
    /// Whether this error came from an external store call.
    ///
    /// The scheduler typically retries these with backoff while treating
    /// render, validation and configuration errors as permanent until the
    /// experiment spec changes.
    #[must_use]
    pub const fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}
