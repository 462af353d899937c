//! External store boundaries
//!
//! The reconciler talks to two collaborators:
//!
//! - [`ResourceStore`]: the cluster object store (create trials, update
//!   experiments)
//! - [`HistoryStore`]: the database of historical observations, purged
//!   before an experiment's finalizer is released
//!
//! Every call is synchronous and either fully applied or not applied at all.
//! Retry and backoff belong to the caller.
//!
//! # Example
//!
//! ```rust
//! use trial_reconciler::resource::Experiment;
//! use trial_reconciler::store::{MemoryResourceStore, ResourceStore};
//!
//! let store = MemoryResourceStore::new();
//! let experiment = store.insert_experiment(Experiment::new("ns", "exp1"));
//! assert!(!experiment.metadata.uid.is_empty());
//!
//! let updated = store.update_experiment(&experiment)?;
//! assert_ne!(updated.metadata.resource_version, experiment.metadata.resource_version);
//! # Ok::<(), trial_reconciler::store::StoreError>(())
//! ```

mod memory;
mod observation;

pub use memory::{MemoryHistoryStore, MemoryResourceStore};
pub use observation::ObservationRecord;

use thiserror::Error;

use crate::resource::{Experiment, ObjectKey, Trial};

/// Store call failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Create-only write hit an existing object
    #[error("{0} already exists")]
    AlreadyExists(ObjectKey),

    /// Target object does not exist
    #[error("{0} not found")]
    NotFound(ObjectKey),

    /// Optimistic concurrency check failed
    #[error("{key} was modified concurrently (expected version {expected:?}, found {actual:?})")]
    Conflict {
        /// Object key
        key: ObjectKey,
        /// Version the caller held
        expected: String,
        /// Version in the store
        actual: String,
    },

    /// Store could not be reached or refused the call
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Cluster object store.
pub trait ResourceStore: Send + Sync {
    /// Persist a new trial. Never overwrites.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` on a name collision, or another
    /// `StoreError` if the write is rejected.
    fn create_trial(&self, trial: &Trial) -> Result<(), StoreError>;

    /// Replace an experiment's stored state, returning what was stored.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the experiment changed since it was
    /// read, or another `StoreError` if the write is rejected.
    fn update_experiment(&self, experiment: &Experiment) -> Result<Experiment, StoreError>;
}

/// Database of historical trial observations.
pub trait HistoryStore: Send + Sync {
    /// Delete every record belonging to an experiment. Purging an
    /// experiment with no records succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the records could not be deleted.
    fn purge_experiment(&self, experiment: &ObjectKey) -> Result<(), StoreError>;
}
