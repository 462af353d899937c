//! Finalizer-gated experiment teardown
//!
//! ## State machine
//!
//! ```text
//!   Active ──(deletion timestamp set by the store)──> DeletionRequested
//!                                                           │
//!                              purge history, drop finalizer│
//!                                                           v
//!                                                       Finalized
//! ```
//!
//! The `Active -> DeletionRequested` edge is driven from outside; this
//! module only reacts to it. The finalizer is released only after the
//! history purge succeeds. A failed purge leaves the finalizer in place and
//! the next reconciliation starts over.
//!
//! Finalizer edits do not bump an object's generation, so every successful
//! finalizer update asks the scheduler to requeue the experiment instead of
//! waiting for a generation-triggered event.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::ControllerConfig;
use crate::resource::Experiment;
use crate::store::{HistoryStore, ResourceStore};
use crate::{Error, Result};

/// Lifecycle state of an experiment with respect to one finalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizerState {
    /// No deletion requested.
    Active,
    /// Deletion requested, finalizer still present.
    DeletionRequested,
    /// Deletion requested and finalizer released.
    Finalized,
}

impl FinalizerState {
    /// Derive the state of `experiment` with respect to `finalizer`.
    #[must_use]
    pub fn of(experiment: &Experiment, finalizer: &str) -> Self {
        if !experiment.metadata.is_being_deleted() {
            Self::Active
        } else if experiment.metadata.has_finalizer(finalizer) {
            Self::DeletionRequested
        } else {
            Self::Finalized
        }
    }
}

impl fmt::Display for FinalizerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "active",
            Self::DeletionRequested => "deletion requested",
            Self::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// Outcome handed back to the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    /// Re-invoke reconciliation for this experiment promptly.
    pub requeue: bool,
}

impl ReconcileResult {
    /// Ask for another pass.
    #[must_use]
    pub const fn requeue() -> Self {
        Self { requeue: true }
    }

    /// Nothing further to do.
    #[must_use]
    pub const fn done() -> Self {
        Self { requeue: false }
    }
}

/// Installs and releases the history-purge finalizer on experiments.
pub struct FinalizerLifecycleManager {
    config: ControllerConfig,
    store: Arc<dyn ResourceStore>,
    history: Arc<dyn HistoryStore>,
}

impl fmt::Debug for FinalizerLifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinalizerLifecycleManager")
            .field("finalizer", &self.config.finalizer_name)
            .finish_non_exhaustive()
    }
}

impl FinalizerLifecycleManager {
    /// Create a manager.
    #[must_use]
    pub fn new(
        config: ControllerConfig,
        store: Arc<dyn ResourceStore>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            config,
            store,
            history,
        }
    }

    /// Name of the finalizer this manager owns.
    #[must_use]
    pub fn finalizer_name(&self) -> &str {
        &self.config.finalizer_name
    }

    /// Current state of `experiment` with respect to the managed finalizer.
    #[must_use]
    pub fn state(&self, experiment: &Experiment) -> FinalizerState {
        FinalizerState::of(experiment, &self.config.finalizer_name)
    }

    /// Set the experiment's finalizers to `target`, purging history first
    /// when deletion has been requested.
    ///
    /// Covers both install (no deletion timestamp) and teardown (deletion
    /// timestamp set). On success `experiment` carries the stored metadata.
    ///
    /// # Errors
    ///
    /// Returns `Error::Persistence` if the purge or the update fails. The
    /// experiment's finalizers are unchanged in either case.
    pub fn reconcile_finalizers(
        &self,
        experiment: &mut Experiment,
        target: Vec<String>,
    ) -> Result<ReconcileResult> {
        if experiment.metadata.is_being_deleted() {
            self.purge_history(experiment)?;
        }
        self.persist_finalizers(experiment, target)
    }

    /// Add the managed finalizer to an active experiment.
    ///
    /// Returns `requeue: false` without touching the store when the
    /// finalizer is already present.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if deletion has been requested, or
    /// `Error::Persistence` if the update fails.
    pub fn install_finalizers(&self, experiment: &mut Experiment) -> Result<ReconcileResult> {
        let state = self.state(experiment);
        if state != FinalizerState::Active {
            return Err(Error::InvalidState {
                experiment: experiment.metadata.key().to_string(),
                state: state.to_string(),
                reason: "finalizers cannot be added once deletion is requested".to_string(),
            });
        }
        if experiment.metadata.has_finalizer(&self.config.finalizer_name) {
            return Ok(ReconcileResult::done());
        }

        let mut target = experiment.metadata.finalizers.clone();
        target.push(self.config.finalizer_name.clone());
        self.persist_finalizers(experiment, target)
    }

    /// Purge the experiment's history and release the managed finalizer.
    ///
    /// Other finalizers are kept in order. An experiment whose managed
    /// finalizer is already gone returns `requeue: false`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` if deletion has not been requested, or
    /// `Error::Persistence` if the purge or update fails; the finalizer is
    /// kept in both failure cases.
    pub fn teardown_and_remove_finalizers(
        &self,
        experiment: &mut Experiment,
    ) -> Result<ReconcileResult> {
        match self.state(experiment) {
            FinalizerState::Active => Err(Error::InvalidState {
                experiment: experiment.metadata.key().to_string(),
                state: FinalizerState::Active.to_string(),
                reason: "teardown requires a deletion request".to_string(),
            }),
            FinalizerState::Finalized => Ok(ReconcileResult::done()),
            FinalizerState::DeletionRequested => {
                self.purge_history(experiment)?;
                let target = experiment
                    .metadata
                    .finalizers
                    .iter()
                    .filter(|f| **f != self.config.finalizer_name)
                    .cloned()
                    .collect();
                self.persist_finalizers(experiment, target)
            }
        }
    }

    fn purge_history(&self, experiment: &Experiment) -> Result<()> {
        let key = experiment.metadata.key();
        self.history.purge_experiment(&key).map_err(|source| {
            error!(experiment = %key, error = %source, "fail to delete data in history store");
            Error::Persistence {
                operation: "purge history",
                object: key.to_string(),
                source,
            }
        })?;
        info!(experiment = %key, "purged experiment history");
        Ok(())
    }

    fn persist_finalizers(
        &self,
        experiment: &mut Experiment,
        target: Vec<String>,
    ) -> Result<ReconcileResult> {
        let key = experiment.metadata.key();
        let previous = std::mem::replace(&mut experiment.metadata.finalizers, target);

        match self.store.update_experiment(experiment) {
            Ok(stored) => {
                info!(
                    experiment = %key,
                    finalizers = ?stored.metadata.finalizers,
                    "updated finalizers"
                );
                experiment.metadata = stored.metadata;
                Ok(ReconcileResult::requeue())
            }
            Err(source) => {
                error!(experiment = %key, error = %source, "fail to update finalizers");
                experiment.metadata.finalizers = previous;
                Err(Error::Persistence {
                    operation: "update experiment",
                    object: key.to_string(),
                    source,
                })
            }
        }
    }
}
