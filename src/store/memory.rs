//! In-memory stores using `DashMap`.
//!
//! These mirror the semantics the reconciler relies on from a real cluster
//! store (create-only writes, optimistic concurrency, finalizer-gated
//! deletion) and support failure injection for tests. Data is lost on
//! process restart.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{HistoryStore, ObservationRecord, ResourceStore, StoreError};
use crate::resource::{Experiment, ObjectKey, Trial};

/// In-memory cluster object store.
///
/// Thread-safe; every method takes `&self`.
#[derive(Debug, Default)]
pub struct MemoryResourceStore {
    experiments: DashMap<ObjectKey, Experiment>,
    trials: DashMap<ObjectKey, Trial>,
    next_version: AtomicU64,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    fail_creates: AtomicBool,
    fail_updates: AtomicBool,
}

impl MemoryResourceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_version(&self) -> String {
        (self.next_version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    /// Store an experiment as if a user had applied it, assigning a uid,
    /// resource version and first generation. Returns the stored copy.
    pub fn insert_experiment(&self, mut experiment: Experiment) -> Experiment {
        let version = self.bump_version();
        if experiment.metadata.uid.is_empty() {
            experiment.metadata.uid = format!("uid-{version}");
        }
        experiment.metadata.resource_version = version;
        experiment.metadata.generation = experiment.metadata.generation.max(1);
        self.experiments
            .insert(experiment.metadata.key(), experiment.clone());
        experiment
    }

    /// Mark an experiment for deletion.
    ///
    /// With finalizers present the deletion timestamp is set and the object
    /// stays; without, it is removed at once. Returns the stored copy if it
    /// still exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the experiment does not exist.
    pub fn request_deletion(&self, key: &ObjectKey) -> Result<Option<Experiment>, StoreError> {
        let Entry::Occupied(mut entry) = self.experiments.entry(key.clone()) else {
            return Err(StoreError::NotFound(key.clone()));
        };
        if entry.get().metadata.finalizers.is_empty() {
            entry.remove();
            return Ok(None);
        }
        let version = self.bump_version();
        let stored = entry.get_mut();
        if stored.metadata.deletion_timestamp.is_none() {
            stored.metadata.deletion_timestamp = Some(Utc::now());
        }
        stored.metadata.resource_version = version;
        Ok(Some(stored.clone()))
    }

    /// Get an experiment by key.
    #[must_use]
    pub fn get_experiment(&self, key: &ObjectKey) -> Option<Experiment> {
        self.experiments.get(key).map(|e| e.value().clone())
    }

    /// Get a trial by key.
    #[must_use]
    pub fn get_trial(&self, key: &ObjectKey) -> Option<Trial> {
        self.trials.get(key).map(|t| t.value().clone())
    }

    /// All trials controlled by the named experiment, sorted by name.
    #[must_use]
    pub fn trials_for_experiment(&self, experiment: &ObjectKey) -> Vec<Trial> {
        let mut trials: Vec<Trial> = self
            .trials
            .iter()
            .filter(|t| {
                t.metadata.namespace == experiment.namespace
                    && t.experiment_name() == Some(experiment.name.as_str())
            })
            .map(|t| t.value().clone())
            .collect();
        trials.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        trials
    }

    /// Number of stored trials.
    #[must_use]
    pub fn trial_count(&self) -> usize {
        self.trials.len()
    }

    /// Number of `create_trial` calls, successful or not.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `update_experiment` calls, successful or not.
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent `create_trial` fail with `Unavailable`.
    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `update_experiment` fail with `Unavailable`.
    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

impl ResourceStore for MemoryResourceStore {
    fn create_trial(&self, trial: &Trial) -> Result<(), StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected create failure".to_string()));
        }

        let key = trial.metadata.key();
        match self.trials.entry(key.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(key)),
            Entry::Vacant(slot) => {
                let mut stored = trial.clone();
                stored.metadata.resource_version = self.bump_version();
                stored.metadata.uid = format!("uid-{}", stored.metadata.resource_version);
                stored.metadata.generation = 1;
                slot.insert(stored);
                Ok(())
            }
        }
    }

    fn update_experiment(&self, experiment: &Experiment) -> Result<Experiment, StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected update failure".to_string()));
        }

        let key = experiment.metadata.key();
        let Entry::Occupied(mut entry) = self.experiments.entry(key.clone()) else {
            return Err(StoreError::NotFound(key));
        };

        let current = entry.get();
        if current.metadata.resource_version != experiment.metadata.resource_version {
            return Err(StoreError::Conflict {
                key,
                expected: experiment.metadata.resource_version.clone(),
                actual: current.metadata.resource_version.clone(),
            });
        }

        let mut stored = experiment.clone();
        // Store-owned fields are never taken from the caller.
        stored.metadata.uid.clone_from(&current.metadata.uid);
        stored.metadata.deletion_timestamp = current.metadata.deletion_timestamp;
        stored.metadata.generation = if stored.spec == current.spec {
            current.metadata.generation
        } else {
            current.metadata.generation + 1
        };
        stored.metadata.resource_version = self.bump_version();

        if stored.metadata.is_being_deleted() && stored.metadata.finalizers.is_empty() {
            entry.remove();
        } else {
            entry.insert(stored.clone());
        }
        Ok(stored)
    }
}

/// In-memory observation database, partitioned by experiment.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    observations: DashMap<ObjectKey, Vec<ObservationRecord>>,
    purge_calls: AtomicUsize,
    fail_purges: AtomicBool,
}

impl MemoryHistoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation for an experiment.
    pub fn report(&self, experiment: &ObjectKey, record: ObservationRecord) {
        self.observations
            .entry(experiment.clone())
            .or_default()
            .push(record);
    }

    /// Number of observations held for an experiment.
    #[must_use]
    pub fn observation_count(&self, experiment: &ObjectKey) -> usize {
        self.observations.get(experiment).map_or(0, |o| o.len())
    }

    /// Number of `purge_experiment` calls, successful or not.
    #[must_use]
    pub fn purge_calls(&self) -> usize {
        self.purge_calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent `purge_experiment` fail with `Unavailable`.
    pub fn set_fail_purges(&self, fail: bool) {
        self.fail_purges.store(fail, Ordering::SeqCst);
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn purge_experiment(&self, experiment: &ObjectKey) -> Result<(), StoreError> {
        self.purge_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_purges.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected purge failure".to_string()));
        }
        self.observations.remove(experiment);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MetricsCollectorSpec;
    use crate::resource::{CollectorKind, ObjectMeta, Objective, TrialSpec};

    fn trial(name: &str) -> Trial {
        Trial {
            metadata: ObjectMeta::new("ns", name),
            spec: TrialSpec {
                objective: Objective::default(),
                parameter_assignments: Vec::new(),
                run_spec: String::new(),
                metrics_collector: MetricsCollectorSpec {
                    experiment_name: "exp1".to_string(),
                    trial_name: name.to_string(),
                    namespace: "ns".to_string(),
                    collector: CollectorKind::StdOut,
                    source: None,
                    filter: Vec::new(),
                    metric_names: Vec::new(),
                },
                retain_run: false,
                retain_metrics_collector: false,
            },
        }
    }

    #[test]
    fn test_create_trial_is_create_only() {
        let store = MemoryResourceStore::new();
        store.create_trial(&trial("exp1-a")).unwrap();
        let err = store.create_trial(&trial("exp1-a")).unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists(ObjectKey::new("ns", "exp1-a")));
        assert_eq!(store.trial_count(), 1);
        assert_eq!(store.create_calls(), 2);
    }

    #[test]
    fn test_update_detects_conflict() {
        let store = MemoryResourceStore::new();
        let stale = store.insert_experiment(Experiment::new("ns", "exp1"));
        store.update_experiment(&stale).unwrap();

        let err = store.update_experiment(&stale).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn test_finalizer_only_update_keeps_generation() {
        let store = MemoryResourceStore::new();
        let mut exp = store.insert_experiment(Experiment::new("ns", "exp1"));
        exp.metadata.finalizers.push("clean-data-in-db".to_string());

        let stored = store.update_experiment(&exp).unwrap();
        assert_eq!(stored.metadata.generation, exp.metadata.generation);
    }

    #[test]
    fn test_spec_update_bumps_generation() {
        let store = MemoryResourceStore::new();
        let mut exp = store.insert_experiment(Experiment::new("ns", "exp1"));
        exp.spec.objective.objective_metric_name = "loss".to_string();

        let stored = store.update_experiment(&exp).unwrap();
        assert_eq!(stored.metadata.generation, exp.metadata.generation + 1);
    }

    #[test]
    fn test_deletion_waits_for_finalizers() {
        let store = MemoryResourceStore::new();
        let mut exp = Experiment::new("ns", "exp1");
        exp.metadata.finalizers.push("clean-data-in-db".to_string());
        let key = store.insert_experiment(exp).metadata.key();

        let mut deleting = store.request_deletion(&key).unwrap().unwrap();
        assert!(deleting.metadata.is_being_deleted());

        deleting.metadata.finalizers.clear();
        store.update_experiment(&deleting).unwrap();
        assert!(store.get_experiment(&key).is_none());
    }

    #[test]
    fn test_history_purge() {
        let history = MemoryHistoryStore::new();
        let key = ObjectKey::new("ns", "exp1");
        let other = ObjectKey::new("ns", "exp2");
        history.report(&key, ObservationRecord::new("exp1-a", "loss", "0.9"));
        history.report(&key, ObservationRecord::new("exp1-a", "loss", "0.4"));
        history.report(&other, ObservationRecord::new("exp2-a", "loss", "0.7"));
        assert_eq!(history.observation_count(&key), 2);

        history.purge_experiment(&key).unwrap();
        assert_eq!(history.observation_count(&key), 0);
        assert_eq!(history.observation_count(&other), 1);
        // Purging again is not an error.
        history.purge_experiment(&key).unwrap();
    }
}
