//! Trial instantiation
//!
//! Turns an experiment plus one set of suggested parameter assignments into
//! a fully wired `Trial` and persists it with a single create-only call.
//! The trial is assembled completely in memory first; any failure along the
//! way returns before the store is touched.
//!
//! ```text
//! name ─> owner link ─> objective ─> assignments ─> render ─> decode kind
//!      ─> metric names ─> collector spec ─> retain flags ─> create
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, error, info};

use crate::collector::MetricsCollectorSpecBuilder;
use crate::config::ControllerConfig;
use crate::naming::{self, RandomSuffix, SuffixSource};
use crate::owner::{ControllerReferenceLinker, OwnerLinker};
use crate::resource::{Experiment, ObjectMeta, ParameterAssignment, Trial, TrialSpec};
use crate::store::ResourceStore;
use crate::template::{self, TemplateContext};
use crate::{Error, Result};

/// Creates trials for experiments.
///
/// Holds no per-experiment state, so one factory can serve any number of
/// concurrent reconciliations.
pub struct TrialFactory {
    config: ControllerConfig,
    store: Arc<dyn ResourceStore>,
    linker: Arc<dyn OwnerLinker>,
    suffixes: Arc<dyn SuffixSource>,
}

impl std::fmt::Debug for TrialFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrialFactory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TrialFactory {
    /// Create a factory with the controller-reference linker and
    /// thread-local random suffixes.
    #[must_use]
    pub fn new(config: ControllerConfig, store: Arc<dyn ResourceStore>) -> Self {
        Self {
            config,
            store,
            linker: Arc::new(ControllerReferenceLinker),
            suffixes: Arc::new(RandomSuffix),
        }
    }

    /// Replace the ownership linker.
    #[must_use]
    pub fn with_linker(mut self, linker: Arc<dyn OwnerLinker>) -> Self {
        self.linker = linker;
        self
    }

    /// Replace the suffix source.
    #[must_use]
    pub fn with_suffix_source(mut self, suffixes: Arc<dyn SuffixSource>) -> Self {
        self.suffixes = suffixes;
        self
    }

    /// Get the controller configuration.
    #[must_use]
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Assemble and persist one trial.
    ///
    /// # Errors
    ///
    /// - `Error::Reference` if the owner reference cannot be set
    /// - `Error::Validation` if the experiment has no template or the rendered
    ///   manifest does not decode to an object with a `kind`
    /// - `Error::Render` if a placeholder cannot be resolved
    /// - `Error::Configuration` if the collector spec is rejected
    /// - `Error::Persistence` if the create call fails
    ///
    /// The store is called once, after the trial is fully assembled, so no
    /// failure leaves a partial trial behind.
    pub fn create_trial(
        &self,
        experiment: &Experiment,
        assignments: &[ParameterAssignment],
    ) -> Result<Trial> {
        let trial = self.assemble(experiment, assignments)?;
        let experiment_key = experiment.metadata.key();

        if let Err(source) = self.store.create_trial(&trial) {
            error!(
                experiment = %experiment_key,
                trial = %trial.metadata.name,
                error = %source,
                "trial create error"
            );
            return Err(Error::Persistence {
                operation: "create trial",
                object: trial.metadata.key().to_string(),
                source,
            });
        }

        info!(
            experiment = %experiment_key,
            trial = %trial.metadata.name,
            assignments = trial.spec.parameter_assignments.len(),
            "created trial"
        );
        Ok(trial)
    }

    /// Create one trial per assignment set, in order, stopping at the first
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns the first error `create_trial` produces. Trials created
    /// before it stay persisted.
    pub fn create_trials(
        &self,
        experiment: &Experiment,
        suggestions: &[Vec<ParameterAssignment>],
    ) -> Result<Vec<Trial>> {
        suggestions
            .iter()
            .map(|assignments| self.create_trial(experiment, assignments))
            .collect()
    }

    /// Build the trial in memory without persisting it.
    ///
    /// # Errors
    ///
    /// Same as `create_trial`, minus `Error::Persistence`.
    pub fn assemble(
        &self,
        experiment: &Experiment,
        assignments: &[ParameterAssignment],
    ) -> Result<Trial> {
        let experiment_key = experiment.metadata.key();
        let experiment_name = experiment.name();
        let namespace = experiment.namespace();

        let suffix = self.suffixes.next_suffix(self.config.suffix_len);
        let trial_name = naming::trial_name(experiment_name, &suffix);

        let mut metadata = ObjectMeta::new(namespace, trial_name.clone());
        metadata.labels = BTreeMap::from([(
            self.config.experiment_label_key.clone(),
            experiment_name.to_string(),
        )]);

        self.linker
            .link(&Experiment::type_meta(), &experiment.metadata, &mut metadata)
            .map_err(|source| {
                error!(experiment = %experiment_key, trial = %trial_name, error = %source, "set controller reference error");
                Error::Reference {
                    experiment: experiment_key.to_string(),
                    trial: trial_name.clone(),
                    source,
                }
            })?;

        let objective = experiment.spec.objective.clone();
        let parameter_assignments = assignments.to_vec();

        let trial_template =
            experiment
                .spec
                .trial_template
                .as_ref()
                .ok_or_else(|| Error::Validation {
                    experiment: experiment_key.to_string(),
                    trial: trial_name.clone(),
                    reason: "experiment has no trial template".to_string(),
                })?;

        let context = TemplateContext::new(&parameter_assignments).with_identity(
            experiment_name,
            &trial_name,
            namespace,
        );
        let run_spec = template::render_with(&trial_template.template, &context).map_err(
            |source| {
                error!(experiment = %experiment_key, trial = %trial_name, error = %source, "fail to render run spec");
                Error::Render {
                    experiment: experiment_key.to_string(),
                    trial: trial_name.clone(),
                    source,
                }
            },
        )?;

        let workload_kind = decode_workload_kind(&run_spec).map_err(|reason| Error::Validation {
            experiment: experiment_key.to_string(),
            trial: trial_name.clone(),
            reason,
        })?;
        debug!(experiment = %experiment_key, trial = %trial_name, kind = %workload_kind, "decoded run spec");

        let metric_names = objective.metric_names();
        let collector_config = experiment.spec.metrics_collector_spec.as_ref();
        let metrics_collector = MetricsCollectorSpecBuilder::new(&self.config)
            .build(
                experiment_name,
                &trial_name,
                &workload_kind,
                namespace,
                &metric_names,
                collector_config,
            )
            .map_err(|source| {
                error!(experiment = %experiment_key, trial = %trial_name, error = %source, "error getting metrics collector spec");
                Error::Configuration {
                    experiment: experiment_key.to_string(),
                    trial: trial_name.clone(),
                    source,
                }
            })?;

        Ok(Trial {
            metadata,
            spec: TrialSpec {
                objective,
                parameter_assignments,
                run_spec,
                metrics_collector,
                retain_run: trial_template.retain,
                retain_metrics_collector: collector_config.is_some_and(|c| c.retain),
            },
        })
    }
}

/// Decode a YAML or JSON manifest and return its `kind`.
///
/// Only the first document of a multi-document stream is read.
fn decode_workload_kind(run_spec: &str) -> std::result::Result<String, String> {
    let document = serde_yaml::Deserializer::from_str(run_spec)
        .next()
        .ok_or_else(|| "manifest is empty".to_string())?;
    let manifest = serde_yaml::Value::deserialize(document)
        .map_err(|e| format!("manifest does not decode: {e}"))?;
    if !manifest.is_mapping() {
        return Err("manifest is not an object".to_string());
    }
    match manifest.get("kind").and_then(serde_yaml::Value::as_str) {
        Some(kind) if !kind.trim().is_empty() => Ok(kind.to_string()),
        _ => Err("manifest has no kind".to_string()),
    }
}
