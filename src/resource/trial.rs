//! Trial - one concrete configuration spawned from an experiment

use serde::{Deserialize, Serialize};

use super::{Objective, ObjectMeta};
use crate::collector::MetricsCollectorSpec;

/// One hyperparameter name bound to a concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterAssignment {
    /// Hyperparameter name
    pub name: String,
    /// Value, already formatted as text
    pub value: String,
}

impl ParameterAssignment {
    /// Create an assignment.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Fully rendered trial configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialSpec {
    /// Objective copied from the experiment
    pub objective: Objective,
    /// Assignments in suggestion order
    pub parameter_assignments: Vec<ParameterAssignment>,
    /// Rendered workload manifest
    pub run_spec: String,
    /// How this trial's metrics are collected
    pub metrics_collector: MetricsCollectorSpec,
    /// Keep the workload after completion
    pub retain_run: bool,
    /// Keep the collector after completion
    pub retain_metrics_collector: bool,
}

/// A single runnable configuration owned by an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// Object metadata
    pub metadata: ObjectMeta,
    /// Rendered configuration
    pub spec: TrialSpec,
}

impl Trial {
    /// Get the trial name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Get the trial namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    /// Get the name of the owning experiment, read from the controller reference.
    #[must_use]
    pub fn experiment_name(&self) -> Option<&str> {
        self.metadata
            .controller_reference()
            .map(|owner| owner.name.as_str())
    }
}
