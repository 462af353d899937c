//! Experiment - root resource of a hyperparameter search

use serde::{Deserialize, Serialize};

use super::{ObjectMeta, TypeMeta, API_VERSION};

/// Direction of optimization for the objective metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveType {
    /// Larger objective values are better.
    #[default]
    Maximize,
    /// Smaller objective values are better.
    Minimize,
}

/// What a search optimizes and which extra metrics it records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    /// Optimization direction
    #[serde(rename = "type", default)]
    pub objective_type: ObjectiveType,
    /// Early-stop goal, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<f64>,
    /// Primary metric name
    pub objective_metric_name: String,
    /// Extra metrics to collect, in declared order
    #[serde(default)]
    pub additional_metric_names: Vec<String>,
}

impl Objective {
    /// Create an objective over a single metric.
    #[must_use]
    pub fn new(objective_type: ObjectiveType, objective_metric_name: impl Into<String>) -> Self {
        Self {
            objective_type,
            goal: None,
            objective_metric_name: objective_metric_name.into(),
            additional_metric_names: Vec::new(),
        }
    }

    /// Append an additional metric name.
    #[must_use]
    pub fn with_additional_metric(mut self, name: impl Into<String>) -> Self {
        self.additional_metric_names.push(name.into());
        self
    }

    /// All metric names a trial reports: the objective metric followed by
    /// the additional metrics. Order and duplicates are kept as declared.
    #[must_use]
    pub fn metric_names(&self) -> Vec<String> {
        std::iter::once(&self.objective_metric_name)
            .chain(&self.additional_metric_names)
            .cloned()
            .collect()
    }
}

/// Parameterized workload manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialTemplate {
    /// Template text with `{{ name }}` placeholders
    #[serde(rename = "goTemplate", alias = "template")]
    pub template: String,
    /// Keep the workload after the trial completes
    #[serde(default)]
    pub retain: bool,
}

impl TrialTemplate {
    /// Create a non-retained template.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            retain: false,
        }
    }
}

/// How trial metrics are scraped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CollectorKind {
    /// Parse metric lines from the workload's stdout.
    #[default]
    StdOut,
    /// Parse metric lines from a file the workload writes.
    File,
    /// Read TensorFlow event files from a directory.
    TensorFlowEvent,
    /// Scrape a Prometheus endpoint.
    PrometheusMetric,
    /// User-supplied collector container.
    Custom,
    /// Explicitly disable collection.
    None,
}

impl CollectorKind {
    /// Get the kind name as written in manifests.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StdOut => "StdOut",
            Self::File => "File",
            Self::TensorFlowEvent => "TensorFlowEvent",
            Self::PrometheusMetric => "PrometheusMetric",
            Self::Custom => "Custom",
            Self::None => "None",
        }
    }
}

/// Whether a filesystem source is a single file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileSystemKind {
    /// A single file
    File,
    /// A directory
    Directory,
}

/// Where a collector reads metrics from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceSpec {
    /// Path inside the workload's filesystem
    FileSystemPath {
        /// Absolute path
        path: String,
        /// File or directory
        kind: FileSystemKind,
    },
    /// HTTP endpoint exposed by the workload
    HttpGet {
        /// Port number
        port: u16,
        /// Request path
        path: String,
    },
}

/// Experiment-level collector override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsCollectorConfig {
    /// Collector kind
    pub collector: CollectorKind,
    /// Explicit source; derived from the kind when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceSpec>,
    /// Metric line formats (regexes) the collector should match
    pub filter: Vec<String>,
    /// Restrict collection to these metrics; empty means all of them
    pub metric_names: Vec<String>,
    /// Keep the collector after the trial completes
    pub retain: bool,
}

impl MetricsCollectorConfig {
    /// Create a config for a collector kind with no overrides.
    #[must_use]
    pub fn new(collector: CollectorKind) -> Self {
        Self {
            collector,
            ..Self::default()
        }
    }

    /// Set an explicit source.
    #[must_use]
    pub fn with_source(mut self, source: SourceSpec) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the retain flag.
    #[must_use]
    pub const fn retained(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }
}

/// Desired state of an experiment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentSpec {
    /// Objective shared by all trials
    pub objective: Objective,
    /// Workload template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_template: Option<TrialTemplate>,
    /// Collector override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_collector_spec: Option<MetricsCollectorConfig>,
}

/// A hyperparameter-search job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Object metadata
    pub metadata: ObjectMeta,
    /// Desired state
    pub spec: ExperimentSpec,
}

impl Experiment {
    /// Kind name.
    pub const KIND: &'static str = "Experiment";

    /// Create an experiment with empty spec.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            spec: ExperimentSpec::default(),
        }
    }

    /// Type descriptor used when linking children to this experiment.
    #[must_use]
    pub fn type_meta() -> TypeMeta {
        TypeMeta::new(API_VERSION, Self::KIND)
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Get the experiment namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_order_and_duplicates() {
        let objective = Objective::new(ObjectiveType::Maximize, "accuracy")
            .with_additional_metric("loss")
            .with_additional_metric("accuracy");

        assert_eq!(objective.metric_names(), vec!["accuracy", "loss", "accuracy"]);
    }

    #[test]
    fn test_experiment_spec_deserialization() {
        let spec: ExperimentSpec = serde_json::from_value(serde_json::json!({
            "objective": {
                "type": "minimize",
                "objectiveMetricName": "loss",
                "additionalMetricNames": ["accuracy"]
            },
            "trialTemplate": { "goTemplate": "kind: Job", "retain": true },
            "metricsCollectorSpec": {
                "collector": "File",
                "source": { "fileSystemPath": { "path": "/m.log", "kind": "File" } }
            }
        }))
        .unwrap();

        assert_eq!(spec.objective.objective_type, ObjectiveType::Minimize);
        assert!(spec.trial_template.as_ref().is_some_and(|t| t.retain));
        let collector = spec.metrics_collector_spec.unwrap();
        assert_eq!(collector.collector, CollectorKind::File);
        assert!(!collector.retain);
        assert!(matches!(
            collector.source,
            Some(SourceSpec::FileSystemPath { kind: FileSystemKind::File, .. })
        ));
    }
}
