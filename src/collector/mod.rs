//! Metrics collector spec construction
//!
//! Derives how a trial's metrics are collected from the experiment's
//! objective and its optional collector override. The builder never
//! silently disables collection: an absent override yields the default
//! collector over every declared metric, and `CollectorKind::None` is only
//! produced when the experiment asks for it.
//!
//! ## Precedence
//!
//! An explicit `source` in the override decides *where* metrics are read.
//! *Which* metrics are read always comes from the objective, optionally
//! narrowed by the override's `metric_names`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ControllerConfig;
use crate::resource::{CollectorKind, FileSystemKind, MetricsCollectorConfig, SourceSpec};

/// Workload kinds that emit TensorFlow event files the collector understands.
const TF_EVENT_WORKLOADS: &[&str] = &["Job", "TFJob"];

/// Collector configuration failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No collector is available for the workload kind at all
    #[error("workload kind {workload_kind:?} is not supported (supported: {supported:?})")]
    UnsupportedWorkload {
        /// Declared workload kind
        workload_kind: String,
        /// Kinds the controller accepts
        supported: Vec<String>,
    },

    /// Collector kind cannot observe this workload kind
    #[error("collector {collector} cannot observe workload kind {workload_kind:?}")]
    IncompatibleWorkload {
        /// Requested collector
        collector: &'static str,
        /// Declared workload kind
        workload_kind: String,
    },

    /// Source descriptor does not fit the collector kind
    #[error("collector {collector} cannot read from {source_kind} source")]
    IncompatibleSource {
        /// Requested collector
        collector: &'static str,
        /// Kind of source supplied
        source_kind: &'static str,
    },

    /// Collector kind needs an explicit source and none was given
    #[error("collector {collector} requires an explicit source")]
    MissingSource {
        /// Requested collector
        collector: &'static str,
    },

    /// Override names a metric the objective does not declare
    #[error("metric {metric:?} is not declared by the objective (declared: {declared:?})")]
    UnknownMetric {
        /// Offending metric name
        metric: String,
        /// Objective metrics, in order
        declared: Vec<String>,
    },
}

/// Resolved collection settings attached to a trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsCollectorSpec {
    /// Owning experiment name
    pub experiment_name: String,
    /// Trial the collector reports for
    pub trial_name: String,
    /// Namespace of the trial
    pub namespace: String,
    /// Collector kind
    pub collector: CollectorKind,
    /// Where metrics are read from; `None` for stdout or disabled collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceSpec>,
    /// Metric line formats to match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<String>,
    /// Metrics to collect, objective metric first
    pub metric_names: Vec<String>,
}

impl MetricsCollectorSpec {
    /// Whether this spec collects anything.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.collector != CollectorKind::None
    }

    /// Arguments for the collector sidecar.
    ///
    /// Empty when collection is disabled.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        if !self.is_enabled() {
            return Vec::new();
        }
        let mut args = vec![
            "-t".to_string(),
            self.trial_name.clone(),
            "-m".to_string(),
            self.metric_names.join(";"),
            "-s".to_string(),
            self.collector.as_str().to_string(),
        ];
        match &self.source {
            Some(SourceSpec::FileSystemPath { path, .. }) => {
                args.push("-path".to_string());
                args.push(path.clone());
            }
            Some(SourceSpec::HttpGet { port, path }) => {
                args.push("-url".to_string());
                args.push(format!("http://localhost:{port}{path}"));
            }
            None => {}
        }
        if !self.filter.is_empty() {
            args.push("-f".to_string());
            args.push(self.filter.join(";"));
        }
        args
    }
}

/// Builds `MetricsCollectorSpec`s against a controller configuration.
#[derive(Debug, Clone)]
pub struct MetricsCollectorSpecBuilder<'a> {
    config: &'a ControllerConfig,
}

impl<'a> MetricsCollectorSpecBuilder<'a> {
    /// Create a builder reading defaults from `config`.
    #[must_use]
    pub const fn new(config: &'a ControllerConfig) -> Self {
        Self { config }
    }

    /// Build the collector spec for one trial.
    ///
    /// # Arguments
    ///
    /// * `experiment_name` - Owning experiment
    /// * `trial_name` - Trial being created
    /// * `workload_kind` - `kind` decoded from the rendered run spec
    /// * `namespace` - Trial namespace
    /// * `metric_names` - Objective metric followed by additional metrics
    /// * `override_config` - Experiment-level collector override, if any
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the workload kind is unsupported, the
    /// collector cannot observe it, the source does not fit the collector,
    /// or the override references an undeclared metric.
    pub fn build(
        &self,
        experiment_name: &str,
        trial_name: &str,
        workload_kind: &str,
        namespace: &str,
        metric_names: &[String],
        override_config: Option<&MetricsCollectorConfig>,
    ) -> Result<MetricsCollectorSpec, ConfigError> {
        if !self
            .config
            .supported_workload_kinds
            .iter()
            .any(|k| k == workload_kind)
        {
            return Err(ConfigError::UnsupportedWorkload {
                workload_kind: workload_kind.to_string(),
                supported: self.config.supported_workload_kinds.clone(),
            });
        }

        let collector = override_config.map_or(self.config.default_collector, |c| c.collector);
        check_workload(collector, workload_kind)?;

        let explicit_source = override_config.and_then(|c| c.source.as_ref());
        let source = self.resolve_source(collector, explicit_source)?;

        let selected = match override_config {
            Some(c) if !c.metric_names.is_empty() => {
                if let Some(unknown) = c.metric_names.iter().find(|m| !metric_names.contains(m)) {
                    return Err(ConfigError::UnknownMetric {
                        metric: unknown.clone(),
                        declared: metric_names.to_vec(),
                    });
                }
                // Keep objective order, not override order.
                metric_names
                    .iter()
                    .filter(|m| c.metric_names.contains(m))
                    .cloned()
                    .collect()
            }
            _ => metric_names.to_vec(),
        };

        let filter = match collector {
            CollectorKind::None => Vec::new(),
            _ => override_config.map(|c| c.filter.clone()).unwrap_or_default(),
        };

        Ok(MetricsCollectorSpec {
            experiment_name: experiment_name.to_string(),
            trial_name: trial_name.to_string(),
            namespace: namespace.to_string(),
            collector,
            source,
            filter,
            metric_names: selected,
        })
    }

    fn resolve_source(
        &self,
        collector: CollectorKind,
        explicit: Option<&SourceSpec>,
    ) -> Result<Option<SourceSpec>, ConfigError> {
        let incompatible = |source: &SourceSpec| ConfigError::IncompatibleSource {
            collector: collector.as_str(),
            source_kind: source_kind(source),
        };

        match (collector, explicit) {
            (CollectorKind::StdOut | CollectorKind::None, None) => Ok(None),
            (CollectorKind::StdOut | CollectorKind::None, Some(source)) => Err(incompatible(source)),

            (CollectorKind::File, None) => Ok(Some(SourceSpec::FileSystemPath {
                path: self.config.default_metrics_file.clone(),
                kind: FileSystemKind::File,
            })),
            (CollectorKind::File, Some(source)) if is_file_path(source, FileSystemKind::File) => {
                Ok(Some(source.clone()))
            }

            (CollectorKind::TensorFlowEvent, None) => Ok(Some(SourceSpec::FileSystemPath {
                path: self.config.default_tf_event_dir.clone(),
                kind: FileSystemKind::Directory,
            })),
            (CollectorKind::TensorFlowEvent, Some(source))
                if is_file_path(source, FileSystemKind::Directory) =>
            {
                Ok(Some(source.clone()))
            }

            (CollectorKind::PrometheusMetric, None) => Ok(Some(SourceSpec::HttpGet {
                port: self.config.default_prometheus_port,
                path: self.config.default_prometheus_path.clone(),
            })),
            (CollectorKind::PrometheusMetric, Some(source))
                if matches!(source, SourceSpec::HttpGet { .. }) =>
            {
                Ok(Some(source.clone()))
            }

            (CollectorKind::Custom, None) => Err(ConfigError::MissingSource {
                collector: collector.as_str(),
            }),
            (CollectorKind::Custom, Some(source)) => Ok(Some(source.clone())),

            (_, Some(source)) => Err(incompatible(source)),
        }
    }
}

fn check_workload(collector: CollectorKind, workload_kind: &str) -> Result<(), ConfigError> {
    if collector == CollectorKind::TensorFlowEvent && !TF_EVENT_WORKLOADS.contains(&workload_kind) {
        return Err(ConfigError::IncompatibleWorkload {
            collector: collector.as_str(),
            workload_kind: workload_kind.to_string(),
        });
    }
    Ok(())
}

fn is_file_path(source: &SourceSpec, expected: FileSystemKind) -> bool {
    matches!(source, SourceSpec::FileSystemPath { kind, .. } if *kind == expected)
}

const fn source_kind(source: &SourceSpec) -> &'static str {
    match source {
        SourceSpec::FileSystemPath {
            kind: FileSystemKind::File,
            ..
        } => "file",
        SourceSpec::FileSystemPath {
            kind: FileSystemKind::Directory,
            ..
        } => "directory",
        SourceSpec::HttpGet { .. } => "http",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> Vec<String> {
        vec!["accuracy".to_string(), "loss".to_string(), "f1".to_string()]
    }

    fn build(
        workload_kind: &str,
        override_config: Option<&MetricsCollectorConfig>,
    ) -> Result<MetricsCollectorSpec, ConfigError> {
        let config = ControllerConfig::default();
        MetricsCollectorSpecBuilder::new(&config).build(
            "exp1",
            "exp1-abc",
            workload_kind,
            "ns",
            &metrics(),
            override_config,
        )
    }

    #[test]
    fn test_default_collector_when_absent() {
        let spec = build("Job", None).unwrap();
        assert_eq!(spec.collector, CollectorKind::StdOut);
        assert!(spec.is_enabled());
        assert!(spec.source.is_none());
        assert_eq!(spec.metric_names, metrics());
        assert_eq!(spec.trial_name, "exp1-abc");
        assert_eq!(spec.namespace, "ns");
    }

    #[test]
    fn test_explicit_none_disables_collection() {
        let spec = build("Job", Some(&MetricsCollectorConfig::new(CollectorKind::None))).unwrap();
        assert!(!spec.is_enabled());
        assert!(spec.args().is_empty());
    }

    #[test]
    fn test_file_collector_default_path() {
        let spec = build("Job", Some(&MetricsCollectorConfig::new(CollectorKind::File))).unwrap();
        assert_eq!(
            spec.source,
            Some(SourceSpec::FileSystemPath {
                path: ControllerConfig::default().default_metrics_file,
                kind: FileSystemKind::File,
            })
        );
    }

    #[test]
    fn test_explicit_source_wins() {
        let config = MetricsCollectorConfig::new(CollectorKind::PrometheusMetric).with_source(
            SourceSpec::HttpGet {
                port: 9090,
                path: "/stats".to_string(),
            },
        );
        let spec = build("PyTorchJob", Some(&config)).unwrap();
        assert_eq!(
            spec.source,
            Some(SourceSpec::HttpGet {
                port: 9090,
                path: "/stats".to_string(),
            })
        );
        assert!(spec.args().contains(&"http://localhost:9090/stats".to_string()));
    }

    #[test]
    fn test_tf_event_rejects_pytorch() {
        let err = build(
            "PyTorchJob",
            Some(&MetricsCollectorConfig::new(CollectorKind::TensorFlowEvent)),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::IncompatibleWorkload { .. }));
    }

    #[test]
    fn test_unsupported_workload() {
        let err = build("Deployment", None).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedWorkload { .. }));
    }

    #[test]
    fn test_source_mismatch() {
        let config = MetricsCollectorConfig::new(CollectorKind::File).with_source(
            SourceSpec::FileSystemPath {
                path: "/logs".to_string(),
                kind: FileSystemKind::Directory,
            },
        );
        let err = build("Job", Some(&config)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::IncompatibleSource {
                collector: "File",
                source_kind: "directory",
            }
        );
    }

    #[test]
    fn test_custom_requires_source() {
        let err = build("Job", Some(&MetricsCollectorConfig::new(CollectorKind::Custom))).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSource { .. }));
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let mut config = MetricsCollectorConfig::new(CollectorKind::StdOut);
        config.metric_names = vec!["loss".to_string(), "recall".to_string()];
        let err = build("Job", Some(&config)).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMetric { ref metric, .. } if metric == "recall"));
    }

    #[test]
    fn test_metric_subset_keeps_objective_order() {
        let mut config = MetricsCollectorConfig::new(CollectorKind::StdOut);
        config.metric_names = vec!["f1".to_string(), "accuracy".to_string()];
        let spec = build("Job", Some(&config)).unwrap();
        assert_eq!(spec.metric_names, vec!["accuracy", "f1"]);
    }

    #[test]
    fn test_args_layout() {
        let spec = build("Job", None).unwrap();
        assert_eq!(
            spec.args(),
            vec!["-t", "exp1-abc", "-m", "accuracy;loss;f1", "-s", "StdOut"]
        );
    }
}
