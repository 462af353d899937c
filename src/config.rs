//! Controller configuration
//!
//! Defaults match a stock deployment; override individual fields through
//! [`ControllerConfigBuilder`] or load a JSON document where every field is
//! optional.
//!
//! ```rust
//! use trial_reconciler::config::ControllerConfig;
//!
//! let config = ControllerConfig::builder()
//!     .suffix_len(6)
//!     .finalizer_name("example.org/cleanup")
//!     .build()?;
//! assert_eq!(config.suffix_len, 6);
//! # Ok::<(), trial_reconciler::Error>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::resource::CollectorKind;
use crate::{Error, Result};

/// Finalizer installed on experiments whose history lives in the external store.
pub const DEFAULT_FINALIZER: &str = "clean-data-in-db";
/// Label key binding a trial to its experiment.
pub const DEFAULT_EXPERIMENT_LABEL: &str = "experiment-name";
/// Random characters appended to the experiment name.
pub const DEFAULT_SUFFIX_LEN: usize = 8;

const MAX_SUFFIX_LEN: usize = 32;

/// Controller-wide settings consumed by the factory, collector builder and
/// finalizer manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControllerConfig {
    /// Finalizer name guarding history purge
    pub finalizer_name: String,
    /// Label key set on every trial
    pub experiment_label_key: String,
    /// Length of the random trial-name suffix
    pub suffix_len: usize,
    /// Collector used when an experiment has no override
    pub default_collector: CollectorKind,
    /// Metrics file read by `File` collectors without an explicit source
    pub default_metrics_file: String,
    /// Event directory read by `TensorFlowEvent` collectors without an explicit source
    pub default_tf_event_dir: String,
    /// Port scraped by `PrometheusMetric` collectors without an explicit source
    pub default_prometheus_port: u16,
    /// Path scraped by `PrometheusMetric` collectors without an explicit source
    pub default_prometheus_path: String,
    /// Workload kinds trials may render to
    pub supported_workload_kinds: Vec<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            finalizer_name: DEFAULT_FINALIZER.to_string(),
            experiment_label_key: DEFAULT_EXPERIMENT_LABEL.to_string(),
            suffix_len: DEFAULT_SUFFIX_LEN,
            default_collector: CollectorKind::StdOut,
            default_metrics_file: "/var/log/katib/metrics.log".to_string(),
            default_tf_event_dir: "/var/log/katib/tfevent/".to_string(),
            default_prometheus_port: 8080,
            default_prometheus_path: "/metrics".to_string(),
            supported_workload_kinds: ["Job", "TFJob", "PyTorchJob"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl ControllerConfig {
    /// Create a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> ControllerConfigBuilder {
        ControllerConfigBuilder::default()
    }

    /// Parse a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the document does not parse or fails
    /// validation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first inconsistency found.
    pub fn validate(&self) -> Result<()> {
        if self.suffix_len == 0 || self.suffix_len > MAX_SUFFIX_LEN {
            return Err(Error::Config(format!(
                "suffixLen must be between 1 and {MAX_SUFFIX_LEN}, got {}",
                self.suffix_len
            )));
        }
        if self.finalizer_name.trim().is_empty() {
            return Err(Error::Config("finalizerName must not be empty".to_string()));
        }
        if self.experiment_label_key.trim().is_empty() {
            return Err(Error::Config(
                "experimentLabelKey must not be empty".to_string(),
            ));
        }
        if self.supported_workload_kinds.is_empty() {
            return Err(Error::Config(
                "supportedWorkloadKinds must list at least one kind".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for `ControllerConfig`.
#[derive(Debug, Default)]
pub struct ControllerConfigBuilder {
    config: ControllerConfig,
}

impl ControllerConfigBuilder {
    /// Set the finalizer name.
    #[must_use]
    pub fn finalizer_name(mut self, name: impl Into<String>) -> Self {
        self.config.finalizer_name = name.into();
        self
    }

    /// Set the experiment label key.
    #[must_use]
    pub fn experiment_label_key(mut self, key: impl Into<String>) -> Self {
        self.config.experiment_label_key = key.into();
        self
    }

    /// Set the random suffix length.
    #[must_use]
    pub const fn suffix_len(mut self, len: usize) -> Self {
        self.config.suffix_len = len;
        self
    }

    /// Set the fallback collector kind.
    #[must_use]
    pub const fn default_collector(mut self, collector: CollectorKind) -> Self {
        self.config.default_collector = collector;
        self
    }

    /// Set the default metrics file path.
    #[must_use]
    pub fn default_metrics_file(mut self, path: impl Into<String>) -> Self {
        self.config.default_metrics_file = path.into();
        self
    }

    /// Replace the supported workload kinds.
    #[must_use]
    pub fn supported_workload_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.supported_workload_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the resulting configuration is inconsistent.
    pub fn build(self) -> Result<ControllerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
