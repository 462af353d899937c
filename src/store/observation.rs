//! Observation log entries kept per experiment

use serde::{Deserialize, Serialize};

/// One metric value reported by a trial's collector.
///
/// Values stay in the text form the collector parsed them from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRecord {
    /// Trial that reported the value
    pub trial_name: String,
    /// Metric name as declared by the objective
    pub metric_name: String,
    /// Reported value
    pub value: String,
}

impl ObservationRecord {
    /// Create an observation.
    #[must_use]
    pub fn new(
        trial_name: impl Into<String>,
        metric_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            trial_name: trial_name.into(),
            metric_name: metric_name.into(),
            value: value.into(),
        }
    }
}
