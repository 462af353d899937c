//! Resource schema for experiments and trials
//!
//! ## Schema Overview
//!
//! ```text
//! Experiment (1) ──< Trial (N)       [controller owner reference]
//!      │
//!      └── finalizers ── gate deletion until history is purged
//! ```
//!
//! Field names serialize in camelCase so the types round-trip with the
//! JSON a cluster API server produces.

mod experiment;
mod trial;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use experiment::{
    CollectorKind, Experiment, ExperimentSpec, FileSystemKind, MetricsCollectorConfig, Objective,
    ObjectiveType, SourceSpec, TrialTemplate,
};
pub use trial::{ParameterAssignment, Trial, TrialSpec};

/// API group/version shared by the experiment and trial kinds.
pub const API_VERSION: &str = "kubeflow.org/v1alpha3";

/// `namespace/name` identity of a namespaced object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    /// Namespace the object lives in
    pub namespace: String,
    /// Object name, unique within the namespace
    pub name: String,
}

impl ObjectKey {
    /// Create a key from namespace and name.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Concrete type descriptor passed to the ownership linker on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    /// Group/version, e.g. `kubeflow.org/v1alpha3`
    pub api_version: String,
    /// Kind, e.g. `Experiment`
    pub kind: String,
}

impl TypeMeta {
    /// Create a type descriptor.
    #[must_use]
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }
}

/// Back-reference from a child object to the object that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    /// Owner group/version
    pub api_version: String,
    /// Owner kind
    pub kind: String,
    /// Owner name
    pub name: String,
    /// Owner uid
    pub uid: String,
    /// Whether the owner is the managing controller
    pub controller: bool,
    /// Whether the store must delete this child before the owner
    pub block_owner_deletion: bool,
}

/// Metadata common to every stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    /// Object name
    pub name: String,
    /// Object namespace
    pub namespace: String,
    /// Store-assigned unique id
    pub uid: String,
    /// Store-assigned version used for optimistic concurrency
    pub resource_version: String,
    /// Spec generation; finalizer edits do not bump it
    pub generation: i64,
    /// Selection labels
    pub labels: BTreeMap<String, String>,
    /// Owner back-references
    pub owner_references: Vec<OwnerReference>,
    /// Deletion-blocking markers, in insertion order
    pub finalizers: Vec<String>,
    /// Set by the store once deletion has been requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    /// Create metadata with just a name and namespace.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Get the `namespace/name` key.
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }

    /// Whether deletion has been requested for this object.
    #[must_use]
    pub const fn is_being_deleted(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    /// The owner reference flagged as controller, if any.
    #[must_use]
    pub fn controller_reference(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|r| r.controller)
    }

    /// Whether a finalizer is present.
    #[must_use]
    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers.iter().any(|f| f == finalizer)
    }
}
