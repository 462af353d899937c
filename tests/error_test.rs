//! Tests for error types

use std::error::Error as _;

use trial_reconciler::collector::ConfigError;
use trial_reconciler::owner::LinkError;
use trial_reconciler::resource::ObjectKey;
use trial_reconciler::store::StoreError;
use trial_reconciler::template::RenderError;
use trial_reconciler::Error;

#[test]
fn test_render_error() {
    let error = Error::Render {
        experiment: "ns/exp1".to_string(),
        trial: "exp1-abc".to_string(),
        source: RenderError::UnresolvedPlaceholder {
            name: "unset".to_string(),
            offset: 4,
        },
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("ns/exp1"));
    assert!(error_str.contains("exp1-abc"));
    assert!(error_str.contains("{{unset}}"));
    assert!(error.source().is_some());
}

#[test]
fn test_validation_error() {
    let error = Error::Validation {
        experiment: "ns/exp1".to_string(),
        trial: "exp1-abc".to_string(),
        reason: "manifest has no kind".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("invalid trial template"));
    assert!(error_str.contains("manifest has no kind"));
    assert!(error_str.contains("exp1-abc"));
}

#[test]
fn test_reference_error() {
    let error = Error::Reference {
        experiment: "ns/exp1".to_string(),
        trial: "exp1-abc".to_string(),
        source: LinkError::CrossNamespace {
            owner_namespace: "ns".to_string(),
            child_namespace: "other".to_string(),
        },
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("controller reference"));
    assert!(error_str.contains("exp1-abc"));
}

#[test]
fn test_configuration_error() {
    let error = Error::Configuration {
        experiment: "ns/exp1".to_string(),
        trial: "exp1-abc".to_string(),
        source: ConfigError::MissingSource { collector: "Custom" },
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("metrics collector"));
    let source = error.source().map(ToString::to_string).unwrap_or_default();
    assert!(source.contains("requires an explicit source"));
}

#[test]
fn test_persistence_error() {
    let error = Error::Persistence {
        operation: "create trial",
        object: "ns/exp1-abc".to_string(),
        source: StoreError::AlreadyExists(ObjectKey::new("ns", "exp1-abc")),
    };
    assert_eq!(format!("{error}"), "create trial failed for ns/exp1-abc: ns/exp1-abc already exists");
    assert!(error.is_persistence());
}

#[test]
fn test_invalid_state_error() {
    let error = Error::InvalidState {
        experiment: "ns/exp1".to_string(),
        state: "active".to_string(),
        reason: "teardown requires a deletion request".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("is active"));
    assert!(!error.is_persistence());
}

#[test]
fn test_config_error() {
    let error = Error::Config("suffixLen must be between 1 and 32, got 0".to_string());
    assert!(format!("{error}").contains("controller configuration error"));
}

#[test]
fn test_store_conflict_message() {
    let error = StoreError::Conflict {
        key: ObjectKey::new("ns", "exp1"),
        expected: "3".to_string(),
        actual: "4".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("modified concurrently"));
    assert!(error_str.contains("\"3\""));
}

#[test]
fn test_error_debug() {
    let error = Error::Logging("already installed".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("Logging"));
}

#[test]
fn test_result_type_alias_error() {
    fn returns_error() -> trial_reconciler::Result<i32> {
        Err(Error::Config("test error".to_string()))
    }

    let result = returns_error();
    assert!(result.is_err());
}
