//! Ownership linkage between experiments and the objects they create
//!
//! A controller owner reference lets the store cascade-delete trials when
//! their experiment goes away. Type descriptors are passed explicitly on
//! every call; there is no global type registry.

use thiserror::Error;

use crate::resource::{ObjectMeta, OwnerReference, TypeMeta};

/// Ownership linkage failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Owner has not been persisted yet
    #[error("owner {kind} {name:?} has no uid")]
    MissingOwnerUid {
        /// Owner kind
        kind: String,
        /// Owner name
        name: String,
    },

    /// Owner descriptor is incomplete
    #[error("owner type descriptor is incomplete (apiVersion {api_version:?}, kind {kind:?})")]
    InvalidOwnerType {
        /// Owner group/version
        api_version: String,
        /// Owner kind
        kind: String,
    },

    /// Owner and child live in different namespaces
    #[error("cross-namespace owner reference: owner in {owner_namespace:?}, child in {child_namespace:?}")]
    CrossNamespace {
        /// Owner namespace
        owner_namespace: String,
        /// Child namespace
        child_namespace: String,
    },

    /// Child is already controlled by another object
    #[error("object {child:?} is already controlled by {kind} {name:?}")]
    AlreadyOwned {
        /// Child name
        child: String,
        /// Existing controller kind
        kind: String,
        /// Existing controller name
        name: String,
    },
}

/// Capability that records `owner` as the controller of `child`.
pub trait OwnerLinker: Send + Sync {
    /// Add a controller owner reference to `child`.
    ///
    /// # Errors
    ///
    /// Returns `LinkError` if the reference cannot be established; `child`
    /// is left unchanged in that case.
    fn link(
        &self,
        owner_type: &TypeMeta,
        owner: &ObjectMeta,
        child: &mut ObjectMeta,
    ) -> Result<(), LinkError>;
}

/// Sets a blocking controller reference, the way a cluster controller does.
#[derive(Debug, Default, Clone, Copy)]
pub struct ControllerReferenceLinker;

impl OwnerLinker for ControllerReferenceLinker {
    fn link(
        &self,
        owner_type: &TypeMeta,
        owner: &ObjectMeta,
        child: &mut ObjectMeta,
    ) -> Result<(), LinkError> {
        if owner_type.api_version.is_empty() || owner_type.kind.is_empty() {
            return Err(LinkError::InvalidOwnerType {
                api_version: owner_type.api_version.clone(),
                kind: owner_type.kind.clone(),
            });
        }
        if owner.uid.is_empty() {
            return Err(LinkError::MissingOwnerUid {
                kind: owner_type.kind.clone(),
                name: owner.name.clone(),
            });
        }
        if owner.namespace != child.namespace {
            return Err(LinkError::CrossNamespace {
                owner_namespace: owner.namespace.clone(),
                child_namespace: child.namespace.clone(),
            });
        }

        let reference = OwnerReference {
            api_version: owner_type.api_version.clone(),
            kind: owner_type.kind.clone(),
            name: owner.name.clone(),
            uid: owner.uid.clone(),
            controller: true,
            block_owner_deletion: true,
        };

        if let Some(existing) = child.controller_reference() {
            if existing.uid != reference.uid {
                return Err(LinkError::AlreadyOwned {
                    child: child.name.clone(),
                    kind: existing.kind.clone(),
                    name: existing.name.clone(),
                });
            }
        }

        // Re-linking to the same owner replaces the old reference in place.
        if let Some(slot) = child
            .owner_references
            .iter_mut()
            .find(|r| r.uid == reference.uid)
        {
            *slot = reference;
        } else {
            child.owner_references.push(reference);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Experiment;

    fn owner() -> ObjectMeta {
        let mut meta = ObjectMeta::new("ns", "exp1");
        meta.uid = "uid-1".to_string();
        meta
    }

    #[test]
    fn test_link_sets_controller_reference() {
        let mut child = ObjectMeta::new("ns", "exp1-abc");
        ControllerReferenceLinker
            .link(&Experiment::type_meta(), &owner(), &mut child)
            .unwrap();

        let reference = child.controller_reference().unwrap();
        assert_eq!(reference.name, "exp1");
        assert_eq!(reference.kind, "Experiment");
        assert!(reference.block_owner_deletion);
    }

    #[test]
    fn test_link_is_idempotent_for_same_owner() {
        let mut child = ObjectMeta::new("ns", "exp1-abc");
        let linker = ControllerReferenceLinker;
        linker.link(&Experiment::type_meta(), &owner(), &mut child).unwrap();
        linker.link(&Experiment::type_meta(), &owner(), &mut child).unwrap();
        assert_eq!(child.owner_references.len(), 1);
    }

    #[test]
    fn test_link_rejects_missing_uid() {
        let mut child = ObjectMeta::new("ns", "exp1-abc");
        let err = ControllerReferenceLinker
            .link(&Experiment::type_meta(), &ObjectMeta::new("ns", "exp1"), &mut child)
            .unwrap_err();
        assert!(matches!(err, LinkError::MissingOwnerUid { .. }));
        assert!(child.owner_references.is_empty());
    }

    #[test]
    fn test_link_rejects_cross_namespace() {
        let mut child = ObjectMeta::new("other", "exp1-abc");
        let err = ControllerReferenceLinker
            .link(&Experiment::type_meta(), &owner(), &mut child)
            .unwrap_err();
        assert!(matches!(err, LinkError::CrossNamespace { .. }));
    }

    #[test]
    fn test_link_rejects_second_controller() {
        let mut child = ObjectMeta::new("ns", "exp1-abc");
        ControllerReferenceLinker
            .link(&Experiment::type_meta(), &owner(), &mut child)
            .unwrap();

        let mut other = owner();
        other.name = "exp2".to_string();
        other.uid = "uid-2".to_string();
        let err = ControllerReferenceLinker
            .link(&Experiment::type_meta(), &other, &mut child)
            .unwrap_err();
        assert!(matches!(err, LinkError::AlreadyOwned { .. }));
    }

    #[test]
    fn test_link_rejects_empty_type() {
        let mut child = ObjectMeta::new("ns", "exp1-abc");
        let err = ControllerReferenceLinker
            .link(&TypeMeta::new("", "Experiment"), &owner(), &mut child)
            .unwrap_err();
        assert!(matches!(err, LinkError::InvalidOwnerType { .. }));
    }
}
