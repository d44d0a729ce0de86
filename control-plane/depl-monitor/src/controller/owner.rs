use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};

use crate::crd::MonDepl;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("owner namespace {owner} differs from object namespace {object}")]
    CrossNamespace { owner: String, object: String },
    #[error("owner {0} has no name or uid yet")]
    OwnerIncomplete(String),
    #[error("{object} is already controlled by {kind} {name}")]
    AlreadyOwned {
        object: String,
        kind: String,
        name: String,
    },
}

/// Makes `desired` the controller owner of `managed`, replacing an earlier
/// reference to the same owner. Other non-controller references are kept.
///
/// A controller reference naming a MonDepl with the owner's name but another
/// uid belongs to a deleted predecessor and is re-pointed at `desired`.
pub fn link(desired: &MonDepl, managed: &mut Deployment) -> Result<(), LinkError> {
    let owner_ns = desired.namespace().unwrap_or_else(|| "default".into());
    let object_ns = managed.namespace().unwrap_or_else(|| "default".into());
    if owner_ns != object_ns {
        return Err(LinkError::CrossNamespace {
            owner: owner_ns,
            object: object_ns,
        });
    }
    let owner_ref = desired
        .controller_owner_ref(&())
        .ok_or_else(|| LinkError::OwnerIncomplete(desired.name_any()))?;

    let refs = managed.metadata.owner_references.get_or_insert_with(Vec::new);
    refs.retain(|r| !is_predecessor(r, &owner_ref));
    if let Some(other) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner_ref.uid)
    {
        return Err(LinkError::AlreadyOwned {
            object: managed.metadata.name.clone().unwrap_or_default(),
            kind: other.kind.clone(),
            name: other.name.clone(),
        });
    }
    match refs.iter_mut().find(|r| r.uid == owner_ref.uid) {
        Some(existing) => *existing = owner_ref,
        None => refs.push(owner_ref),
    }
    Ok(())
}

fn is_predecessor(existing: &OwnerReference, owner_ref: &OwnerReference) -> bool {
    existing.controller == Some(true)
        && existing.uid != owner_ref.uid
        && existing.api_version == owner_ref.api_version
        && existing.kind == owner_ref.kind
        && existing.name == owner_ref.name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::MonDeplSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn owner(ns: &str, uid: Option<&str>) -> MonDepl {
        let mut md = MonDepl::new(
            "web",
            MonDeplSpec {
                reason: "love".into(),
                configs: None,
                underlying: Default::default(),
            },
        );
        md.metadata.namespace = Some(ns.into());
        md.metadata.uid = uid.map(Into::into);
        md
    }

    fn managed(ns: &str) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some("web-underlying".into()),
                namespace: Some(ns.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn sets_single_controller_reference() {
        let md = owner("default", Some("u1"));
        let mut dep = managed("default");
        link(&md, &mut dep).unwrap();
        link(&md, &mut dep).unwrap();
        let refs = dep.metadata.owner_references.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, "MonDepl");
        assert_eq!(refs[0].api_version, "kally.io.kally.io/v1alpha1");
        assert_eq!(refs[0].name, "web");
        assert_eq!(refs[0].uid, "u1");
        assert_eq!(refs[0].controller, Some(true));
    }

    #[test]
    fn rejects_cross_namespace() {
        let err = link(&owner("a", Some("u1")), &mut managed("b")).unwrap_err();
        assert!(matches!(err, LinkError::CrossNamespace { .. }));
    }

    #[test]
    fn rejects_owner_without_uid() {
        let err = link(&owner("default", None), &mut managed("default")).unwrap_err();
        assert_eq!(err, LinkError::OwnerIncomplete("web".into()));
    }

    #[test]
    fn rejects_foreign_controller() {
        let mut dep = managed("default");
        dep.metadata.owner_references = Some(vec![OwnerReference {
            api_version: "apps/v1".into(),
            kind: "ReplicaSet".into(),
            name: "other".into(),
            uid: "u9".into(),
            controller: Some(true),
            block_owner_deletion: None,
        }]);
        let err = link(&owner("default", Some("u1")), &mut dep).unwrap_err();
        assert!(matches!(err, LinkError::AlreadyOwned { .. }));
    }

    #[test]
    fn repoints_reference_left_by_deleted_predecessor() {
        let mut dep = managed("default");
        link(&owner("default", Some("u1")), &mut dep).unwrap();
        link(&owner("default", Some("u2")), &mut dep).unwrap();
        let refs = dep.metadata.owner_references.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].uid, "u2");
        assert_eq!(refs[0].controller, Some(true));
    }

    #[test]
    fn other_mondepl_controller_is_still_foreign() {
        let mut dep = managed("default");
        let mut other = owner("default", Some("u9"));
        other.metadata.name = Some("api".into());
        link(&other, &mut dep).unwrap();
        let err = link(&owner("default", Some("u1")), &mut dep).unwrap_err();
        assert_eq!(
            err,
            LinkError::AlreadyOwned {
                object: "web-underlying".into(),
                kind: "MonDepl".into(),
                name: "api".into(),
            }
        );
    }
}
