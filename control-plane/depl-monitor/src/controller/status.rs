use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::Resource;

use crate::crd::{MonDepl, MonDeplStatus};
use crate::store::{ObjectStore, StoreError};

pub fn reference_for(managed: &Deployment) -> ObjectReference {
    managed.object_ref(&())
}

/// Whether `active` points at `managed`. Uids are compared only when both
/// sides carry one.
pub fn references(active: &ObjectReference, managed: &Deployment) -> bool {
    let uid_matches = match (active.uid.as_deref(), managed.metadata.uid.as_deref()) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    };
    active.kind.as_deref() == Some("Deployment")
        && active.name == managed.metadata.name
        && active.namespace == managed.metadata.namespace
        && uid_matches
}

pub fn is_current(desired: &MonDepl, managed: &Deployment) -> bool {
    desired
        .active_ref()
        .is_some_and(|active| references(active, managed))
}

/// Writes `status.active` through the status path only.
pub async fn publish(
    store: &dyn ObjectStore<MonDepl>,
    desired: &MonDepl,
    reference: ObjectReference,
) -> Result<MonDepl, StoreError> {
    let mut next = desired.clone();
    next.status = Some(MonDeplStatus {
        active: Some(reference),
    });
    store.update_status(&next).await
}
