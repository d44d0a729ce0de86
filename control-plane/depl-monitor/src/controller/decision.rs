//! The reconcile decision table.
//!
//! Evaluated from a fresh snapshot on every pass, never from the event that
//! triggered it. Rows are checked in order and the first match wins.

use k8s_openapi::api::apps::v1::Deployment;

use crate::crd::MonDepl;

#[derive(Clone, Copy, Debug, Default)]
pub struct Observed<'a> {
    pub desired: Option<&'a MonDepl>,
    pub managed: Option<&'a Deployment>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoopReason {
    /// Neither object exists.
    NothingToManage,
    /// MonDepl is being deleted and its Deployment is already gone.
    AlreadyRemoved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteReason {
    /// MonDepl is gone but the Deployment survived it.
    Orphaned,
    /// MonDepl carries a deletion timestamp.
    OwnerDeleting,
}

#[derive(Clone, Copy, Debug)]
pub enum Step<'a> {
    Noop(NoopReason),
    DeleteManaged(DeleteReason),
    Create(&'a MonDepl),
    Update(&'a MonDepl, &'a Deployment),
}

pub fn evaluate<'a>(observed: &Observed<'a>) -> Step<'a> {
    match (observed.desired, observed.managed) {
        (None, None) => Step::Noop(NoopReason::NothingToManage),
        (None, Some(_)) => Step::DeleteManaged(DeleteReason::Orphaned),
        (Some(d), None) if d.is_deleting() => {
            Step::Noop(NoopReason::AlreadyRemoved)
        }
        (Some(d), Some(_)) if d.is_deleting() => {
            Step::DeleteManaged(DeleteReason::OwnerDeleting)
        }
        (Some(d), None) => Step::Create(d),
        (Some(d), Some(m)) => Step::Update(d, m),
    }
}
