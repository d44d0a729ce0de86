//! Store capability boundary consumed by the reconciler.
//!
//! One `ObjectStore` instance exists per resource kind. Not-found is part of
//! the normal return value (`Option` on reads, [`Deletion::AlreadyGone`] on
//! deletes); every other failure is a [`StoreError`].

use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{Resource, ResourceExt};

use crate::crd::MonDepl;

pub mod kube_store;
pub mod memory;

pub use kube_store::KubeStore;
pub use memory::{MemoryStore, Op};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of an object as it is addressed in the store; cluster-default
    /// namespace when the object carries none.
    pub fn of<K: Resource>(obj: &K) -> Self {
        Self::new(
            obj.namespace().unwrap_or_else(|| "default".to_string()),
            obj.name_any(),
        )
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    AlreadyGone,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("conflict on {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Transient(String),
    #[error("store call exceeded pass deadline")]
    Timeout,
    #[error("codec error: {0}")]
    Codec(String),
}

#[async_trait]
pub trait ObjectStore<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError>;

    async fn create(&self, obj: &K) -> Result<K, StoreError>;

    /// Full replace of everything but status.
    async fn update(&self, obj: &K) -> Result<K, StoreError>;

    async fn delete(&self, key: &ObjectKey) -> Result<Deletion, StoreError>;

    /// Writes only the status of `obj`.
    async fn update_status(&self, obj: &K) -> Result<K, StoreError>;
}

/// Splits an object into its status and non-status halves so that a store
/// can keep the spec and status write paths apart.
pub trait StatusSubresource {
    fn copy_status_from(&mut self, other: &Self);
}

impl StatusSubresource for MonDepl {
    fn copy_status_from(&mut self, other: &Self) {
        self.status = other.status.clone();
    }
}

impl StatusSubresource for Deployment {
    fn copy_status_from(&mut self, other: &Self) {
        self.status = other.status.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::MonDeplSpec;
    use k8s_openapi::api::apps::v1::DeploymentSpec;

    #[test]
    fn key_of_object_defaults_namespace() {
        let md = MonDepl::new(
            "web",
            MonDeplSpec {
                reason: "x".into(),
                configs: None,
                underlying: DeploymentSpec::default(),
            },
        );
        assert_eq!(ObjectKey::of(&md), ObjectKey::new("default", "web"));
        assert_eq!(ObjectKey::new("ns", "web").to_string(), "ns/web");
    }
}
