use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::{Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::trace;

use super::{Deletion, ObjectKey, ObjectStore, StoreError};

/// API-server backed store for one namespaced kind.
///
/// The API server garbage-collects owned objects on its own, so for this
/// store the explicit delete branch of the reconciler usually finds the
/// Deployment already gone.
pub struct KubeStore<K> {
    client: Client,
    field_manager: String,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeStore<K> {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
            _kind: PhantomData,
        }
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(self.field_manager.clone()),
        }
    }
}

impl<K> KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    fn api(&self, ns: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), ns)
    }
}

#[async_trait]
impl<K> ObjectStore<K> for KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned
        + Serialize
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        trace!(%key, kind = %K::kind(&()), "store: get");
        self.api(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(from_kube)
    }

    async fn create(&self, obj: &K) -> Result<K, StoreError> {
        let key = ObjectKey::of(obj);
        trace!(%key, kind = %K::kind(&()), "store: create");
        self.api(&key.namespace)
            .create(&self.post_params(), obj)
            .await
            .map_err(from_kube)
    }

    async fn update(&self, obj: &K) -> Result<K, StoreError> {
        let key = ObjectKey::of(obj);
        trace!(%key, kind = %K::kind(&()), "store: replace");
        self.api(&key.namespace)
            .replace(&key.name, &self.post_params(), obj)
            .await
            .map_err(from_kube)
    }

    async fn delete(&self, key: &ObjectKey) -> Result<Deletion, StoreError> {
        trace!(%key, kind = %K::kind(&()), "store: delete");
        match self
            .api(&key.namespace)
            .delete(&key.name, &DeleteParams::background())
            .await
        {
            Ok(_) => Ok(Deletion::Deleted),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                Ok(Deletion::AlreadyGone)
            }
            Err(e) => Err(from_kube(e)),
        }
    }

    async fn update_status(&self, obj: &K) -> Result<K, StoreError> {
        let key = ObjectKey::of(obj);
        trace!(%key, kind = %K::kind(&()), "store: patch status");
        let value = serde_json::to_value(obj)
            .map_err(|e| StoreError::Codec(e.to_string()))?;
        let status = value.get("status").cloned().unwrap_or(Value::Null);
        let patch = json!({ "status": status });
        let pp = PatchParams {
            field_manager: Some(self.field_manager.clone()),
            ..Default::default()
        };
        self.api(&key.namespace)
            .patch_status(&key.name, &pp, &Patch::Merge(&patch))
            .await
            .map_err(from_kube)
    }
}

fn from_kube(err: kube::Error) -> StoreError {
    match err {
        kube::Error::Api(ae) if ae.code == 409 => {
            StoreError::Conflict(ae.message)
        }
        kube::Error::SerdeError(e) => StoreError::Codec(e.to_string()),
        other => StoreError::Transient(other.to_string()),
    }
}
