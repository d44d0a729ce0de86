#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use depl_monitor::config::ControllerConfig;
use depl_monitor::controller::Reconciler;
use depl_monitor::crd::{MonDepl, MonDeplSpec};
use depl_monitor::store::{
    Deletion, MemoryStore, ObjectKey, ObjectStore, StoreError,
};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

pub const NS: &str = "default";

pub fn key(name: &str) -> ObjectKey {
    ObjectKey::new(NS, name)
}

pub fn workload(replicas: i32) -> DeploymentSpec {
    let labels: std::collections::BTreeMap<String, String> =
        [("app".to_string(), "web".to_string())].into();
    DeploymentSpec {
        replicas: Some(replicas),
        selector: LabelSelector {
            match_labels: Some(labels.clone()),
            ..Default::default()
        },
        template: PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: Some(labels),
                ..Default::default()
            }),
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "web".into(),
                    image: Some("nginx:1.27".into()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
        },
        ..Default::default()
    }
}

pub fn mondepl(name: &str, underlying: DeploymentSpec) -> MonDepl {
    let mut md = MonDepl::new(
        name,
        MonDeplSpec {
            reason: "love".into(),
            configs: None,
            underlying,
        },
    );
    md.metadata.namespace = Some(NS.into());
    md
}

pub struct Harness {
    pub desired: Arc<MemoryStore<MonDepl>>,
    pub managed: Arc<MemoryStore<Deployment>>,
    pub reconciler: Reconciler,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    pub fn with_config(cfg: ControllerConfig) -> Self {
        let desired: Arc<MemoryStore<MonDepl>> = Arc::new(MemoryStore::new());
        let managed: Arc<MemoryStore<Deployment>> = Arc::new(MemoryStore::new());
        let reconciler = Reconciler::new(desired.clone(), managed.clone(), cfg);
        Self {
            desired,
            managed,
            reconciler,
        }
    }

    pub async fn clear_journals(&self) {
        self.desired.clear_journal().await;
        self.managed.clear_journal().await;
    }

    pub async fn write_count(&self) -> usize {
        self.desired.journal().await.len() + self.managed.journal().await.len()
    }
}

/// Delegates to a MemoryStore but sleeps before every read.
pub struct SlowStore<K> {
    pub inner: Arc<MemoryStore<K>>,
    pub delay: Duration,
}

#[async_trait]
impl<K> ObjectStore<K> for SlowStore<K>
where
    K: Send + Sync + 'static,
    MemoryStore<K>: ObjectStore<K>,
{
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn create(&self, obj: &K) -> Result<K, StoreError> {
        self.inner.create(obj).await
    }

    async fn update(&self, obj: &K) -> Result<K, StoreError> {
        self.inner.update(obj).await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<Deletion, StoreError> {
        self.inner.delete(key).await
    }

    async fn update_status(&self, obj: &K) -> Result<K, StoreError> {
        self.inner.update_status(obj).await
    }
}
