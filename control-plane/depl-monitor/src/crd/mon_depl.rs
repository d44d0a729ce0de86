use k8s_openapi::api::apps::v1::DeploymentSpec;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const API_GROUP: &str = "kally.io.kally.io";
pub const API_VERSION: &str = "kally.io.kally.io/v1alpha1";
pub const KIND: &str = "MonDepl";

/// Configs injected as labels on the underlying Deployment.
pub type MonConfigs = BTreeMap<String, String>;

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    group = "kally.io.kally.io",
    version = "v1alpha1",
    kind = "MonDepl",
    plural = "mondepls",
    namespaced,
    status = "MonDeplStatus",
    derive = "PartialEq"
)]
pub struct MonDeplSpec {
    /// Reason for the creation of this monitoring
    #[serde(default)]
    pub reason: String,
    /// The configs, which will be injected as labels for the underlying
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configs: Option<MonConfigs>,
    /// Underlying deployment
    pub underlying: DeploymentSpec,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct MonDeplStatus {
    /// A pointer to the currently running underlying.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<ObjectReference>,
}

impl MonDepl {
    /// Removal has been requested but the object is still held by finalizers.
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    pub fn active_ref(&self) -> Option<&ObjectReference> {
        self.status.as_ref().and_then(|s| s.active.as_ref())
    }
}
