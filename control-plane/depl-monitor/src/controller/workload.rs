use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

use crate::crd::{MonDepl, MonDeplSpec};
use crate::store::ObjectKey;

pub fn derive_spec(spec: &MonDeplSpec) -> DeploymentSpec {
    spec.underlying.clone()
}

/// Configs become the Deployment's labels; an empty mapping means no labels.
pub fn config_labels(spec: &MonDeplSpec) -> Option<BTreeMap<String, String>> {
    spec.configs.clone().filter(|c| !c.is_empty())
}

/// Fresh Deployment for `desired` at `key`, without an owner reference.
pub fn build_underlying(desired: &MonDepl, key: &ObjectKey) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(key.name.clone()),
            namespace: Some(key.namespace.clone()),
            labels: config_labels(&desired.spec),
            ..Default::default()
        },
        spec: Some(derive_spec(&desired.spec)),
        status: None,
    }
}

/// Replaces spec and labels wholesale; nothing from the previous spec survives.
pub fn overwrite(managed: &mut Deployment, desired: &MonDepl) {
    managed.metadata.labels = config_labels(&desired.spec);
    managed.spec = Some(derive_spec(&desired.spec));
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::PodTemplateSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

    fn desired(replicas: i32, min_ready: Option<i32>) -> MonDepl {
        MonDepl::new(
            "web",
            MonDeplSpec {
                reason: "love".into(),
                configs: Some([("tier".to_string(), "front".to_string())].into()),
                underlying: DeploymentSpec {
                    replicas: Some(replicas),
                    min_ready_seconds: min_ready,
                    selector: LabelSelector::default(),
                    template: PodTemplateSpec::default(),
                    ..Default::default()
                },
            },
        )
    }

    #[test]
    fn build_copies_template_and_labels() {
        let d = desired(3, None);
        let dep = build_underlying(&d, &ObjectKey::new("default", "web-underlying"));
        assert_eq!(dep.metadata.name.as_deref(), Some("web-underlying"));
        assert_eq!(dep.metadata.namespace.as_deref(), Some("default"));
        assert_eq!(dep.spec, Some(d.spec.underlying.clone()));
        assert_eq!(
            dep.metadata.labels.unwrap().get("tier").map(String::as_str),
            Some("front")
        );
        assert!(dep.metadata.owner_references.is_none());
    }

    #[test]
    fn overwrite_drops_removed_fields() {
        let mut dep = build_underlying(
            &desired(3, Some(10)),
            &ObjectKey::new("default", "web-underlying"),
        );
        let mut next = desired(3, None);
        next.spec.configs = None;
        overwrite(&mut dep, &next);
        let spec = dep.spec.unwrap();
        assert_eq!(spec.min_ready_seconds, None);
        assert_eq!(spec, next.spec.underlying);
        assert!(dep.metadata.labels.is_none());
    }

    #[test]
    fn empty_configs_yield_no_labels() {
        let mut d = desired(1, None);
        d.spec.configs = Some(BTreeMap::new());
        assert!(config_labels(&d.spec).is_none());
    }
}
