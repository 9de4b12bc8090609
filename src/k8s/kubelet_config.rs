//! Persist the cluster-wide kubelet configuration into `kubelet-config-1.X`.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_yaml::Value;

use crate::constants::{
    KUBELET_API_VERSION, KUBELET_BASE_CONFIG_KEY, KUBELET_BASE_CONFIG_MAP_PREFIX,
    KUBELET_BASE_CONFIG_ROLE_PREFIX, NAMESPACE_SYSTEM, NODE_BOOTSTRAP_TOKEN_AUTH_GROUP,
    NODES_GROUP,
};
use crate::error::KucError;
use crate::k8s::client::ClusterClient;
use crate::k8s::rbac;
use crate::kubeadm::InitConfiguration;
use crate::kubeadm::types::to_yaml_document;
use crate::kubeadm::version::parse_k8s_version;

/// Name of the kubelet ConfigMap for a control plane version, e.g. `kubelet-config-1.14`.
pub fn config_map_name(kubernetes_version: &str) -> Result<String, KucError> {
    let (major, minor) = parse_k8s_version(kubernetes_version)?;
    Ok(format!("{KUBELET_BASE_CONFIG_MAP_PREFIX}{major}.{minor}"))
}

/// Upload the kubelet configuration and let nodes read it.
pub async fn create_config_map(
    cfg: &InitConfiguration,
    client: &dyn ClusterClient,
) -> Result<(), KucError> {
    let name = config_map_name(&cfg.cluster_configuration.kubernetes_version)?;

    println!(
        "[kubelet] Creating a ConfigMap \"{}\" in namespace {} with the configuration for the kubelets in the cluster",
        name, NAMESPACE_SYSTEM
    );

    let config_map = ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: Some(NAMESPACE_SYSTEM.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            KUBELET_BASE_CONFIG_KEY.to_string(),
            kubelet_configuration_yaml(cfg)?,
        )])),
        ..Default::default()
    };
    client.apply_config_map(&config_map).await?;

    let role_name = format!("{KUBELET_BASE_CONFIG_ROLE_PREFIX}{name}");
    client
        .apply_role(&rbac::config_map_reader_role(&role_name, &name))
        .await?;
    client
        .apply_role_binding(&rbac::groups_role_binding(
            &role_name,
            &[NODES_GROUP, NODE_BOOTSTRAP_TOKEN_AUTH_GROUP],
        ))
        .await?;

    Ok(())
}

/// Render the KubeletConfiguration document, filling in the cluster domain
/// when the operator did not set one.
fn kubelet_configuration_yaml(cfg: &InitConfiguration) -> Result<String, KucError> {
    let mut doc = cfg.kubelet_configuration.clone().unwrap_or_default();

    let api_version = doc
        .get("apiVersion")
        .and_then(Value::as_str)
        .unwrap_or(KUBELET_API_VERSION)
        .to_string();

    if !doc.contains_key("clusterDomain") {
        doc.insert(
            "clusterDomain".into(),
            cfg.cluster_configuration.networking.dns_domain.clone().into(),
        );
    }

    to_yaml_document(&doc, &api_version, "KubeletConfiguration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::fake::{FakeClusterClient, Operation};
    use serde_yaml::Mapping;

    fn test_config() -> InitConfiguration {
        let mut cfg = InitConfiguration::default();
        cfg.node_registration.name = "node-1".to_string();
        cfg.cluster_configuration.kubernetes_version = "v1.14.2".to_string();
        cfg
    }

    #[test]
    fn test_config_map_name() {
        assert_eq!(config_map_name("v1.14.2").unwrap(), "kubelet-config-1.14");
        assert_eq!(config_map_name("1.31").unwrap(), "kubelet-config-1.31");
        assert!(config_map_name("").is_err());
    }

    #[test]
    fn test_kubelet_configuration_yaml_defaults() {
        let yaml = kubelet_configuration_yaml(&test_config()).unwrap();
        assert!(yaml.starts_with("apiVersion: kubelet.config.k8s.io/v1beta1\nkind: KubeletConfiguration\n"));
        assert!(yaml.contains("clusterDomain: cluster.local"));
    }

    #[test]
    fn test_kubelet_configuration_yaml_keeps_operator_values() {
        let mut cfg = test_config();
        let mut doc = Mapping::new();
        doc.insert("apiVersion".into(), "kubelet.config.k8s.io/v1beta1".into());
        doc.insert("kind".into(), "KubeletConfiguration".into());
        doc.insert("clusterDomain".into(), "corp.local".into());
        doc.insert("cgroupDriver".into(), "systemd".into());
        cfg.kubelet_configuration = Some(doc);

        let yaml = kubelet_configuration_yaml(&cfg).unwrap();
        assert!(yaml.contains("clusterDomain: corp.local"));
        assert!(yaml.contains("cgroupDriver: systemd"));
        assert_eq!(yaml.matches("kind:").count(), 1);
    }

    #[tokio::test]
    async fn test_create_config_map() {
        let client = FakeClusterClient::new();
        create_config_map(&test_config(), &client).await.unwrap();

        let cm = client
            .config_map(NAMESPACE_SYSTEM, "kubelet-config-1.14")
            .unwrap();
        assert!(cm.data.unwrap().contains_key(KUBELET_BASE_CONFIG_KEY));
        assert!(client.role("kubeadm:kubelet-config-1.14").is_some());
        assert!(client.role_binding("kubeadm:kubelet-config-1.14").is_some());
    }

    #[tokio::test]
    async fn test_create_config_map_invalid_version_writes_nothing() {
        let client = FakeClusterClient::new();
        let mut cfg = test_config();
        cfg.cluster_configuration.kubernetes_version = "stable".to_string();

        let err = create_config_map(&cfg, &client).await.unwrap_err();
        assert_eq!(err, KucError::InvalidVersion("stable".to_string()));
        assert_eq!(client.calls(Operation::ApplyConfigMap), 0);
    }
}
