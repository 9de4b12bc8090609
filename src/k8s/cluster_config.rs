//! Persist the kubeadm ClusterConfiguration into the `kubeadm-config` ConfigMap.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::debug;

use crate::constants::{
    CLUSTER_CONFIGURATION_KEY, CLUSTER_STATUS_KEY, KUBEADM_API_VERSION, KUBEADM_CONFIG_CONFIG_MAP,
    NAMESPACE_SYSTEM, NODE_BOOTSTRAP_TOKEN_AUTH_GROUP, NODES_GROUP, NODES_KUBEADM_CONFIG_ROLE,
};
use crate::error::KucError;
use crate::k8s::client::ClusterClient;
use crate::k8s::rbac;
use crate::kubeadm::types::to_yaml_document;
use crate::kubeadm::{ClusterStatus, InitConfiguration};

/// Upload the cluster configuration and register this node's API endpoint.
///
/// The ClusterStatus already stored in the ConfigMap is merged, so endpoints
/// of other control-plane nodes survive. Re-running with the same input
/// produces the same objects.
pub async fn upload_configuration(
    cfg: &InitConfiguration,
    client: &dyn ClusterClient,
) -> Result<(), KucError> {
    println!(
        "[upload-config] storing the configuration used in ConfigMap \"{}\" in the \"{}\" Namespace",
        KUBEADM_CONFIG_CONFIG_MAP, NAMESPACE_SYSTEM
    );

    let cluster_yaml = to_yaml_document(
        &cfg.cluster_configuration,
        KUBEADM_API_VERSION,
        "ClusterConfiguration",
    )?;

    let existing = client
        .get_config_map(NAMESPACE_SYSTEM, KUBEADM_CONFIG_CONFIG_MAP)
        .await?;
    let mut status = match existing.as_ref() {
        Some(cm) => stored_cluster_status(cm)?,
        None => ClusterStatus::default(),
    };
    status.api_endpoints.insert(
        cfg.node_registration.name.clone(),
        cfg.local_api_endpoint.clone(),
    );
    debug!(
        "ClusterStatus lists {} API endpoint(s)",
        status.api_endpoints.len()
    );
    let status_yaml = to_yaml_document(&status, KUBEADM_API_VERSION, "ClusterStatus")?;

    let config_map = ConfigMap {
        metadata: ObjectMeta {
            name: Some(KUBEADM_CONFIG_CONFIG_MAP.to_string()),
            namespace: Some(NAMESPACE_SYSTEM.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([
            (CLUSTER_CONFIGURATION_KEY.to_string(), cluster_yaml),
            (CLUSTER_STATUS_KEY.to_string(), status_yaml),
        ])),
        ..Default::default()
    };
    client.apply_config_map(&config_map).await?;

    client
        .apply_role(&rbac::config_map_reader_role(
            NODES_KUBEADM_CONFIG_ROLE,
            KUBEADM_CONFIG_CONFIG_MAP,
        ))
        .await?;
    client
        .apply_role_binding(&rbac::groups_role_binding(
            NODES_KUBEADM_CONFIG_ROLE,
            &[NODE_BOOTSTRAP_TOKEN_AUTH_GROUP, NODES_GROUP],
        ))
        .await?;

    Ok(())
}

/// Decode the ClusterStatus document of an existing `kubeadm-config` map.
fn stored_cluster_status(config_map: &ConfigMap) -> Result<ClusterStatus, KucError> {
    let Some(raw) = config_map
        .data
        .as_ref()
        .and_then(|data| data.get(CLUSTER_STATUS_KEY))
    else {
        return Ok(ClusterStatus::default());
    };

    serde_yaml::from_str(raw).map_err(|e| {
        KucError::InvalidConfig(format!(
            "Failed to decode {CLUSTER_STATUS_KEY} stored in ConfigMap {KUBEADM_CONFIG_CONFIG_MAP}: {e}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::fake::{FakeClusterClient, Operation};
    use crate::kubeadm::types::ApiEndpoint;

    fn test_config(node: &str, address: &str) -> InitConfiguration {
        let mut cfg = InitConfiguration::default();
        cfg.node_registration.name = node.to_string();
        cfg.local_api_endpoint = ApiEndpoint {
            advertise_address: address.to_string(),
            bind_port: 6443,
        };
        cfg.cluster_configuration.kubernetes_version = "v1.14.2".to_string();
        cfg
    }

    fn stored_status(client: &FakeClusterClient) -> ClusterStatus {
        let cm = client
            .config_map(NAMESPACE_SYSTEM, KUBEADM_CONFIG_CONFIG_MAP)
            .expect("kubeadm-config stored");
        stored_cluster_status(&cm).unwrap()
    }

    #[tokio::test]
    async fn test_upload_configuration_writes_config_map_and_rbac() {
        let client = FakeClusterClient::new();
        upload_configuration(&test_config("node-1", "10.0.0.10"), &client)
            .await
            .unwrap();

        let cm = client
            .config_map(NAMESPACE_SYSTEM, KUBEADM_CONFIG_CONFIG_MAP)
            .unwrap();
        let data = cm.data.unwrap();
        assert!(data[CLUSTER_CONFIGURATION_KEY].contains("kind: ClusterConfiguration"));
        assert!(data[CLUSTER_CONFIGURATION_KEY].contains("kubernetesVersion: v1.14.2"));
        assert!(data[CLUSTER_STATUS_KEY].contains("kind: ClusterStatus"));

        assert!(client.role(NODES_KUBEADM_CONFIG_ROLE).is_some());
        assert!(client.role_binding(NODES_KUBEADM_CONFIG_ROLE).is_some());
    }

    #[tokio::test]
    async fn test_upload_configuration_merges_existing_endpoints() {
        let client = FakeClusterClient::new();
        upload_configuration(&test_config("node-1", "10.0.0.10"), &client)
            .await
            .unwrap();
        upload_configuration(&test_config("node-2", "10.0.0.11"), &client)
            .await
            .unwrap();

        let status = stored_status(&client);
        assert_eq!(status.api_endpoints.len(), 2);
        assert_eq!(
            status.api_endpoints["node-1"].advertise_address,
            "10.0.0.10"
        );
        assert_eq!(
            status.api_endpoints["node-2"].advertise_address,
            "10.0.0.11"
        );
    }

    #[tokio::test]
    async fn test_upload_configuration_is_idempotent() {
        let once = FakeClusterClient::new();
        let twice = FakeClusterClient::new();
        let cfg = test_config("node-1", "10.0.0.10");

        upload_configuration(&cfg, &once).await.unwrap();
        upload_configuration(&cfg, &twice).await.unwrap();
        upload_configuration(&cfg, &twice).await.unwrap();

        assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[tokio::test]
    async fn test_upload_configuration_stops_at_config_map_failure() {
        let client = FakeClusterClient::new();
        client.fail_on(Operation::ApplyConfigMap, "quota exceeded");

        let err = upload_configuration(&test_config("node-1", "10.0.0.10"), &client)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(client.calls(Operation::ApplyRole), 0);
        assert_eq!(client.calls(Operation::ApplyRoleBinding), 0);
    }

    #[test]
    fn test_stored_cluster_status_rejects_garbage() {
        let cm = ConfigMap {
            data: Some(BTreeMap::from([(
                CLUSTER_STATUS_KEY.to_string(),
                "apiEndpoints: [not, a, map]".to_string(),
            )])),
            ..Default::default()
        };
        assert!(stored_cluster_status(&cm).is_err());
    }
}
