//! In-memory representation of the kubeadm configuration API.
//!
//! Only the fields this tool reads are typed. Everything else in a
//! ClusterConfiguration document is carried through untouched so that the
//! uploaded copy matches what the operator wrote.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::constants::{DEFAULT_API_BIND_PORT, DEFAULT_DNS_DOMAIN};
use crate::error::KucError;

/// Options for registering this node with the cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeRegistrationOptions {
    pub name: String,
    pub cri_socket: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub kubelet_extra_args: BTreeMap<String, String>,
}

/// Address the API server of one control-plane node listens on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiEndpoint {
    pub advertise_address: String,
    pub bind_port: u16,
}

impl Default for ApiEndpoint {
    fn default() -> Self {
        Self {
            advertise_address: String::new(),
            bind_port: DEFAULT_API_BIND_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Networking {
    pub dns_domain: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_subnet: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pod_subnet: String,
}

impl Default for Networking {
    fn default() -> Self {
        Self {
            dns_domain: DEFAULT_DNS_DOMAIN.to_string(),
            service_subnet: "10.96.0.0/12".to_string(),
            pod_subnet: String::new(),
        }
    }
}

/// Cluster-wide settings shared by every control-plane node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterConfiguration {
    pub kubernetes_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub control_plane_endpoint: String,
    pub cluster_name: String,
    pub networking: Networking,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for ClusterConfiguration {
    fn default() -> Self {
        Self {
            kubernetes_version: String::new(),
            control_plane_endpoint: String::new(),
            cluster_name: "kubernetes".to_string(),
            networking: Networking::default(),
            extra: BTreeMap::new(),
        }
    }
}

/// Runtime state of the cluster as recorded in the kubeadm-config ConfigMap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterStatus {
    pub api_endpoints: BTreeMap<String, ApiEndpoint>,
}

/// Everything needed to bootstrap the first control-plane node.
///
/// The `InitConfiguration` document only carries node-local settings; the
/// cluster-wide `ClusterConfiguration` and the optional `KubeletConfiguration`
/// come from sibling documents in the same file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitConfiguration {
    pub node_registration: NodeRegistrationOptions,
    #[serde(rename = "localAPIEndpoint")]
    pub local_api_endpoint: ApiEndpoint,
    #[serde(skip)]
    pub cluster_configuration: ClusterConfiguration,
    #[serde(skip)]
    pub kubelet_configuration: Option<Mapping>,
}

/// Serialize `obj` as a YAML document headed by `apiVersion` and `kind`.
pub fn to_yaml_document<T: Serialize>(
    obj: &T,
    api_version: &str,
    kind: &str,
) -> Result<String, KucError> {
    let body = serde_yaml::to_value(obj)
        .map_err(|e| KucError::InvalidConfig(format!("Failed to encode {kind}: {e}")))?;

    let mut doc = Mapping::new();
    doc.insert("apiVersion".into(), api_version.into());
    doc.insert("kind".into(), kind.into());
    if let Value::Mapping(fields) = body {
        for (k, v) in fields {
            if k.as_str() == Some("apiVersion") || k.as_str() == Some("kind") {
                continue;
            }
            doc.insert(k, v);
        }
    }

    serde_yaml::to_string(&doc)
        .map_err(|e| KucError::InvalidConfig(format!("Failed to encode {kind}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_yaml_document_puts_type_meta_first() {
        let cfg = ClusterConfiguration {
            kubernetes_version: "v1.14.0".to_string(),
            ..Default::default()
        };
        let yaml = to_yaml_document(&cfg, "kubeadm.k8s.io/v1beta1", "ClusterConfiguration")
            .unwrap();

        let mut lines = yaml.lines();
        assert_eq!(lines.next(), Some("apiVersion: kubeadm.k8s.io/v1beta1"));
        assert_eq!(lines.next(), Some("kind: ClusterConfiguration"));
        assert!(yaml.contains("kubernetesVersion: v1.14.0"));
        assert!(yaml.contains("dnsDomain: cluster.local"));
    }

    #[test]
    fn test_cluster_configuration_keeps_unknown_fields() {
        let yaml = r#"
kubernetesVersion: v1.14.2
imageRepository: registry.example.com
apiServer:
  certSANs:
    - 10.0.0.1
"#;
        let cfg: ClusterConfiguration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.kubernetes_version, "v1.14.2");
        assert_eq!(cfg.cluster_name, "kubernetes");
        assert!(cfg.extra.contains_key("imageRepository"));
        assert!(cfg.extra.contains_key("apiServer"));

        let out = to_yaml_document(&cfg, "kubeadm.k8s.io/v1beta1", "ClusterConfiguration")
            .unwrap();
        assert!(out.contains("imageRepository: registry.example.com"));
        assert!(out.contains("certSANs"));
    }

    #[test]
    fn test_cluster_status_round_trips_endpoint_keys() {
        let mut status = ClusterStatus::default();
        status.api_endpoints.insert(
            "node-1".to_string(),
            ApiEndpoint {
                advertise_address: "10.0.0.10".to_string(),
                bind_port: 6443,
            },
        );
        let yaml = serde_yaml::to_string(&status).unwrap();
        assert!(yaml.contains("apiEndpoints:"));
        assert!(yaml.contains("advertiseAddress: 10.0.0.10"));
        assert!(yaml.contains("bindPort: 6443"));
    }

    #[test]
    fn test_init_configuration_field_names() {
        let yaml = r#"
nodeRegistration:
  name: node-1
  criSocket: unix:///run/x.sock
localAPIEndpoint:
  advertiseAddress: 192.168.0.2
"#;
        let cfg: InitConfiguration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.node_registration.name, "node-1");
        assert_eq!(cfg.node_registration.cri_socket, "unix:///run/x.sock");
        assert_eq!(cfg.local_api_endpoint.advertise_address, "192.168.0.2");
        assert_eq!(cfg.local_api_endpoint.bind_port, 6443);
    }
}
