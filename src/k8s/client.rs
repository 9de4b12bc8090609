//! Cluster client abstraction and its kube-rs backed implementation.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1::{ConfigMap, Node};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::api::{Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::constants::FIELD_MANAGER;
use crate::error::KucError;

/// The operations the upload-config collaborators need from the API server.
///
/// Every write is expected to be idempotent: applying the same object twice
/// leaves the cluster in the same state as applying it once.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, KucError>;

    /// Create the ConfigMap or replace the fields this tool manages.
    async fn apply_config_map(&self, config_map: &ConfigMap) -> Result<(), KucError>;

    async fn apply_role(&self, role: &Role) -> Result<(), KucError>;

    async fn apply_role_binding(&self, binding: &RoleBinding) -> Result<(), KucError>;

    /// Merge `annotations` into the node's metadata.
    async fn annotate_node(
        &self,
        node: &str,
        annotations: &BTreeMap<String, String>,
    ) -> Result<(), KucError>;
}

/// Shared handle to the cluster, resolved once per phase invocation.
pub type ClientHandle = Arc<dyn ClusterClient>;

/// Build a client from the kubeconfig file at `path`.
pub async fn build_client(path: &Path) -> Result<ClientHandle, KucError> {
    debug!("Using kubeconfig file: {}", path.display());

    let kubeconfig = Kubeconfig::read_from(path)
        .map_err(|e| KucError::Kubeconfig(format!("{}: {}", path.display(), e)))?;
    let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| KucError::Kubeconfig(format!("{}: {}", path.display(), e)))?;
    let client = kube::Client::try_from(config)
        .map_err(|e| KucError::Kubeconfig(format!("{}: {}", path.display(), e)))?;

    Ok(Arc::new(KubeClusterClient::new(client)))
}

/// [`ClusterClient`] talking to a real API server.
///
/// Namespaced objects are written with server-side apply, node annotations
/// with a JSON merge patch.
pub struct KubeClusterClient {
    client: kube::Client,
}

impl KubeClusterClient {
    pub const fn new(client: kube::Client) -> Self {
        Self { client }
    }

    async fn apply_namespaced<K>(&self, obj: &K) -> Result<(), KucError>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Serialize
            + Debug,
    {
        let kind = K::kind(&());
        let meta = obj.meta();
        let name = meta
            .name
            .as_deref()
            .ok_or_else(|| KucError::KubernetesApi(format!("{kind} has no name")))?;
        let namespace = meta
            .namespace
            .as_deref()
            .ok_or_else(|| KucError::KubernetesApi(format!("{kind} {name} has no namespace")))?;

        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.patch(
            name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(obj),
        )
        .await
        .map_err(|e| {
            KucError::KubernetesApi(format!("Failed to apply {kind} {namespace}/{name}: {e}"))
        })?;

        debug!("Applied {} {}/{}", kind, namespace, name);
        Ok(())
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, KucError> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await.map_err(|e| {
            KucError::KubernetesApi(format!(
                "Failed to get ConfigMap {namespace}/{name}: {e}"
            ))
        })
    }

    async fn apply_config_map(&self, config_map: &ConfigMap) -> Result<(), KucError> {
        self.apply_namespaced(config_map).await
    }

    async fn apply_role(&self, role: &Role) -> Result<(), KucError> {
        self.apply_namespaced(role).await
    }

    async fn apply_role_binding(&self, binding: &RoleBinding) -> Result<(), KucError> {
        self.apply_namespaced(binding).await
    }

    async fn annotate_node(
        &self,
        node: &str,
        annotations: &BTreeMap<String, String>,
    ) -> Result<(), KucError> {
        let api: Api<Node> = Api::all(self.client.clone());
        let patch = serde_json::json!({
            "metadata": {
                "annotations": annotations
            }
        });

        debug!("Patching Node '{}' with: {}", node, patch);

        api.patch(node, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(|e| {
                if e.to_string().contains("NotFound") {
                    KucError::KubernetesApi(format!("Node '{node}' not found"))
                } else {
                    KucError::KubernetesApi(format!("Failed to patch Node '{node}': {e}"))
                }
            })?;

        Ok(())
    }
}

/// [`ClusterClient`] that prints what it would write and reads nothing.
#[derive(Debug, Default)]
pub struct DryRunClient;

impl DryRunClient {
    fn report<T: Serialize>(kind: &str, target: &str, obj: &T) {
        println!(
            "{} Would apply {} '{}'",
            "[DRY RUN]".yellow(),
            kind,
            target.bold()
        );
        if let Ok(yaml) = serde_yaml::to_string(obj) {
            debug!("{} {}:\n{}", kind, target, yaml);
        }
    }
}

fn qualified_name(meta: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) -> String {
    format!(
        "{}/{}",
        meta.namespace.as_deref().unwrap_or_default(),
        meta.name.as_deref().unwrap_or_default()
    )
}

#[async_trait]
impl ClusterClient for DryRunClient {
    async fn get_config_map(
        &self,
        _namespace: &str,
        _name: &str,
    ) -> Result<Option<ConfigMap>, KucError> {
        Ok(None)
    }

    async fn apply_config_map(&self, config_map: &ConfigMap) -> Result<(), KucError> {
        Self::report("ConfigMap", &qualified_name(&config_map.metadata), config_map);
        Ok(())
    }

    async fn apply_role(&self, role: &Role) -> Result<(), KucError> {
        Self::report("Role", &qualified_name(&role.metadata), role);
        Ok(())
    }

    async fn apply_role_binding(&self, binding: &RoleBinding) -> Result<(), KucError> {
        Self::report("RoleBinding", &qualified_name(&binding.metadata), binding);
        Ok(())
    }

    async fn annotate_node(
        &self,
        node: &str,
        annotations: &BTreeMap<String, String>,
    ) -> Result<(), KucError> {
        Self::report("annotations to Node", node, annotations);
        Ok(())
    }
}
