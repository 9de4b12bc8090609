//! Load an `InitConfiguration` from a multi-document kubeadm config file.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use crate::constants::DEFAULT_CRI_SOCKET;
use crate::error::KucError;
use crate::kubeadm::types::{ClusterConfiguration, InitConfiguration};
use crate::kubeadm::version::parse_k8s_version;

const KUBEADM_GROUP: &str = "kubeadm.k8s.io/";

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub kubernetes_version: Option<String>,
    pub node_name: Option<String>,
}

/// Load, default and validate the configuration used by `init` phases.
///
/// Without a config file the built-in defaults are used; the Kubernetes
/// version then has to come from `opts`.
pub fn load_init_configuration(
    path: Option<&Path>,
    opts: &LoadOptions,
) -> Result<InitConfiguration, KucError> {
    let mut cfg = match path {
        Some(path) => {
            debug!("Loading kubeadm configuration from {}", path.display());
            let content = fs::read_to_string(path).map_err(|e| KucError::ConfigFile {
                path: path.display().to_string(),
                details: e.to_string(),
            })?;
            parse_documents(&content)?
        }
        None => {
            debug!("No config file given, using default configuration");
            InitConfiguration::default()
        }
    };

    if let Some(version) = &opts.kubernetes_version {
        cfg.cluster_configuration.kubernetes_version = version.clone();
    }
    if let Some(name) = &opts.node_name {
        cfg.node_registration.name = name.clone();
    }

    set_defaults(&mut cfg);
    validate(&cfg)?;

    Ok(cfg)
}

/// Split a YAML stream into documents and dispatch each one on its `kind`.
pub fn parse_documents(content: &str) -> Result<InitConfiguration, KucError> {
    let mut init: Option<InitConfiguration> = None;
    let mut cluster: Option<ClusterConfiguration> = None;
    let mut kubelet: Option<Mapping> = None;

    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document)
            .map_err(|e| KucError::InvalidConfig(format!("Malformed YAML document: {e}")))?;

        let mut fields = match value {
            Value::Null => continue,
            Value::Mapping(fields) => fields,
            _ => {
                return Err(KucError::InvalidConfig(
                    "Every document must be a YAML mapping".to_string(),
                ));
            }
        };

        let kind = string_field(&fields, "kind");
        let api_version = string_field(&fields, "apiVersion");

        match kind.as_str() {
            "InitConfiguration" | "ClusterConfiguration" => {
                if !api_version.starts_with(KUBEADM_GROUP) {
                    return Err(KucError::InvalidConfig(format!(
                        "{kind} has unsupported apiVersion '{api_version}'"
                    )));
                }
                fields.remove("kind");
                fields.remove("apiVersion");

                if kind == "InitConfiguration" {
                    set_once(&mut init, decode(fields, &kind)?, &kind)?;
                } else {
                    set_once(&mut cluster, decode(fields, &kind)?, &kind)?;
                }
            }
            "KubeletConfiguration" => set_once(&mut kubelet, fields, &kind)?,
            "" => {
                return Err(KucError::InvalidConfig(
                    "Document is missing the 'kind' field".to_string(),
                ));
            }
            other => warn!("Ignoring unsupported document kind {}", other),
        }
    }

    let mut cfg = init.unwrap_or_default();
    if let Some(cluster) = cluster {
        cfg.cluster_configuration = cluster;
    }
    cfg.kubelet_configuration = kubelet;

    Ok(cfg)
}

fn string_field(fields: &Mapping, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn decode<T: DeserializeOwned>(fields: Mapping, kind: &str) -> Result<T, KucError> {
    serde_yaml::from_value(Value::Mapping(fields))
        .map_err(|e| KucError::InvalidConfig(format!("Failed to decode {kind}: {e}")))
}

fn set_once<T>(slot: &mut Option<T>, value: T, kind: &str) -> Result<(), KucError> {
    if slot.is_some() {
        return Err(KucError::InvalidConfig(format!(
            "{kind} is specified more than once"
        )));
    }
    *slot = Some(value);
    Ok(())
}

fn set_defaults(cfg: &mut InitConfiguration) {
    let registration = &mut cfg.node_registration;
    if registration.name.is_empty()
        && let Some(name) = system_hostname()
    {
        debug!("Defaulting node name to host name {}", name);
        registration.name = name;
    }
    if registration.cri_socket.is_empty() {
        registration.cri_socket = DEFAULT_CRI_SOCKET.to_string();
    }
}

fn validate(cfg: &InitConfiguration) -> Result<(), KucError> {
    let version = &cfg.cluster_configuration.kubernetes_version;
    if version.is_empty() {
        return Err(KucError::InvalidConfig(
            "kubernetesVersion is required (set it in ClusterConfiguration or pass --kubernetes-version)"
                .to_string(),
        ));
    }
    parse_k8s_version(version)?;

    if cfg.node_registration.name.is_empty() {
        return Err(KucError::InvalidConfig(
            "nodeRegistration.name is empty and the host name could not be detected".to_string(),
        ));
    }

    Ok(())
}

/// Node names are lowercase host names.
fn system_hostname() -> Option<String> {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .map(|h| h.trim().to_lowercase())
        .filter(|h| !h.is_empty())
}
