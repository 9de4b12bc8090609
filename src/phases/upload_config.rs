//! The `upload-config` phase.
//!
//! Persists the configuration this node was initialized with into the
//! cluster so later operations (joins, upgrades) read a single source of
//! truth. Two sub-phases:
//!
//! - `kubeadm`: the ClusterConfiguration, into the `kubeadm-config` ConfigMap
//! - `kubelet`: the kubelet component config, into `kubelet-config-1.X`, then
//!   the node is annotated with its container runtime socket
//!
//! Each run function performs its writes in a fixed order and returns at the
//! first failure. Nothing already written is rolled back; every write is
//! idempotent, so re-running the phase is the recovery path.

use async_trait::async_trait;
use const_format::formatcp;
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

use crate::constants::{KUBEADM_CONFIG_CONFIG_MAP, NAMESPACE_SYSTEM, flags};
use crate::error::{KucError, PhaseError};
use crate::k8s::{self, ClientHandle};
use crate::kubeadm::InitConfiguration;
use crate::workflow::{Phase, RunData};

pub const PHASE_NAME: &str = "upload-config";

/// What the upload-config phase needs from its execution context.
#[async_trait]
pub trait UploadConfigData: Send + Sync {
    fn cfg(&self) -> &InitConfiguration;

    /// Obtain the cluster client. May fail when no control plane is
    /// reachable or the credentials are unusable.
    async fn client(&self) -> Result<ClientHandle, KucError>;
}

const UPLOAD_KUBEADM_CONFIG_LONG: &str = formatcp!(
    "Uploads the kubeadm ClusterConfiguration to a ConfigMap called {} in the {} namespace.
This enables correct configuration of system components and a seamless user experience when upgrading.

Alternatively, you can use kubeadm config.",
    KUBEADM_CONFIG_CONFIG_MAP,
    NAMESPACE_SYSTEM
);

const UPLOAD_KUBEADM_CONFIG_EXAMPLE: &str = "  # Uploads the configuration of your cluster
  kuc phase upload-config kubeadm --config=myConfig.yaml";

const UPLOAD_KUBELET_CONFIG_LONG: &str = "Uploads kubelet configuration extracted from the kubeadm InitConfiguration object to a ConfigMap
of the form kubelet-config-1.X in the cluster, where X is the minor version of the current (API Server) Kubernetes version.";

const UPLOAD_KUBELET_CONFIG_EXAMPLE: &str = "  # Uploads the kubelet configuration from the kubeadm Config file to a ConfigMap in the cluster.
  kuc phase upload-config kubelet --config kubeadm.yaml";

const MACRO_COMMAND_LONG: &str =
    "This command is not meant to be run on its own. See list of available subcommands.";

/// Build the `upload-config` phase tree.
pub fn new_upload_config_phase() -> Phase {
    Phase {
        name: PHASE_NAME,
        aliases: &["uploadconfig"],
        short: "Uploads the kubeadm and kubelet configuration to a ConfigMap",
        long: MACRO_COMMAND_LONG,
        phases: vec![
            Phase {
                name: "kubeadm",
                short: "Uploads the kubeadm ClusterConfiguration to a ConfigMap",
                long: UPLOAD_KUBEADM_CONFIG_LONG,
                example: UPLOAD_KUBEADM_CONFIG_EXAMPLE,
                run: Some(run_upload_kubeadm_config),
                cmd_flags: upload_config_phase_flags(),
                ..Default::default()
            },
            Phase {
                name: "kubelet",
                short: "Uploads the kubelet component config to a ConfigMap",
                long: UPLOAD_KUBELET_CONFIG_LONG,
                example: UPLOAD_KUBELET_CONFIG_EXAMPLE,
                run: Some(run_upload_kubelet_config),
                cmd_flags: upload_config_phase_flags(),
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

fn upload_config_phase_flags() -> Vec<&'static str> {
    vec![flags::CFG_PATH, flags::KUBECONFIG_PATH]
}

/// Upload the kubeadm ClusterConfiguration to a ConfigMap.
fn run_upload_kubeadm_config(data: &dyn RunData) -> BoxFuture<'_, Result<(), PhaseError>> {
    async move {
        let (cfg, client) = resolve(data).await?;

        debug!("[upload-config] Uploading the kubeadm ClusterConfiguration to a ConfigMap");
        k8s::cluster_config::upload_configuration(cfg, client.as_ref())
            .await
            .map_err(PhaseError::Upload)
    }
    .boxed()
}

/// Upload the kubelet configuration to a ConfigMap and record the node's
/// CRI socket. The annotation is only written once the ConfigMap exists.
fn run_upload_kubelet_config(data: &dyn RunData) -> BoxFuture<'_, Result<(), PhaseError>> {
    async move {
        let (cfg, client) = resolve(data).await?;

        debug!("[upload-config] Uploading the kubelet component config to a ConfigMap");
        k8s::kubelet_config::create_config_map(cfg, client.as_ref())
            .await
            .map_err(PhaseError::ConfigMapCreation)?;

        debug!("[upload-config] Preserving the CRISocket information for the control-plane node");
        k8s::node::annotate_cri_socket(
            client.as_ref(),
            &cfg.node_registration.name,
            &cfg.node_registration.cri_socket,
        )
        .await
        .map_err(PhaseError::Annotation)
    }
    .boxed()
}

/// Extract the configuration and client from the execution context.
///
/// A client error is returned as is.
pub async fn resolve(
    data: &dyn RunData,
) -> Result<(&InitConfiguration, ClientHandle), PhaseError> {
    let data = data
        .upload_config_data()
        .ok_or(PhaseError::ContractViolation { phase: PHASE_NAME })?;

    let cfg = data.cfg();
    let client = data
        .client()
        .await
        .map_err(PhaseError::ClientResolution)?;

    Ok((cfg, client))
}
