//! Custom error types for kuc.

use thiserror::Error;

/// Errors raised while loading configuration or talking to the cluster.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KucError {
    #[error("Kubeconfig error: {0}")]
    Kubeconfig(String),

    #[error("Kubernetes API error: {0}")]
    KubernetesApi(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid version format: {0}")]
    InvalidVersion(String),

    #[error("Failed to read config file {path}: {details}")]
    ConfigFile { path: String, details: String },
}

/// Failures of a single phase run function.
///
/// Each collaborator failure keeps the underlying cause as its source and
/// renders a fixed prefix naming the step that failed.
#[derive(Error, Debug)]
pub enum PhaseError {
    #[error("{phase} phase invoked with an invalid data struct")]
    ContractViolation { phase: &'static str },

    #[error(transparent)]
    ClientResolution(KucError),

    #[error("error uploading the kubeadm ClusterConfiguration: {0}")]
    Upload(#[source] KucError),

    #[error("error creating kubelet configuration ConfigMap: {0}")]
    ConfigMapCreation(#[source] KucError),

    #[error("Error writing Crisocket information for the control-plane node: {0}")]
    Annotation(#[source] KucError),
}

/// Errors raised by the phase workflow runner.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("unknown phase: {0}")]
    UnknownPhase(String),

    #[error("phase {name} is declared more than once under the same parent")]
    DuplicatePhase { name: String },

    #[error("error execution phase {name}: {source}")]
    Phase {
        name: String,
        #[source]
        source: PhaseError,
    },
}
