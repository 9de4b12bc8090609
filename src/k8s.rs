//! Kubernetes access and the idempotent writes the upload-config phase drives.

pub mod client;
pub mod cluster_config;
#[cfg(test)]
pub mod fake;
pub mod kubelet_config;
pub mod node;
pub mod rbac;

pub use client::ClientHandle;
