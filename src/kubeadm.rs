//! kubeadm configuration types, loading and version helpers.

pub mod loader;
pub mod types;
pub mod version;

pub use types::{ClusterStatus, InitConfiguration};
