//! Node metadata written during bootstrap.

use std::collections::BTreeMap;

use tracing::debug;

use crate::constants::ANNOTATION_CRI_SOCKET;
use crate::error::KucError;
use crate::k8s::client::ClusterClient;

/// Record on the Node object which container runtime socket it uses.
pub async fn annotate_cri_socket(
    client: &dyn ClusterClient,
    node_name: &str,
    cri_socket: &str,
) -> Result<(), KucError> {
    debug!(
        "Annotating Node '{}' with {}={}",
        node_name, ANNOTATION_CRI_SOCKET, cri_socket
    );

    let annotations =
        BTreeMap::from([(ANNOTATION_CRI_SOCKET.to_string(), cri_socket.to_string())]);
    client.annotate_node(node_name, &annotations).await
}
