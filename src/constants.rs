//! Well-known names shared by the upload-config phase and its collaborators.

/// Namespace holding cluster-wide bootstrap objects.
pub const NAMESPACE_SYSTEM: &str = "kube-system";

/// ConfigMap holding the kubeadm ClusterConfiguration and ClusterStatus.
pub const KUBEADM_CONFIG_CONFIG_MAP: &str = "kubeadm-config";
pub const CLUSTER_CONFIGURATION_KEY: &str = "ClusterConfiguration";
pub const CLUSTER_STATUS_KEY: &str = "ClusterStatus";

/// Role granting nodes read access to the kubeadm-config ConfigMap.
pub const NODES_KUBEADM_CONFIG_ROLE: &str = "kubeadm:nodes-kubeadm-config";

/// Prefix of the versioned kubelet ConfigMap, e.g. `kubelet-config-1.14`.
pub const KUBELET_BASE_CONFIG_MAP_PREFIX: &str = "kubelet-config-";
pub const KUBELET_BASE_CONFIG_KEY: &str = "kubelet";

/// Prefix of the Role/RoleBinding granting read access to the kubelet ConfigMap.
pub const KUBELET_BASE_CONFIG_ROLE_PREFIX: &str = "kubeadm:";

/// Node annotation recording the container runtime socket.
pub const ANNOTATION_CRI_SOCKET: &str = "kubeadm.alpha.kubernetes.io/cri-socket";

pub const NODES_GROUP: &str = "system:nodes";
pub const NODE_BOOTSTRAP_TOKEN_AUTH_GROUP: &str = "system:bootstrappers:kubeadm:default-node-token";

pub const KUBEADM_API_VERSION: &str = "kubeadm.k8s.io/v1beta1";
pub const KUBELET_API_VERSION: &str = "kubelet.config.k8s.io/v1beta1";

pub const DEFAULT_CRI_SOCKET: &str = "/var/run/dockershim.sock";
pub const DEFAULT_API_BIND_PORT: u16 = 6443;
pub const DEFAULT_DNS_DOMAIN: &str = "cluster.local";
pub const DEFAULT_KUBECONFIG_PATH: &str = "/etc/kubernetes/admin.conf";

/// Field manager used for server-side apply.
pub const FIELD_MANAGER: &str = "kuc";

/// Flag names a phase can declare as relevant to it.
pub mod flags {
    pub const CFG_PATH: &str = "config";
    pub const KUBECONFIG_PATH: &str = "kubeconfig";
}
