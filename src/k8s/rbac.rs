//! RBAC objects granting joining nodes read access to a bootstrap ConfigMap.

use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::constants::NAMESPACE_SYSTEM;

/// Role allowing `get` on exactly one ConfigMap in `kube-system`.
pub fn config_map_reader_role(role_name: &str, config_map: &str) -> Role {
    Role {
        metadata: ObjectMeta {
            name: Some(role_name.to_string()),
            namespace: Some(NAMESPACE_SYSTEM.to_string()),
            ..Default::default()
        },
        rules: Some(vec![PolicyRule {
            api_groups: Some(vec![String::new()]),
            resources: Some(vec!["configmaps".to_string()]),
            resource_names: Some(vec![config_map.to_string()]),
            verbs: vec!["get".to_string()],
            ..Default::default()
        }]),
    }
}

/// Binding of the Role named `role_name` to every group in `groups`.
pub fn groups_role_binding(role_name: &str, groups: &[&str]) -> RoleBinding {
    RoleBinding {
        metadata: ObjectMeta {
            name: Some(role_name.to_string()),
            namespace: Some(NAMESPACE_SYSTEM.to_string()),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "Role".to_string(),
            name: role_name.to_string(),
        },
        subjects: Some(
            groups
                .iter()
                .map(|group| Subject {
                    api_group: Some("rbac.authorization.k8s.io".to_string()),
                    kind: "Group".to_string(),
                    name: (*group).to_string(),
                    namespace: None,
                })
                .collect(),
        ),
    }
}
