//! In-memory [`ClusterClient`] for tests.
//!
//! Stores applied objects, counts calls per operation and can be told to fail
//! a given operation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};

use crate::error::KucError;
use crate::k8s::client::ClusterClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetConfigMap,
    ApplyConfigMap,
    ApplyRole,
    ApplyRoleBinding,
    AnnotateNode,
}

/// Everything the fake cluster currently holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub config_maps: BTreeMap<(String, String), ConfigMap>,
    pub roles: BTreeMap<String, Role>,
    pub role_bindings: BTreeMap<String, RoleBinding>,
    pub node_annotations: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Default)]
struct State {
    objects: Snapshot,
    calls: HashMap<Operation, usize>,
    failures: HashMap<Operation, String>,
    annotate_calls: Vec<(String, BTreeMap<String, String>)>,
}

#[derive(Default)]
pub struct FakeClusterClient {
    state: Mutex<State>,
}

impl FakeClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node that can be annotated.
    pub fn with_node(self, name: &str) -> Self {
        self.lock()
            .objects
            .node_annotations
            .insert(name.to_string(), BTreeMap::new());
        self
    }

    /// Make every later call of `op` fail with `message`.
    pub fn fail_on(&self, op: Operation, message: &str) {
        self.lock().failures.insert(op, message.to_string());
    }

    pub fn calls(&self, op: Operation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn annotate_calls(&self) -> Vec<(String, BTreeMap<String, String>)> {
        self.lock().annotate_calls.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock().objects.clone()
    }

    pub fn config_map(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
        self.lock()
            .objects
            .config_maps
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn role(&self, name: &str) -> Option<Role> {
        self.lock().objects.roles.get(name).cloned()
    }

    pub fn role_binding(&self, name: &str) -> Option<RoleBinding> {
        self.lock().objects.role_bindings.get(name).cloned()
    }

    pub fn node_annotations(&self, node: &str) -> Option<BTreeMap<String, String>> {
        self.lock().objects.node_annotations.get(node).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the call and return the state, or the injected failure.
    fn begin(&self, op: Operation) -> Result<MutexGuard<'_, State>, KucError> {
        let mut state = self.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        if let Some(message) = state.failures.get(&op).cloned() {
            return Err(KucError::KubernetesApi(message));
        }
        Ok(state)
    }
}

fn key(meta: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) -> (String, String) {
    (
        meta.namespace.clone().unwrap_or_default(),
        meta.name.clone().unwrap_or_default(),
    )
}

#[async_trait]
impl ClusterClient for FakeClusterClient {
    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, KucError> {
        let state = self.begin(Operation::GetConfigMap)?;
        Ok(state
            .objects
            .config_maps
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn apply_config_map(&self, config_map: &ConfigMap) -> Result<(), KucError> {
        let mut state = self.begin(Operation::ApplyConfigMap)?;
        state
            .objects
            .config_maps
            .insert(key(&config_map.metadata), config_map.clone());
        Ok(())
    }

    async fn apply_role(&self, role: &Role) -> Result<(), KucError> {
        let mut state = self.begin(Operation::ApplyRole)?;
        state
            .objects
            .roles
            .insert(key(&role.metadata).1, role.clone());
        Ok(())
    }

    async fn apply_role_binding(&self, binding: &RoleBinding) -> Result<(), KucError> {
        let mut state = self.begin(Operation::ApplyRoleBinding)?;
        state
            .objects
            .role_bindings
            .insert(key(&binding.metadata).1, binding.clone());
        Ok(())
    }

    async fn annotate_node(
        &self,
        node: &str,
        annotations: &BTreeMap<String, String>,
    ) -> Result<(), KucError> {
        let mut state = self.begin(Operation::AnnotateNode)?;
        state
            .annotate_calls
            .push((node.to_string(), annotations.clone()));

        let existing = state
            .objects
            .node_annotations
            .get_mut(node)
            .ok_or_else(|| KucError::KubernetesApi(format!("Node '{node}' not found")))?;
        existing.extend(annotations.clone());
        Ok(())
    }
}
