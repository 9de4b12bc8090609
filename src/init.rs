//! Execution context for `init` phases.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::KucError;
use crate::k8s::ClientHandle;
use crate::k8s::client::{DryRunClient, build_client};
use crate::kubeadm::InitConfiguration;
use crate::phases::upload_config::UploadConfigData;
use crate::workflow::RunData;

/// State shared by all phases of one `init` invocation.
pub struct InitData {
    cfg: InitConfiguration,
    kubeconfig_path: PathBuf,
    dry_run: bool,
    client: OnceCell<ClientHandle>,
}

impl InitData {
    pub fn new(cfg: InitConfiguration, kubeconfig_path: PathBuf, dry_run: bool) -> Self {
        Self {
            cfg,
            kubeconfig_path,
            dry_run,
            client: OnceCell::new(),
        }
    }
}

impl RunData for InitData {
    fn upload_config_data(&self) -> Option<&dyn UploadConfigData> {
        Some(self)
    }
}

#[async_trait]
impl UploadConfigData for InitData {
    fn cfg(&self) -> &InitConfiguration {
        &self.cfg
    }

    /// The client is built on first use and shared by every later phase.
    async fn client(&self) -> Result<ClientHandle, KucError> {
        self.client
            .get_or_try_init(|| async {
                if self.dry_run {
                    debug!("Dry run: cluster writes will be printed instead of applied");
                    Ok(Arc::new(DryRunClient) as ClientHandle)
                } else {
                    build_client(&self.kubeconfig_path).await
                }
            })
            .await
            .cloned()
    }
}
