//! WiFi provisioning service facade

use std::{sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
    backend::NetworkBridge,
    core::{
        credentials::{CredentialStage, ScratchStore},
        error::ScratchResult,
        types::{ConnectionOutcome, ScratchKey},
        workflow::ProvisioningWorkflow,
    },
};

/// Reported in place of an SSID when no WiFi network is active
pub const NOT_CONNECTED: &str = "Not Connected";

/// WiFi provisioning service facade
///
/// Owns the credential stage and the workflow, and answers the live
/// network queries of the SSID characteristic.
pub struct ProvisioningService<B: NetworkBridge> {
    bridge: Arc<B>,
    store: ScratchStore,
    stage: RwLock<CredentialStage>,
    workflow: ProvisioningWorkflow<B>,
}

impl<B: NetworkBridge> ProvisioningService<B> {
    pub fn new(bridge: Arc<B>, store: ScratchStore, settle_delay: Duration) -> Self {
        let workflow = ProvisioningWorkflow::new(bridge.clone(), store.clone(), settle_delay);

        Self {
            bridge,
            store,
            stage: RwLock::new(CredentialStage::new()),
            workflow,
        }
    }

    /// Name of the active WiFi network, or [`NOT_CONNECTED`]
    ///
    /// Never fails: a bridge error reads as not connected.
    pub async fn current_ssid(&self) -> String {
        match self.bridge.active_ssid().await {
            Ok(Some(ssid)) => ssid,
            Ok(None) => NOT_CONNECTED.to_string(),
            Err(e) => {
                warn!("Active network query failed: {}", e);
                NOT_CONNECTED.to_string()
            }
        }
    }

    /// Stage and persist a newly written SSID
    pub async fn stage_ssid(&self, value: &[u8]) -> ScratchResult<()> {
        self.stage_value(ScratchKey::Ssid, value).await
    }

    /// Stage and persist a newly written password, then run the workflow
    ///
    /// Every call runs the workflow exactly once, whether or not an SSID was
    /// ever staged and even for an empty password.
    pub async fn stage_password(&self, value: &[u8]) -> ScratchResult<ConnectionOutcome> {
        self.stage_value(ScratchKey::Password, value).await?;
        Ok(self.workflow.run().await)
    }

    /// Snapshot of the in-memory credential stage
    pub async fn stage(&self) -> CredentialStage {
        self.stage.read().await.clone()
    }

    async fn stage_value(&self, key: ScratchKey, value: &[u8]) -> ScratchResult<()> {
        debug!("Staging {} ({} bytes)", key, value.len());
        self.stage.write().await.set(key, value.to_vec());
        self.store.persist(key, value).await
    }
}
