//! Provisioning workflow with state machine
//!
//! One run: read the staged credentials back from scratch storage, purge all
//! saved WiFi profiles, request a connection, wait for it to settle and check
//! that the requested SSID is the active network. There is no retry.

use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    backend::NetworkBridge,
    core::{
        credentials::ScratchStore,
        error::{ProvisioningError, ProvisioningResult},
        types::{ConnectionOutcome, ScratchKey, WorkflowState},
    },
};

/// Time given to NetworkManager to bring the connection up before verifying
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Per-run state machine
#[derive(Debug)]
struct WorkflowStateMachine {
    state: WorkflowState,
}

impl WorkflowStateMachine {
    fn new() -> Self {
        Self {
            state: WorkflowState::Idle,
        }
    }

    fn transition(&mut self, next: WorkflowState) -> ProvisioningResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(ProvisioningError::InvalidStateTransition {
                from: self.state,
                to: next,
            });
        }
        debug!("Workflow state {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Move to `Failed` from wherever the run stopped
    fn fail(&mut self) {
        if !self.state.is_terminal() {
            debug!("Workflow state {:?} -> {:?}", self.state, WorkflowState::Failed);
            self.state = WorkflowState::Failed;
        }
    }

    fn state(&self) -> WorkflowState {
        self.state
    }
}

/// Credentials as read back from scratch storage
struct StagedCredentials {
    ssid: String,
    password: String,
}

/// Provisioning workflow bound to a network bridge and scratch storage
pub struct ProvisioningWorkflow<B: NetworkBridge> {
    bridge: Arc<B>,
    store: ScratchStore,
    settle_delay: Duration,
    run_lock: Mutex<()>,
}

impl<B: NetworkBridge> ProvisioningWorkflow<B> {
    pub fn new(bridge: Arc<B>, store: ScratchStore, settle_delay: Duration) -> Self {
        Self {
            bridge,
            store,
            settle_delay,
            run_lock: Mutex::new(()),
        }
    }

    /// Execute one complete run
    ///
    /// Runs are serialized: a second caller waits for the run in flight to
    /// finish. Every failure is logged here and reported only as
    /// [`ConnectionOutcome::Failed`].
    pub async fn run(&self) -> ConnectionOutcome {
        let _guard = self.run_lock.lock().await;
        let mut machine = WorkflowStateMachine::new();

        match self.execute(&mut machine).await {
            Ok(ssid) => {
                info!("Successfully connected to {}", ssid);
                ConnectionOutcome::Connected
            }
            Err(e) => {
                let stopped_in = machine.state();
                machine.fail();
                error!("WiFi provisioning failed while {:?}: {}", stopped_in, e);
                ConnectionOutcome::Failed
            }
        }
    }

    async fn execute(&self, machine: &mut WorkflowStateMachine) -> ProvisioningResult<String> {
        let credentials = self.load_credentials().await?;
        info!("Connecting to new SSID: {}", credentials.ssid);

        machine.transition(WorkflowState::Connecting)?;
        self.purge_profiles().await;

        self.bridge
            .connect_wifi(&credentials.ssid, &credentials.password)
            .await
            .map_err(ProvisioningError::ConnectFailed)?;
        info!("Connection to {} requested, waiting for it to establish", credentials.ssid);

        tokio::time::sleep(self.settle_delay).await;

        machine.transition(WorkflowState::Verifying)?;
        let active = match self.bridge.active_ssid().await {
            Ok(active) => active,
            Err(e) => {
                warn!("Failed to query active network: {}", e);
                None
            }
        };

        if active.as_deref() != Some(credentials.ssid.as_str()) {
            return Err(ProvisioningError::NotVerified {
                expected: credentials.ssid,
                actual: active,
            });
        }

        machine.transition(WorkflowState::Connected)?;
        Ok(credentials.ssid)
    }

    async fn load_credentials(&self) -> ProvisioningResult<StagedCredentials> {
        let ssid = self.store.load(ScratchKey::Ssid).await?;
        let password = self.store.load(ScratchKey::Password).await?;

        Ok(StagedCredentials {
            ssid: String::from_utf8_lossy(&ssid).into_owned(),
            password: String::from_utf8_lossy(&password).into_owned(),
        })
    }

    /// Delete every saved WiFi profile; individual failures are skipped
    async fn purge_profiles(&self) {
        let profiles = match self.bridge.list_wifi_profiles().await {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!("Failed to list WiFi profiles, skipping cleanup: {}", e);
                return;
            }
        };

        for name in profiles {
            info!("Deleting WiFi connection: {}", name);
            if let Err(e) = self.bridge.delete_profile(&name).await {
                warn!("Failed to delete WiFi connection {}: {}", name, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BridgeCall, MockNetworkBridge};
    use pretty_assertions::assert_eq;

    async fn create_test_workflow(
        ssid: &[u8],
        password: &[u8],
    ) -> (
        ProvisioningWorkflow<MockNetworkBridge>,
        Arc<MockNetworkBridge>,
        tempfile::TempDir,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let store = ScratchStore::new(dir.path().join("ssid.txt"), dir.path().join("password.txt"));
        store.persist(ScratchKey::Ssid, ssid).await.unwrap();
        store.persist(ScratchKey::Password, password).await.unwrap();

        let bridge = Arc::new(MockNetworkBridge::new());
        let workflow = ProvisioningWorkflow::new(bridge.clone(), store, Duration::ZERO);
        (workflow, bridge, dir)
    }

    #[test]
    fn test_state_machine_happy_path() {
        let mut sm = WorkflowStateMachine::new();
        assert_eq!(sm.state(), WorkflowState::Idle);

        sm.transition(WorkflowState::Connecting).unwrap();
        sm.transition(WorkflowState::Verifying).unwrap();
        sm.transition(WorkflowState::Connected).unwrap();
        assert_eq!(sm.state(), WorkflowState::Connected);

        // Failing after success does not overwrite the outcome
        sm.fail();
        assert_eq!(sm.state(), WorkflowState::Connected);
    }

    #[test]
    fn test_state_machine_rejects_skipping_verification() {
        let mut sm = WorkflowStateMachine::new();
        sm.transition(WorkflowState::Connecting).unwrap();

        let result = sm.transition(WorkflowState::Connected);
        assert!(matches!(
            result,
            Err(ProvisioningError::InvalidStateTransition {
                from: WorkflowState::Connecting,
                to: WorkflowState::Connected,
            })
        ));

        sm.fail();
        assert_eq!(sm.state(), WorkflowState::Failed);
    }

    #[tokio::test]
    async fn test_run_connected() {
        let (workflow, bridge, _dir) = create_test_workflow(b"HomeNet", b"secret123").await;

        assert_eq!(workflow.run().await, ConnectionOutcome::Connected);
        assert_eq!(
            bridge.calls().await,
            vec![
                BridgeCall::ListWifiProfiles,
                BridgeCall::ConnectWifi {
                    ssid: "HomeNet".into(),
                    password: "secret123".into(),
                },
                BridgeCall::ActiveSsid,
            ]
        );
    }

    #[tokio::test]
    async fn test_run_connect_failure_skips_verification() {
        let (workflow, bridge, _dir) = create_test_workflow(b"HomeNet", b"secret123").await;
        bridge.set_connect_failure(true).await;

        assert_eq!(workflow.run().await, ConnectionOutcome::Failed);
        assert_eq!(bridge.count(&BridgeCall::ActiveSsid).await, 0);
    }

    #[tokio::test]
    async fn test_run_other_network_active() {
        let (workflow, bridge, _dir) = create_test_workflow(b"HomeNet", b"secret123").await;
        bridge.set_activate_on_connect(false).await;
        bridge.set_active_ssid(Some("OtherNet")).await;

        assert_eq!(workflow.run().await, ConnectionOutcome::Failed);
    }

    #[tokio::test]
    async fn test_run_no_network_active() {
        let (workflow, bridge, _dir) = create_test_workflow(b"HomeNet", b"secret123").await;
        bridge.set_activate_on_connect(false).await;

        assert_eq!(workflow.run().await, ConnectionOutcome::Failed);
        assert_eq!(bridge.count(&BridgeCall::ActiveSsid).await, 1);
    }

    #[tokio::test]
    async fn test_run_active_query_failure() {
        let (workflow, bridge, _dir) = create_test_workflow(b"HomeNet", b"secret123").await;
        bridge.set_active_failure(true).await;

        assert_eq!(workflow.run().await, ConnectionOutcome::Failed);
    }

    #[tokio::test]
    async fn test_run_deletes_profiles_in_order() {
        let (workflow, bridge, _dir) = create_test_workflow(b"HomeNet", b"secret123").await;
        bridge.set_profiles(&["Office", "HomeNet", "Cafe: Guest"]).await;

        workflow.run().await;
        assert_eq!(
            bridge.deleted_profiles().await,
            vec!["Office", "HomeNet", "Cafe: Guest"]
        );

        // Profiles are deleted before the connection request
        let calls = bridge.calls().await;
        let connect_at = calls
            .iter()
            .position(|c| matches!(c, BridgeCall::ConnectWifi { .. }))
            .unwrap();
        assert_eq!(connect_at, 4);
    }

    #[tokio::test]
    async fn test_run_without_profiles_deletes_nothing() {
        let (workflow, bridge, _dir) = create_test_workflow(b"HomeNet", b"secret123").await;

        workflow.run().await;
        assert!(bridge.deleted_profiles().await.is_empty());
    }

    #[tokio::test]
    async fn test_run_continues_after_cleanup_failures() {
        let (workflow, bridge, _dir) = create_test_workflow(b"HomeNet", b"secret123").await;
        bridge.set_profiles(&["A", "B"]).await;
        bridge.set_delete_failure(true).await;

        assert_eq!(workflow.run().await, ConnectionOutcome::Connected);
        assert_eq!(bridge.deleted_profiles().await, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_run_continues_after_list_failure() {
        let (workflow, bridge, _dir) = create_test_workflow(b"HomeNet", b"secret123").await;
        bridge.set_list_failure(true).await;

        assert_eq!(workflow.run().await, ConnectionOutcome::Connected);
        assert!(bridge.deleted_profiles().await.is_empty());
    }

    #[tokio::test]
    async fn test_run_with_empty_ssid() {
        let (workflow, bridge, _dir) = create_test_workflow(b"", b"secret123").await;
        bridge.set_activate_on_connect(false).await;

        assert_eq!(workflow.run().await, ConnectionOutcome::Failed);
        assert_eq!(
            bridge.count(&BridgeCall::ConnectWifi {
                ssid: String::new(),
                password: String::new(),
            })
            .await,
            1
        );
    }

    #[tokio::test]
    async fn test_run_missing_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScratchStore::new(dir.path().join("ssid.txt"), dir.path().join("password.txt"));
        store.persist(ScratchKey::Password, b"secret123").await.unwrap();

        let bridge = Arc::new(MockNetworkBridge::new());
        let workflow = ProvisioningWorkflow::new(bridge.clone(), store, Duration::ZERO);

        assert_eq!(workflow.run().await, ConnectionOutcome::Failed);
        assert!(bridge.calls().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_settle_delay_before_verifying() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScratchStore::new(dir.path().join("ssid.txt"), dir.path().join("password.txt"));
        store.persist(ScratchKey::Ssid, b"HomeNet").await.unwrap();
        store.persist(ScratchKey::Password, b"secret123").await.unwrap();

        let bridge = Arc::new(MockNetworkBridge::new());
        let workflow = ProvisioningWorkflow::new(bridge, store, DEFAULT_SETTLE_DELAY);

        let started = tokio::time::Instant::now();
        assert_eq!(workflow.run().await, ConnectionOutcome::Connected);
        assert!(started.elapsed() >= DEFAULT_SETTLE_DELAY);
    }
}
