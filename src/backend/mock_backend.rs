//! Mock network bridge for testing

use std::{os::unix::process::ExitStatusExt, process::ExitStatus, sync::Arc};
use tokio::sync::Mutex;

use crate::backend::NetworkBridge;
use crate::core::error::{BridgeError, BridgeResult};

/// A bridge call as observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCall {
    ListWifiProfiles,
    DeleteProfile(String),
    ConnectWifi { ssid: String, password: String },
    ActiveSsid,
}

/// Internal state for the mock bridge
#[derive(Debug, Clone, Default)]
struct MockState {
    profiles: Vec<String>,
    active_ssid: Option<String>,
    should_fail_list: bool,
    should_fail_delete: bool,
    should_fail_connect: bool,
    should_fail_active: bool,
    activate_on_connect: bool,
    calls: Vec<BridgeCall>,
}

/// Mock network bridge for testing
///
/// Records every call in order. By default a successful `connect_wifi`
/// makes the requested SSID the active network.
#[derive(Debug, Clone)]
pub struct MockNetworkBridge {
    inner: Arc<Mutex<MockState>>,
}

impl MockNetworkBridge {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState {
                activate_on_connect: true,
                ..Default::default()
            })),
        }
    }

    /// Saved WiFi profiles returned by `list_wifi_profiles`
    pub async fn set_profiles(&self, profiles: &[&str]) {
        self.inner.lock().await.profiles = profiles.iter().map(|p| p.to_string()).collect();
    }

    /// Network reported by `active_ssid`
    pub async fn set_active_ssid(&self, ssid: Option<&str>) {
        self.inner.lock().await.active_ssid = ssid.map(str::to_string);
    }

    /// Whether a successful connect changes the active network
    pub async fn set_activate_on_connect(&self, activate: bool) {
        self.inner.lock().await.activate_on_connect = activate;
    }

    pub async fn set_list_failure(&self, should_fail: bool) {
        self.inner.lock().await.should_fail_list = should_fail;
    }

    pub async fn set_delete_failure(&self, should_fail: bool) {
        self.inner.lock().await.should_fail_delete = should_fail;
    }

    pub async fn set_connect_failure(&self, should_fail: bool) {
        self.inner.lock().await.should_fail_connect = should_fail;
    }

    pub async fn set_active_failure(&self, should_fail: bool) {
        self.inner.lock().await.should_fail_active = should_fail;
    }

    /// All calls made so far
    pub async fn calls(&self) -> Vec<BridgeCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Names passed to `delete_profile`, in call order
    pub async fn deleted_profiles(&self) -> Vec<String> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|call| match call {
                BridgeCall::DeleteProfile(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub async fn count(&self, expected: &BridgeCall) -> usize {
        self.calls()
            .await
            .iter()
            .filter(|call| {
                std::mem::discriminant(*call) == std::mem::discriminant(expected)
            })
            .count()
    }
}

impl Default for MockNetworkBridge {
    fn default() -> Self {
        Self::new()
    }
}

fn mock_failure(command: &str) -> BridgeError {
    BridgeError::CommandFailed {
        command: command.to_string(),
        status: ExitStatus::from_raw(1 << 8),
        stderr: "Mock failure".to_string(),
    }
}

impl NetworkBridge for MockNetworkBridge {
    async fn list_wifi_profiles(&self) -> BridgeResult<Vec<String>> {
        let mut state = self.inner.lock().await;
        state.calls.push(BridgeCall::ListWifiProfiles);
        if state.should_fail_list {
            Err(mock_failure("list"))
        } else {
            Ok(state.profiles.clone())
        }
    }

    async fn delete_profile(&self, name: &str) -> BridgeResult<()> {
        let mut state = self.inner.lock().await;
        state.calls.push(BridgeCall::DeleteProfile(name.to_string()));
        if state.should_fail_delete {
            return Err(mock_failure("delete"));
        }
        state.profiles.retain(|p| p != name);
        Ok(())
    }

    async fn connect_wifi(&self, ssid: &str, password: &str) -> BridgeResult<()> {
        let mut state = self.inner.lock().await;
        state.calls.push(BridgeCall::ConnectWifi {
            ssid: ssid.to_string(),
            password: password.to_string(),
        });
        if state.should_fail_connect {
            return Err(mock_failure("connect"));
        }
        if state.activate_on_connect {
            state.active_ssid = Some(ssid.to_string());
        }
        Ok(())
    }

    async fn active_ssid(&self) -> BridgeResult<Option<String>> {
        let mut state = self.inner.lock().await;
        state.calls.push(BridgeCall::ActiveSsid);
        if state.should_fail_active {
            Err(mock_failure("active"))
        } else {
            Ok(state.active_ssid.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls_in_order() {
        let bridge = MockNetworkBridge::new();
        bridge.set_profiles(&["A", "B"]).await;

        let profiles = bridge.list_wifi_profiles().await.unwrap();
        for name in &profiles {
            bridge.delete_profile(name).await.unwrap();
        }

        assert_eq!(
            bridge.calls().await,
            vec![
                BridgeCall::ListWifiProfiles,
                BridgeCall::DeleteProfile("A".into()),
                BridgeCall::DeleteProfile("B".into()),
            ]
        );
        assert!(bridge.list_wifi_profiles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_connect_activates_network() {
        let bridge = MockNetworkBridge::new();
        assert_eq!(bridge.active_ssid().await.unwrap(), None);

        bridge.connect_wifi("HomeNet", "secret123").await.unwrap();
        assert_eq!(bridge.active_ssid().await.unwrap(), Some("HomeNet".into()));
    }

    #[tokio::test]
    async fn test_mock_failures() {
        let bridge = MockNetworkBridge::new();
        bridge.set_connect_failure(true).await;
        bridge.set_active_failure(true).await;

        assert!(bridge.connect_wifi("HomeNet", "secret123").await.is_err());
        assert!(bridge.active_ssid().await.is_err());
        assert_eq!(bridge.count(&BridgeCall::ActiveSsid).await, 1);
    }
}
