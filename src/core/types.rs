//! Domain types for WiFi provisioning

use serde::{Deserialize, Serialize};

/// Provisioning workflow states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Idle,
    Connecting,
    Verifying,
    Connected,
    Failed,
}

impl WorkflowState {
    /// Whether a run has finished in this state
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowState::Connected | WorkflowState::Failed)
    }

    /// Whether `self -> next` is a legal transition within one run
    pub fn can_transition_to(self, next: WorkflowState) -> bool {
        use WorkflowState::*;

        matches!(
            (self, next),
            (Idle, Connecting)
                | (Idle, Failed)
                | (Connecting, Verifying)
                | (Connecting, Failed)
                | (Verifying, Connected)
                | (Verifying, Failed)
        )
    }
}

/// Result of one provisioning run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionOutcome {
    Connected,
    Failed,
}

impl From<ConnectionOutcome> for WorkflowState {
    fn from(outcome: ConnectionOutcome) -> Self {
        match outcome {
            ConnectionOutcome::Connected => WorkflowState::Connected,
            ConnectionOutcome::Failed => WorkflowState::Failed,
        }
    }
}

/// Keys of the durable scratch storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScratchKey {
    Ssid,
    Password,
}

impl std::fmt::Display for ScratchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScratchKey::Ssid => write!(f, "ssid"),
            ScratchKey::Password => write!(f, "password"),
        }
    }
}

/// Characteristic access flags as exposed to BlueZ
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CharacteristicFlag {
    Read,
    Write,
    Notify,
}

impl CharacteristicFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            CharacteristicFlag::Read => "read",
            CharacteristicFlag::Write => "write",
            CharacteristicFlag::Notify => "notify",
        }
    }
}

/// LE advertisement type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvertisementType {
    Peripheral,
    Broadcast,
}

impl AdvertisementType {
    pub fn as_str(self) -> &'static str {
        match self {
            AdvertisementType::Peripheral => "peripheral",
            AdvertisementType::Broadcast => "broadcast",
        }
    }
}
