//! Error types for the WiFi provisioning peripheral

use thiserror::Error;

use super::types::WorkflowState;

/// Result type for network bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Result type for scratch storage operations
pub type ScratchResult<T> = Result<T, ScratchError>;

/// Result type for a provisioning workflow run
pub type ProvisioningResult<T> = Result<T, ProvisioningError>;

/// Result type for object tree dispatch
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors reported by the OS network bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Errors related to durable scratch storage
#[derive(Error, Debug)]
pub enum ScratchError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Reasons a provisioning run ends in `Failed`
#[derive(Error, Debug)]
pub enum ProvisioningError {
    #[error("Staged credentials unavailable: {0}")]
    Storage(#[from] ScratchError),

    #[error("Connection request failed: {0}")]
    ConnectFailed(#[source] BridgeError),

    #[error("Active network is {actual:?}, expected {expected:?}")]
    NotVerified {
        expected: String,
        actual: Option<String>,
    },

    #[error("Invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: WorkflowState,
        to: WorkflowState,
    },
}

/// Errors raised while dispatching a call through the object tree
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No object at path {0}")]
    UnknownObject(String),

    #[error("Object {path} has no method {interface}.{method}")]
    UnknownMethod {
        path: String,
        interface: String,
        method: String,
    },

    #[error("Unknown interface: {0}")]
    UnknownInterface(String),

    #[error("Read offset {offset} exceeds value length {len}")]
    InvalidOffset { offset: usize, len: usize },

    #[error("Write failed: {0}")]
    WriteFailed(#[from] ScratchError),

    #[error("UUID {0} registered twice")]
    DuplicateUuid(uuid::Uuid),

    #[error("Object path {0} already in use")]
    PathInUse(String),
}

/// Errors related to the BLE transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("BLE error: {0}")]
    Ble(#[from] bluer::Error),
}
