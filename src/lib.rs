//! BLE WiFi Provisioner
//!
//! A Bluetooth Low Energy peripheral that exposes a GATT service for WiFi
//! credential provisioning. A central writes an SSID and then a password;
//! the password write purges saved WiFi profiles, asks NetworkManager to
//! connect and verifies the resulting active network.

pub mod backend;
pub mod config;
pub mod core;
pub mod transport;

pub use core::{
    error::{BridgeError, DispatchError, ProvisioningError, ScratchError, TransportError},
    types::{ConnectionOutcome, WorkflowState},
};
