//! Network bridge abstraction layer

#[cfg(test)]
pub mod mock_backend;
pub mod network_bridge;
pub mod nmcli_backend;

pub use network_bridge::NetworkBridge;
pub use nmcli_backend::NmcliBridge;

#[cfg(test)]
pub use mock_backend::{BridgeCall, MockNetworkBridge};
