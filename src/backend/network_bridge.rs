//! Network bridge trait definition

use trait_variant::make;

use crate::core::error::BridgeResult;

/// Abstraction over the host's network configuration tool (NetworkManager)
///
/// Implementations report every failure through `BridgeResult`; nothing may
/// panic past this boundary. Callers decide how each failure is treated.
#[make(Send)]
pub trait NetworkBridge: Sync + 'static {
    /// Names of all saved WiFi connection profiles, in the tool's order
    async fn list_wifi_profiles(&self) -> BridgeResult<Vec<String>>;

    /// Delete a saved connection profile by name
    async fn delete_profile(&self, name: &str) -> BridgeResult<()>;

    /// Create a profile for `ssid` and activate it
    ///
    /// An empty `password` requests an open network.
    async fn connect_wifi(&self, ssid: &str, password: &str) -> BridgeResult<()>;

    /// SSID of the currently active WiFi network, `None` when not connected
    async fn active_ssid(&self) -> BridgeResult<Option<String>>;
}
