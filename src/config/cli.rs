//! Command-line argument parsing

use clap::Parser;

use crate::core::{
    credentials::{DEFAULT_PASSWORD_FILE, DEFAULT_SSID_FILE},
    workflow::DEFAULT_SETTLE_DELAY,
};

/// Advertised local name and adapter alias
pub const DEFAULT_DEVICE_NAME: &str = "ArrestoAICamera";

#[derive(Parser, Debug, Clone)]
#[clap(name = "ble-wifi-provisioner", version, author)]
#[clap(about = "BLE GATT peripheral that provisions WiFi credentials via NetworkManager")]
pub struct CliArgs {
    /// Name advertised to centrals and set as adapter alias
    #[clap(short = 'n', long, default_value = DEFAULT_DEVICE_NAME)]
    pub device_name: String,

    /// Bluetooth adapter to use (e.g. hci0); the default adapter if omitted
    #[clap(short, long)]
    pub adapter: Option<String>,

    /// Wireless interface for connection requests; NetworkManager picks one if omitted
    #[clap(short, long)]
    pub interface: Option<String>,

    /// Scratch file holding the last written SSID
    #[clap(long, default_value = DEFAULT_SSID_FILE)]
    pub ssid_file: String,

    /// Scratch file holding the last written password (plaintext)
    #[clap(long, default_value = DEFAULT_PASSWORD_FILE)]
    pub password_file: String,

    /// Seconds to wait after a connection request before verifying it
    #[clap(long, default_value_t = DEFAULT_SETTLE_DELAY.as_secs())]
    pub settle_secs: u64,

    /// Print the exported GATT object tree as JSON and exit
    #[clap(long)]
    pub dump_tree: bool,
}
