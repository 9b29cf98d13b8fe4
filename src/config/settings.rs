//! Runtime settings

use std::{path::PathBuf, time::Duration};

use crate::config::CliArgs;

/// Runtime configuration settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub device_name: String,
    pub adapter: Option<String>,
    pub interface: Option<String>,
    pub ssid_file: PathBuf,
    pub password_file: PathBuf,
    pub settle_delay: Duration,
    pub dump_tree: bool,
}

impl From<CliArgs> for Settings {
    fn from(args: CliArgs) -> Self {
        Settings {
            device_name: args.device_name,
            adapter: args.adapter,
            interface: args.interface.filter(|i| !i.is_empty()),
            ssid_file: PathBuf::from(args.ssid_file),
            password_file: PathBuf::from(args.password_file),
            settle_delay: Duration::from_secs(args.settle_secs),
            dump_tree: args.dump_tree,
        }
    }
}
