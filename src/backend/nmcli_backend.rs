//! NetworkManager backend driven through `nmcli`

use tokio::process::Command;
use tracing::{debug, trace};

use crate::{
    backend::NetworkBridge,
    core::error::{BridgeError, BridgeResult},
};

const NMCLI: &str = "nmcli";

/// Connection types nmcli reports for WiFi profiles (terse and pretty output)
const WIFI_CONNECTION_TYPES: [&str; 2] = ["802-11-wireless", "wifi"];

/// Network bridge backed by the `nmcli` command line tool
#[derive(Debug, Clone, Default)]
pub struct NmcliBridge {
    interface: Option<String>,
}

impl NmcliBridge {
    /// Create a bridge; `interface` pins connection requests to one device
    pub fn new(interface: Option<String>) -> Self {
        Self { interface }
    }

    /// Run nmcli and return its stdout, failing on a non-zero exit status
    async fn run(&self, args: &[&str], redact_from: Option<usize>) -> BridgeResult<String> {
        let command = describe(args, redact_from);
        trace!("Running {}", command);

        let output = Command::new(NMCLI)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| BridgeError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BridgeError::CommandFailed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Pick WiFi profile names out of `nmcli -t -f NAME,TYPE connection show`
    fn parse_wifi_profiles(output: &str) -> Vec<String> {
        output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let mut fields = split_terse(line);
                let conn_type = fields.pop()?;
                let name = fields.pop()?;
                WIFI_CONNECTION_TYPES
                    .contains(&conn_type.as_str())
                    .then_some(name)
            })
            .collect()
    }

    /// Pick the active SSID out of `nmcli -t -f ACTIVE,SSID device wifi`
    fn parse_active_ssid(output: &str) -> Option<String> {
        output.lines().find_map(|line| {
            let fields = split_terse(line);
            match fields.as_slice() {
                [active, ssid] if active == "yes" && !ssid.is_empty() => Some(ssid.clone()),
                _ => None,
            }
        })
    }
}

impl NetworkBridge for NmcliBridge {
    async fn list_wifi_profiles(&self) -> BridgeResult<Vec<String>> {
        let output = self
            .run(&["-t", "-f", "NAME,TYPE", "connection", "show"], None)
            .await?;
        let profiles = Self::parse_wifi_profiles(&output);

        debug!("Found {} WiFi profiles", profiles.len());
        Ok(profiles)
    }

    async fn delete_profile(&self, name: &str) -> BridgeResult<()> {
        self.run(&["connection", "delete", "id", name], None).await?;
        Ok(())
    }

    async fn connect_wifi(&self, ssid: &str, password: &str) -> BridgeResult<()> {
        let mut args = vec!["device", "wifi", "connect", ssid];
        let mut redact_from = None;

        if !password.is_empty() {
            args.push("password");
            redact_from = Some(args.len());
            args.push(password);
        }

        if let Some(interface) = &self.interface {
            args.push("ifname");
            args.push(interface);
        }

        self.run(&args, redact_from).await?;
        Ok(())
    }

    async fn active_ssid(&self) -> BridgeResult<Option<String>> {
        let output = self
            .run(&["-t", "-f", "ACTIVE,SSID", "device", "wifi"], None)
            .await?;
        Ok(Self::parse_active_ssid(&output))
    }
}

/// Split one line of nmcli terse output into its fields
///
/// Terse mode separates fields with `:` and escapes literal `:` and `\`
/// inside values with a backslash.
fn split_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => current.push('\\'),
            },
            ':' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields
}

/// Render a command line for logs, masking the argument at `redact`
fn describe(args: &[&str], redact: Option<usize>) -> String {
    let rendered: Vec<&str> = args
        .iter()
        .enumerate()
        .map(|(i, arg)| if Some(i) == redact { "***" } else { *arg })
        .collect();
    format!("{} {}", NMCLI, rendered.join(" "))
}
