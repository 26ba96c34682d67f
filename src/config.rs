//! Gateway configuration and the device/command registries built from it
//!
//! The configuration is one JSON document:
//! ```json
//! {
//!   "devices": {
//!     "wall-1": { "type": "monitor", "id": 1, "ip": "192.168.35.161", "index": 1, "main-source": "hdmi1" },
//!     "pc-1":   { "type": "client", "index": 2 },
//!     "matrix": { "type": "switch" }
//!   },
//!   "commands": {
//!     "monitor": { "power": { "id": "11", "values": [0, 1] } },
//!     "switch":  { "state": { "id": "state" }, "bind": { "id": "bind" } }
//!   },
//!   "switch": { "address": "192.168.35.250:23", "username": "administrator", "password": "..." }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use vidwall_shared::timing;

/// Kind of hardware a device entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceType {
    /// Flat-panel display speaking the binary protocol
    Monitor,
    /// Source wired into a matrix input
    Client,
    /// Source wired straight into a display input
    ExtClient,
    /// The video matrix switch
    Switch,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Monitor => write!(f, "monitor"),
            DeviceType::Client => write!(f, "client"),
            DeviceType::ExtClient => write!(f, "ext-client"),
            DeviceType::Switch => write!(f, "switch"),
        }
    }
}

/// One configured device
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Device {
    /// Registry key, filled in when the registry is built
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DeviceType,
    /// Display id used in binary frames
    pub id: Option<u8>,
    pub ip: Option<String>,
    /// 1-based matrix port
    pub index: Option<u8>,
    /// Symbolic display input an ext-client is wired to
    pub source: Option<String>,
    /// Symbolic display input that carries the matrix output
    pub main_source: Option<String>,
}

/// One configured command
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Command {
    /// Registry key, filled in when the registry is built
    #[serde(skip)]
    pub name: String,
    /// Hex command code for displays, operation name for the switch
    pub id: String,
    /// Whitelist of accepted request bodies
    pub values: Option<Vec<serde_json::Value>>,
}

impl Command {
    /// Whether a request body passes the whitelist
    pub fn allows(&self, body: &str) -> bool {
        match &self.values {
            None => true,
            Some(values) => values.iter().any(|v| match v {
                serde_json::Value::String(s) => s == body,
                other => other.to_string() == body,
            }),
        }
    }
}

/// Telnet endpoint and credentials of the matrix switch
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    pub address: String,
    pub username: String,
    pub password: String,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            address: format!("192.168.35.250:{}", timing::TELNET_PORT),
            username: "administrator".into(),
            password: String::new(),
        }
    }
}

/// Deadlines and delays, all in milliseconds
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TimingConfig {
    pub monitor_timeout_ms: u64,
    pub command_timeout_ms: u64,
    pub settle_ms: u64,
    pub reconnect_delay_ms: u64,
    pub max_reconnect_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            monitor_timeout_ms: timing::MONITOR_TIMEOUT_MS,
            command_timeout_ms: timing::COMMAND_TIMEOUT_MS,
            settle_ms: timing::SETTLE_DELAY_MS,
            reconnect_delay_ms: timing::RECONNECT_DELAY_MS,
            max_reconnect_delay_ms: timing::MAX_RECONNECT_DELAY_MS,
        }
    }
}

impl TimingConfig {
    pub fn monitor_timeout(&self) -> Duration {
        Duration::from_millis(self.monitor_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms)
    }
}

/// Full gateway configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GatewayConfig {
    pub devices: HashMap<String, Device>,
    pub commands: HashMap<DeviceType, HashMap<String, Command>>,
    pub switch: SwitchConfig,
    pub monitor_port: u16,
    pub timing: TimingConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            devices: HashMap::new(),
            commands: HashMap::new(),
            switch: SwitchConfig::default(),
            monitor_port: timing::MONITOR_PORT,
            timing: TimingConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Parse a configuration document
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Invalid gateway configuration")
    }

    /// Read and parse the configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&text)
    }

    /// Build the immutable registries served to the router
    pub fn registries(&self) -> (DeviceRegistry, CommandRegistry) {
        (
            DeviceRegistry::new(self.devices.clone()),
            CommandRegistry::new(self.commands.clone()),
        )
    }
}

/// Devices by name
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, Device>,
}

impl DeviceRegistry {
    pub fn new(mut devices: HashMap<String, Device>) -> Self {
        for (name, device) in devices.iter_mut() {
            device.name = name.clone();
        }
        Self { devices }
    }

    pub fn get(&self, name: &str) -> Option<&Device> {
        self.devices.get(name)
    }

    /// Device of the given type sitting on a matrix port
    pub fn by_index(&self, kind: DeviceType, index: i32) -> Option<&Device> {
        self.devices
            .values()
            .find(|d| d.kind == kind && d.index.map(i32::from) == Some(index))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Commands by device type and name
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<DeviceType, HashMap<String, Command>>,
}

impl CommandRegistry {
    pub fn new(mut commands: HashMap<DeviceType, HashMap<String, Command>>) -> Self {
        for table in commands.values_mut() {
            for (name, command) in table.iter_mut() {
                command.name = name.clone();
            }
        }
        Self { commands }
    }

    pub fn get(&self, kind: DeviceType, name: &str) -> Option<&Command> {
        self.commands.get(&kind).and_then(|table| table.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "devices": {
            "wall-1": { "type": "monitor", "id": 1, "ip": "192.168.35.161", "index": 1, "main-source": "hdmi1" },
            "pc-1": { "type": "client", "index": 2 },
            "laptop": { "type": "ext-client", "source": "hdmi2" },
            "matrix": { "type": "switch" }
        },
        "commands": {
            "monitor": {
                "power": { "id": "11", "values": [0, 1] },
                "source": { "id": "0x14", "values": ["hdmi1", "hdmi2"] }
            },
            "switch": { "state": { "id": "state" }, "bind": { "id": "bind" } }
        },
        "switch": { "address": "10.0.0.5:23", "username": "admin", "password": "pw" },
        "timing": { "settle-ms": 50 }
    }"#;

    #[test]
    fn test_parse_sample() {
        let config = GatewayConfig::from_json(SAMPLE).expect("parse failed");

        assert_eq!(config.devices.len(), 4);
        assert_eq!(config.switch.address, "10.0.0.5:23");
        assert_eq!(config.monitor_port, 1515);
        assert_eq!(config.timing.settle_ms, 50);
        assert_eq!(config.timing.command_timeout_ms, 5000);
    }

    #[test]
    fn test_registries() {
        let config = GatewayConfig::from_json(SAMPLE).expect("parse failed");
        let (devices, commands) = config.registries();

        let wall = devices.get("wall-1").expect("wall-1");
        assert_eq!(wall.name, "wall-1");
        assert_eq!(wall.kind, DeviceType::Monitor);
        assert_eq!(wall.main_source.as_deref(), Some("hdmi1"));

        assert_eq!(
            devices.by_index(DeviceType::Client, 2).map(|d| d.name.as_str()),
            Some("pc-1")
        );
        assert!(devices.by_index(DeviceType::Client, 1).is_none());

        let power = commands.get(DeviceType::Monitor, "power").expect("power");
        assert_eq!(power.name, "power");
        assert!(commands.get(DeviceType::Client, "power").is_none());
    }

    #[test]
    fn test_whitelist() {
        let config = GatewayConfig::from_json(SAMPLE).expect("parse failed");
        let (_, commands) = config.registries();

        let power = commands.get(DeviceType::Monitor, "power").expect("power");
        assert!(power.allows("1"));
        assert!(!power.allows("2"));

        let source = commands.get(DeviceType::Monitor, "source").expect("source");
        assert!(source.allows("hdmi2"));
        assert!(!source.allows("\"hdmi2\""));

        let bind = commands.get(DeviceType::Switch, "bind").expect("bind");
        assert!(bind.allows("anything,at-all"));
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::from_json("{}").expect("parse failed");
        assert!(config.devices.is_empty());
        assert_eq!(config.switch.username, "administrator");
        assert_eq!(config.timing.monitor_timeout(), Duration::from_millis(5000));
    }
}
