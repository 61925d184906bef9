//! Daemon configuration loaded from TOML.

use bthid_bluetooth::HID_SERVICE_UUID;
use bthid_types::{DescriptorRegistry, DeviceClass, TypesError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bluetooth: BluetoothConfig,
    #[serde(default)]
    pub hid: HidConfig,
}

impl Config {
    /// Build the descriptor registry for the configured device classes.
    pub fn descriptor_registry(&self) -> Result<DescriptorRegistry, TypesError> {
        DescriptorRegistry::new(self.hid.devices.clone())
    }
}

/// TCP ingress listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// `host:port`, for display and for clients.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// BlueZ profile and agent registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BluetoothConfig {
    #[serde(default = "default_uuid")]
    pub uuid: Uuid,
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_agent")]
    pub agent: String,
    /// Adapter name such as `hci0`. The default adapter when unset.
    #[serde(default)]
    pub adapter: Option<String>,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            uuid: default_uuid(),
            profile: default_profile(),
            agent: default_agent(),
            adapter: None,
        }
    }
}

/// Advertised device classes, in descriptor order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidConfig {
    #[serde(default = "default_devices")]
    pub devices: Vec<DeviceClass>,
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            devices: default_devices(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    6789
}

fn default_uuid() -> Uuid {
    HID_SERVICE_UUID
}

fn default_profile() -> String {
    "/bluez/bthid/profile".to_string()
}

fn default_agent() -> String {
    "/bluez/bthid/agent".to_string()
}

fn default_devices() -> Vec<DeviceClass> {
    DeviceClass::ALL.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("port = 6789"));
        assert!(toml_str.contains("00001124-0000-1000-8000-00805f9b34fb"));
        assert!(toml_str.contains(r#""keyboard""#));
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.address(), "localhost:6789");
        assert_eq!(config.bluetooth.adapter, None);
    }

    #[test]
    fn parse_example_config() {
        let toml_str = r#"
[server]
host = "0.0.0.0"
port = 7000

[bluetooth]
uuid = "00001124-0000-1000-8000-00805f9b34fb"
profile = "/org/example/hid"
agent = "/org/example/agent"
adapter = "hci1"

[hid]
devices = ["mouse", "keyboard"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.address(), "0.0.0.0:7000");
        assert_eq!(config.bluetooth.profile, "/org/example/hid");
        assert_eq!(config.bluetooth.adapter.as_deref(), Some("hci1"));
        assert_eq!(
            config.hid.devices,
            vec![DeviceClass::Mouse, DeviceClass::Keyboard]
        );
        let registry = config.descriptor_registry().unwrap();
        assert_eq!(registry.classes()[0], DeviceClass::Mouse);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config: Config = toml::from_str("[server]\nport = 1234\n").unwrap();
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 1234);
        assert_eq!(config.hid, HidConfig::default());
    }

    #[test]
    fn empty_device_list_is_rejected_by_registry() {
        let config: Config = toml::from_str("[hid]\ndevices = []\n").unwrap();
        assert_eq!(config.descriptor_registry(), Err(TypesError::EmptyRegistry));
    }
}
