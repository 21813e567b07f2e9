//! Configuration module

use std::time::Duration;

use serde::Deserialize;

/// Connection parameters of the remote device. Changed only through a
/// settings update, which forces a full reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
}

impl ConnectionParams {
    pub fn is_complete(&self) -> bool {
        !self.host.is_empty() && self.port != 0
    }
}

/// Device settings as stored by the host (pairing writes them, the settings
/// dialog updates them).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceSettings {
    #[serde(default)]
    pub address: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl DeviceSettings {
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            host: self.address.clone(),
            port: self.port,
        }
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: default_api_port(),
        }
    }
}

pub const SETTING_ADDRESS: &str = "address";
pub const SETTING_PORT: &str = "port";

/// Settings-change notification from the host.
#[derive(Debug, Clone)]
pub struct SettingsUpdate {
    pub old: DeviceSettings,
    pub new: DeviceSettings,
    pub changed_keys: Vec<String>,
}

impl SettingsUpdate {
    /// True when the change affects the connection parameters.
    pub fn touches_connection(&self) -> bool {
        self.changed_keys
            .iter()
            .any(|k| k == SETTING_ADDRESS || k == SETTING_PORT)
    }
}

/// Connectivity monitor tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_busy_retry_ms")]
    pub busy_retry_ms: u64,
    #[serde(default = "default_fault_retry_ms")]
    pub fault_retry_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: default_probe_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            failure_threshold: default_failure_threshold(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
            busy_retry_ms: default_busy_retry_ms(),
            fault_retry_ms: default_fault_retry_ms(),
        }
    }
}

impl MonitorConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn busy_retry(&self) -> Duration {
        Duration::from_millis(self.busy_retry_ms)
    }

    pub fn fault_retry(&self) -> Duration {
        Duration::from_millis(self.fault_retry_ms)
    }
}

/// Remote client tuning (the client's own reconnect behavior).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientTuning {
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    #[serde(default = "default_client_id")]
    pub client_id: String,
}

impl Default for ClientTuning {
    fn default() -> Self {
        Self {
            reconnect_interval_ms: default_reconnect_interval_ms(),
            connection_timeout_ms: default_connection_timeout_ms(),
            client_id: default_client_id(),
        }
    }
}

impl ClientTuning {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub client: ClientTuning,
}

impl BridgeConfig {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("BEDSENSE").separator("__"))
            .build()?;

        let config: BridgeConfig = settings.try_deserialize().unwrap_or_default();

        Ok(config)
    }
}

fn default_api_port() -> u16 {
    6053
}

fn default_probe_interval_ms() -> u64 {
    10000
}

fn default_probe_timeout_ms() -> u64 {
    2000
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    20000
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_max_backoff_ms() -> u64 {
    300000
}

fn default_busy_retry_ms() -> u64 {
    1000
}

fn default_fault_retry_ms() -> u64 {
    5000
}

fn default_reconnect_interval_ms() -> u64 {
    15000
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_client_id() -> String {
    "bedsense-bridge".to_string()
}
