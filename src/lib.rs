//! bedsense-bridge - Dual-zone bed presence sensor integration core
//!
//! Maintains a live connection to a dual-zone presence sensing device,
//! mirrors its reported entity states into the host capability model,
//! forwards local control actions back to the device, and fires automation
//! triggers on occupancy transitions. Device reachability is verified
//! independently of the protocol client by a TCP probe loop with failure
//! counting and exponential backoff.

pub mod commands;
pub mod config;
pub mod device;
pub mod error;
pub mod esphome;
pub mod flow;
pub mod health;
pub mod models;
pub mod platform;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{
    BridgeConfig, ClientTuning, ConnectionParams, DeviceSettings, MonitorConfig, SettingsUpdate,
};
pub use device::PresenceDevice;
pub use error::BridgeError;
pub use esphome::{ClientConfig, ClientEvent, ClientFactory, EspClient};
pub use flow::FlowCardRegistry;
pub use health::ConnectivityMonitor;
pub use models::{
    AvailabilityState, CapabilityValue, DeviceStatus, EntityEvent, EntityKind, EventValue, Side,
};
pub use platform::{AutomationBus, CapabilityStore, TriggerCard};
