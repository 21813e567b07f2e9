//! ESPHome client boundary
//!
//! The wire-level native-API client is provided by the host integration;
//! this module defines the trait surface the core drives, the event stream
//! type, and the raw TCP reachability probe.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use crate::config::ClientTuning;
use crate::error::BridgeError;
use crate::models::EntityEvent;

// ============================================================================
// Command identifiers
// ============================================================================

pub const CMD_LEFT_TRIGGER_PRESSURE: &str = "number-left_trigger_pressure";
pub const CMD_RIGHT_TRIGGER_PRESSURE: &str = "number-right_trigger_pressure";
pub const CMD_CALIBRATE_LEFT_OCCUPIED: &str = "button-calibrate_left_occupied";
pub const CMD_CALIBRATE_LEFT_UNOCCUPIED: &str = "button-calibrate_left_unoccupied";
pub const CMD_CALIBRATE_RIGHT_OCCUPIED: &str = "button-calibrate_right_occupied";
pub const CMD_CALIBRATE_RIGHT_UNOCCUPIED: &str = "button-calibrate_right_unoccupied";
pub const CMD_FULL_RANGE: &str = "switch-full_range";
pub const CMD_RESPONSE_SPEED: &str = "select-response_speed";

// ============================================================================
// Types
// ============================================================================

/// Construction parameters for a protocol client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub reconnect: bool,
    pub reconnect_interval: Duration,
    pub connection_timeout: Duration,
    pub client_id: String,
}

impl ClientConfig {
    pub fn new(host: &str, port: u16, tuning: &ClientTuning) -> Self {
        Self {
            host: host.to_string(),
            port,
            reconnect: true,
            reconnect_interval: tuning.reconnect_interval(),
            connection_timeout: tuning.connection_timeout(),
            client_id: tuning.client_id.clone(),
        }
    }
}

/// Everything a connected client can emit.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Entity(EntityEvent),
    Connected,
    Disconnected { reason: Option<String> },
    Error { message: String },
}

// ============================================================================
// Client boundary
// ============================================================================

/// Connection object for a single remote device.
#[async_trait]
pub trait EspClient: Send + Sync + 'static {
    async fn connect(&self) -> Result<(), BridgeError>;
    async fn disconnect(&self) -> Result<(), BridgeError>;

    /// Subscribe to the client's event stream. Each call returns a fresh
    /// receiver; the stream closes when the client is torn down.
    fn events(&self) -> broadcast::Receiver<ClientEvent>;

    async fn send_number(&self, id: &str, value: f64) -> Result<(), BridgeError>;
    async fn send_button(&self, id: &str) -> Result<(), BridgeError>;
    async fn send_switch(&self, id: &str, on: bool) -> Result<(), BridgeError>;
    async fn send_select(&self, id: &str, option: &str) -> Result<(), BridgeError>;
}

/// Creates protocol clients and answers reachability probes.
#[async_trait]
pub trait ClientFactory: Send + Sync + 'static {
    type Client: EspClient;

    async fn create(&self, config: &ClientConfig) -> Result<Arc<Self::Client>, BridgeError>;

    /// Transport-level reachability check. Never errors; any failure to
    /// establish a connection within the timeout is `false`.
    async fn probe(&self, host: &str, port: u16, timeout: Duration) -> bool {
        tcp_probe(host, port, timeout).await
    }
}

/// Lightweight TCP ping against the device's API port. Establishing a
/// transport-level connection and closing it counts as reachable; refusal,
/// resolution failure, or timeout counts as unreachable.
pub async fn tcp_probe(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            drop(stream);
            true
        }
        Ok(Err(e)) => {
            tracing::debug!("Probe to {}:{} failed: {}", host, port, e);
            false
        }
        Err(_) => {
            tracing::debug!("Probe to {}:{} timed out", host, port);
            false
        }
    }
}
