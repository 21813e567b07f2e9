//! ClientManager: protocol client lifecycle
//!
//! Owns create/replace/teardown of the ESPHome client for one device and
//! answers reachability probes against the stored connection parameters.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::config::{ClientTuning, ConnectionParams};
use crate::error::BridgeError;
use crate::esphome::client::{ClientConfig, ClientFactory, EspClient};

pub struct ClientManager<F: ClientFactory> {
    factory: F,
    tuning: ClientTuning,
    params: RwLock<ConnectionParams>,
    client: RwLock<Option<Arc<F::Client>>>,
}

impl<F: ClientFactory> ClientManager<F> {
    pub fn new(factory: F, params: ConnectionParams, tuning: ClientTuning) -> Self {
        Self {
            factory,
            tuning,
            params: RwLock::new(params),
            client: RwLock::new(None),
        }
    }

    /// Create and connect a client using the current connection parameters.
    pub async fn initialize(&self) -> Result<Arc<F::Client>, BridgeError> {
        let params = self.params.read().await.clone();
        if !params.is_complete() {
            return Err(BridgeError::MissingParams);
        }

        tracing::info!(
            "[ClientManager] Connecting to device at {}:{}",
            params.host,
            params.port
        );

        let config = ClientConfig::new(&params.host, params.port, &self.tuning);
        let client = self.factory.create(&config).await?;
        client.connect().await?;

        *self.client.write().await = Some(client.clone());
        tracing::info!("[ClientManager] Client initialized and connecting");

        Ok(client)
    }

    /// Disconnect any existing client, then initialize a fresh one.
    pub async fn reconnect(&self) -> Result<Arc<F::Client>, BridgeError> {
        tracing::info!("[ClientManager] Reconnecting client");
        self.disconnect().await;
        self.initialize().await
    }

    /// Tear down the current client. Teardown errors are logged and
    /// swallowed; teardown never propagates.
    pub async fn disconnect(&self) {
        let client = self.client.write().await.take();
        if let Some(client) = client {
            match client.disconnect().await {
                Ok(()) => tracing::info!("[ClientManager] Client disconnected"),
                Err(e) => {
                    tracing::warn!("[ClientManager] Error disconnecting client (ignored): {}", e)
                }
            }
        }
    }

    /// Current connection parameters.
    pub async fn connection_info(&self) -> ConnectionParams {
        self.params.read().await.clone()
    }

    /// Replace the connection parameters (settings update path).
    pub async fn update_params(&self, params: ConnectionParams) {
        *self.params.write().await = params;
    }

    /// Reachability check against the stored parameters. Missing parameters
    /// short-circuit to unreachable without attempting a connection.
    pub async fn probe(&self, timeout: Duration) -> bool {
        let params = self.params.read().await.clone();
        if !params.is_complete() {
            tracing::warn!("[ClientManager] Probe skipped: missing host or port");
            return false;
        }

        self.factory.probe(&params.host, params.port, timeout).await
    }

    /// Current client, if one is connected.
    pub async fn client(&self) -> Option<Arc<F::Client>> {
        self.client.read().await.clone()
    }
}
