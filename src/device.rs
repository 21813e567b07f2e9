//! PresenceDevice: composition root for one paired device
//!
//! Wires the lifecycle manager, synchronizer, connectivity monitor, flow
//! registry, and command dispatcher together and exposes the host-facing
//! entry points (initialize, settings update, capability write, teardown).

use std::sync::Arc;

use crate::commands::CommandDispatcher;
use crate::config::{BridgeConfig, DeviceSettings, SettingsUpdate};
use crate::error::BridgeError;
use crate::esphome::client::ClientFactory;
use crate::esphome::manager::ClientManager;
use crate::esphome::sync::StateSynchronizer;
use crate::flow::FlowCardRegistry;
use crate::health::monitor::ConnectivityMonitor;
use crate::models::{keys, CapabilityValue, DeviceStatus};
use crate::platform::{AutomationBus, CapabilityStore};

pub struct PresenceDevice<F: ClientFactory> {
    manager: Arc<ClientManager<F>>,
    sync: Arc<StateSynchronizer>,
    monitor: Arc<ConnectivityMonitor<F>>,
    dispatcher: CommandDispatcher<F>,
    flow: Arc<FlowCardRegistry>,
    store: Arc<dyn CapabilityStore>,
}

impl<F: ClientFactory> PresenceDevice<F> {
    pub fn new(
        factory: F,
        settings: DeviceSettings,
        config: &BridgeConfig,
        store: Arc<dyn CapabilityStore>,
        bus: Arc<dyn AutomationBus>,
    ) -> Self {
        let flow = Arc::new(FlowCardRegistry::new(store.clone(), bus));
        let manager = Arc::new(ClientManager::new(
            factory,
            settings.connection_params(),
            config.client.clone(),
        ));
        let sync = StateSynchronizer::new(store.clone(), flow.clone());
        let monitor = ConnectivityMonitor::new(
            manager.clone(),
            sync.clone(),
            store.clone(),
            config.monitor.clone(),
        );
        let dispatcher = CommandDispatcher::new(manager.clone(), store.clone());

        Self {
            manager,
            sync,
            monitor,
            dispatcher,
            flow,
            store,
        }
    }

    /// Bring the device up: register late-added capabilities, connect the
    /// client, subscribe the synchronizer, start the monitor.
    pub async fn initialize(&self) -> Result<(), BridgeError> {
        self.ensure_capabilities()?;

        let client = self.manager.initialize().await?;
        self.sync.attach(client.as_ref());
        self.monitor.start();

        tracing::info!("[Device] Initialized");
        Ok(())
    }

    /// Settings update from the host. A change to the connection parameters
    /// forces a full reconnect and a monitor reset; any failure rejects the
    /// update and restores the previous parameters.
    pub async fn on_settings(&self, update: SettingsUpdate) -> Result<(), BridgeError> {
        if !update.touches_connection() {
            tracing::debug!("[Device] Settings changed without connection impact");
            return Ok(());
        }

        let previous = self.manager.connection_info().await;
        self.manager
            .update_params(update.new.connection_params())
            .await;

        match self.manager.reconnect().await {
            Ok(client) => {
                self.sync.attach(client.as_ref());
                self.monitor.reset().await;
                tracing::info!(
                    "[Device] Reconnected with new connection settings ({}:{})",
                    update.new.address,
                    update.new.port
                );
                Ok(())
            }
            Err(e) => {
                self.manager.update_params(previous).await;
                Err(BridgeError::Lifecycle(format!(
                    "Reconnect with new settings failed: {}",
                    e
                )))
            }
        }
    }

    /// Host capability listener entry point.
    pub async fn handle_capability_write(
        &self,
        key: &str,
        value: CapabilityValue,
    ) -> Result<(), BridgeError> {
        self.dispatcher.dispatch(key, value).await
    }

    /// Flow registry for the host automation engine.
    pub fn flow(&self) -> &Arc<FlowCardRegistry> {
        &self.flow
    }

    /// Connectivity snapshot.
    pub async fn status(&self) -> DeviceStatus {
        self.monitor.status().await
    }

    /// Device removal: stop the monitor, disconnect the client. Idempotent.
    pub async fn teardown(&self) {
        self.monitor.shutdown();
        self.manager.disconnect().await;
        tracing::info!("[Device] Torn down");
    }

    fn ensure_capabilities(&self) -> Result<(), BridgeError> {
        for key in keys::ALL {
            if !self.store.has(key) {
                tracing::info!("[Device] Adding missing capability {}", key);
                self.store.add(key)?;
            }
        }
        Ok(())
    }
}
