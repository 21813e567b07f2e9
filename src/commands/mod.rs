//! CommandDispatcher: local capability writes -> remote commands
//!
//! Each writable capability maps to exactly one outbound command. The
//! requested value is echoed into the local model only after the send
//! resolves; a failed send propagates to the host's capability-write caller
//! and leaves the stored value untouched.

use std::sync::Arc;

use crate::error::BridgeError;
use crate::esphome::client::{
    ClientFactory, EspClient, CMD_CALIBRATE_LEFT_OCCUPIED, CMD_CALIBRATE_LEFT_UNOCCUPIED,
    CMD_CALIBRATE_RIGHT_OCCUPIED, CMD_CALIBRATE_RIGHT_UNOCCUPIED, CMD_FULL_RANGE,
    CMD_LEFT_TRIGGER_PRESSURE, CMD_RESPONSE_SPEED, CMD_RIGHT_TRIGGER_PRESSURE,
};
use crate::esphome::manager::ClientManager;
use crate::models::{keys, CapabilityValue, RangeMode};
use crate::platform::CapabilityStore;

pub struct CommandDispatcher<F: ClientFactory> {
    manager: Arc<ClientManager<F>>,
    store: Arc<dyn CapabilityStore>,
}

impl<F: ClientFactory> CommandDispatcher<F> {
    pub fn new(manager: Arc<ClientManager<F>>, store: Arc<dyn CapabilityStore>) -> Self {
        Self { manager, store }
    }

    /// Host capability listener entry point.
    pub async fn dispatch(&self, key: &str, value: CapabilityValue) -> Result<(), BridgeError> {
        let client = self.manager.client().await.ok_or(BridgeError::NotConnected)?;

        match key {
            keys::PRESSURE_THRESHOLD_LEFT => {
                self.send_threshold(&*client, CMD_LEFT_TRIGGER_PRESSURE, key, value)
                    .await
            }
            keys::PRESSURE_THRESHOLD_RIGHT => {
                self.send_threshold(&*client, CMD_RIGHT_TRIGGER_PRESSURE, key, value)
                    .await
            }
            keys::CALIBRATE_LEFT_OCCUPIED => client.send_button(CMD_CALIBRATE_LEFT_OCCUPIED).await,
            keys::CALIBRATE_LEFT_UNOCCUPIED => {
                client.send_button(CMD_CALIBRATE_LEFT_UNOCCUPIED).await
            }
            keys::CALIBRATE_RIGHT_OCCUPIED => {
                client.send_button(CMD_CALIBRATE_RIGHT_OCCUPIED).await
            }
            keys::CALIBRATE_RIGHT_UNOCCUPIED => {
                client.send_button(CMD_CALIBRATE_RIGHT_UNOCCUPIED).await
            }
            keys::MODE_RANGE => {
                let mode = value
                    .as_text()
                    .and_then(|s| s.parse::<RangeMode>().ok())
                    .ok_or_else(|| {
                        BridgeError::Protocol(format!("Expected On/Off for {}", key))
                    })?;
                tracing::debug!("[Commands] Setting full range mode to {}", mode.is_on());
                client.send_switch(CMD_FULL_RANGE, mode.is_on()).await?;
                self.echo(key, value)
            }
            keys::MODE_SPEED => {
                let option = value
                    .as_text()
                    .ok_or_else(|| {
                        BridgeError::Protocol(format!("Expected text value for {}", key))
                    })?
                    .to_string();
                tracing::debug!("[Commands] Setting response speed mode to {}", option);
                client.send_select(CMD_RESPONSE_SPEED, &option).await?;
                self.echo(key, value)
            }
            _ => Err(BridgeError::UnknownCapability(key.to_string())),
        }
    }

    async fn send_threshold(
        &self,
        client: &F::Client,
        command: &str,
        key: &str,
        value: CapabilityValue,
    ) -> Result<(), BridgeError> {
        let number = value.as_number().ok_or_else(|| {
            BridgeError::Protocol(format!("Expected numeric value for {}", key))
        })?;
        tracing::debug!("[Commands] Setting {} to {}", key, number);
        // Device expects thresholds on a x100 integer scale.
        client.send_number(command, number * 100.0).await?;
        self.echo(key, CapabilityValue::Number(number))
    }

    fn echo(&self, key: &str, value: CapabilityValue) -> Result<(), BridgeError> {
        self.store.set(key, value)
    }
}
