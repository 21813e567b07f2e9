//! StateSynchronizer: remote entity events -> capability model
//!
//! Consumes the client's event stream in a background task, maps entities
//! through the dispatch table, deduplicates value writes against the current
//! capability state, derives aggregate presence, and fires occupancy
//! triggers.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::esphome::client::{ClientEvent, EspClient};
use crate::flow::FlowCardRegistry;
use crate::models::{keys, CapabilityValue, EntityEvent, MappedEntity, RangeMode, Side};
use crate::platform::CapabilityStore;

pub struct StateSynchronizer {
    store: Arc<dyn CapabilityStore>,
    flow: Arc<FlowCardRegistry>,
}

impl StateSynchronizer {
    pub fn new(store: Arc<dyn CapabilityStore>, flow: Arc<FlowCardRegistry>) -> Arc<Self> {
        Arc::new(Self { store, flow })
    }

    /// Subscribe to a client's event stream and spawn the consumer task.
    /// The task ends when the client is torn down; call again after every
    /// reconnect.
    pub fn attach<C: EspClient>(self: &Arc<Self>, client: &C) {
        let mut rx = client.events();
        let sync = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => sync.apply(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("[Sync] Skipped {} events (consumer lagged)", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("[Sync] Event stream closed");
        });
    }

    /// Apply one client event to the local model.
    pub fn apply(&self, event: ClientEvent) {
        match event {
            ClientEvent::Entity(entity) => self.apply_entity(entity),
            ClientEvent::Connected => self.store.set_available(),
            ClientEvent::Disconnected { reason } => self
                .store
                .set_unavailable(reason.as_deref().unwrap_or("Connection lost")),
            ClientEvent::Error { message } => {
                tracing::error!("[Sync] Client error: {}", message);
            }
        }
    }

    fn apply_entity(&self, event: EntityEvent) {
        let Some(mapped) = MappedEntity::resolve(event.kind, &event.entity) else {
            tracing::debug!(
                "[Sync] Ignoring unmapped {} entity: {}",
                event.kind,
                event.entity
            );
            return;
        };

        match mapped {
            MappedEntity::Occupancy(side) => {
                let occupied = event
                    .value
                    .as_ref()
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                self.apply_occupancy(side, occupied);
            }
            MappedEntity::TriggerPressure(side) => {
                let raw = event
                    .value
                    .as_ref()
                    .and_then(|v| v.as_number())
                    .unwrap_or(0.0);
                // Device reports thresholds on a x100 integer scale.
                let converted = raw / 100.0;
                let key = match side {
                    Side::Left => keys::PRESSURE_THRESHOLD_LEFT,
                    _ => keys::PRESSURE_THRESHOLD_RIGHT,
                };
                self.set_if_changed(key, CapabilityValue::Number(converted));
            }
            MappedEntity::Pressure(side) => {
                let reading = event
                    .value
                    .as_ref()
                    .and_then(|v| v.as_number())
                    .unwrap_or(0.0);
                let key = match side {
                    Side::Left => keys::CONFIDENCE_LEFT,
                    _ => keys::CONFIDENCE_RIGHT,
                };
                self.set_if_changed(key, CapabilityValue::Number(reading));
            }
            MappedEntity::ResponseSpeed => {
                let Some(option) = event
                    .value
                    .as_ref()
                    .and_then(|v| v.as_text())
                    .filter(|s| !s.is_empty())
                else {
                    return;
                };
                self.set_if_changed(keys::MODE_SPEED, CapabilityValue::from(option));
            }
            MappedEntity::FullRange => {
                let on = event
                    .value
                    .as_ref()
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                let mode = RangeMode::from_bool(on);
                self.set_if_changed(keys::MODE_RANGE, CapabilityValue::from(mode.as_str()));
            }
        }
    }

    /// Occupancy update: write side and aggregate presence, then fire the
    /// trigger. The trigger fires on every received event, even when the
    /// stored value is unchanged.
    fn apply_occupancy(&self, side: Side, occupied: bool) {
        if matches!(side, Side::Left | Side::Right) {
            let key = match side {
                Side::Left => keys::PRESENCE_LEFT,
                _ => keys::PRESENCE_RIGHT,
            };
            self.write(key, CapabilityValue::Bool(occupied));

            let left = self.bool_value(keys::PRESENCE_LEFT);
            let right = self.bool_value(keys::PRESENCE_RIGHT);
            self.write(keys::PRESENCE_AGGREGATE, CapabilityValue::Bool(left || right));
        }

        self.flow.trigger_occupancy_change(side, occupied);
        tracing::debug!(
            "[Sync] {} side {}",
            side,
            if occupied {
                "became occupied"
            } else {
                "became unoccupied"
            }
        );
    }

    fn bool_value(&self, key: &str) -> bool {
        matches!(self.store.get(key), Some(CapabilityValue::Bool(true)))
    }

    fn set_if_changed(&self, key: &str, value: CapabilityValue) {
        if self.store.get(key).as_ref() == Some(&value) {
            return;
        }
        self.write(key, value);
    }

    fn write(&self, key: &str, value: CapabilityValue) {
        if let Err(e) = self.store.set(key, value) {
            tracing::warn!("[Sync] Capability write failed for {}: {}", key, e);
        }
    }
}
