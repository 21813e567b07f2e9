//! Host platform ports
//!
//! The capability model and the automation engine live in the host platform;
//! the core drives them through these traits. The host serializes capability
//! mutations per device instance, so both ports are synchronous.

use crate::error::BridgeError;
use crate::models::{CapabilityValue, Side};

/// Local capability model of a single device, exposed by the host.
pub trait CapabilityStore: Send + Sync {
    fn get(&self, key: &str) -> Option<CapabilityValue>;
    fn set(&self, key: &str, value: CapabilityValue) -> Result<(), BridgeError>;
    fn has(&self, key: &str) -> bool;
    /// Register a capability added after the device was first paired.
    fn add(&self, key: &str) -> Result<(), BridgeError>;
    fn set_available(&self);
    fn set_unavailable(&self, reason: &str);
}

/// Trigger identities exposed to the host automation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerCard {
    BecameOccupied,
    BecameUnoccupied,
}

impl TriggerCard {
    pub fn id(&self) -> &'static str {
        match self {
            TriggerCard::BecameOccupied => "became-occupied",
            TriggerCard::BecameUnoccupied => "became-unoccupied",
        }
    }
}

impl std::fmt::Display for TriggerCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Host automation engine: receives trigger firings with `{side}` state.
pub trait AutomationBus: Send + Sync {
    fn fire(&self, card: TriggerCard, side: Side);
}
