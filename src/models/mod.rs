//! Data models for bedsense-bridge

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Sides and availability
// ============================================================================

/// Logical channel an occupancy observation or automation rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "left")]
    Left,
    #[serde(rename = "right")]
    Right,
    #[serde(rename = "either")]
    Either,
    #[serde(rename = "both")]
    Both,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
            Side::Either => "either",
            Side::Both => "both",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            "either" => Ok(Side::Either),
            "both" => Ok(Side::Both),
            _ => Err(format!("Unknown side: {}", s)),
        }
    }
}

/// Device-visible availability, owned by the connectivity monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvailabilityState {
    #[serde(rename = "online")]
    Online,
    #[serde(rename = "offline")]
    Offline,
}

// ============================================================================
// Remote entity events
// ============================================================================

/// Event kinds emitted by the remote client boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Binary,
    Numeric,
    Measurement,
    Selection,
    Toggle,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Binary => "binary",
            EntityKind::Numeric => "numeric",
            EntityKind::Measurement => "measurement",
            EntityKind::Selection => "selection",
            EntityKind::Toggle => "toggle",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload value of a remote entity event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl EventValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            EventValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            EventValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            EventValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A single update from the remote device. `value` is `None` when the
/// device omits the state field; normalization is kind-specific.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityEvent {
    pub kind: EntityKind,
    pub entity: String,
    pub value: Option<EventValue>,
}

// ============================================================================
// Entity dispatch table
// ============================================================================

/// Resolved target of a remote entity event. Entity names the device may
/// expose beyond this table are ignored by the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedEntity {
    Occupancy(Side),
    TriggerPressure(Side),
    Pressure(Side),
    ResponseSpeed,
    FullRange,
}

impl MappedEntity {
    /// Look up the logical target for an entity name within its event kind.
    pub fn resolve(kind: EntityKind, entity: &str) -> Option<MappedEntity> {
        match (kind, entity) {
            (EntityKind::Binary, "Bed Occupied Left") => Some(MappedEntity::Occupancy(Side::Left)),
            (EntityKind::Binary, "Bed Occupied Right") => {
                Some(MappedEntity::Occupancy(Side::Right))
            }
            (EntityKind::Binary, "Bed Occupied Either") => {
                Some(MappedEntity::Occupancy(Side::Either))
            }
            (EntityKind::Binary, "Bed Occupied Both") => Some(MappedEntity::Occupancy(Side::Both)),
            (EntityKind::Numeric, "Left Trigger Pressure") => {
                Some(MappedEntity::TriggerPressure(Side::Left))
            }
            (EntityKind::Numeric, "Right Trigger Pressure") => {
                Some(MappedEntity::TriggerPressure(Side::Right))
            }
            (EntityKind::Measurement, "Left Pressure") => Some(MappedEntity::Pressure(Side::Left)),
            (EntityKind::Measurement, "Right Pressure") => {
                Some(MappedEntity::Pressure(Side::Right))
            }
            (EntityKind::Selection, "Response Speed") => Some(MappedEntity::ResponseSpeed),
            (EntityKind::Toggle, "Full Range") => Some(MappedEntity::FullRange),
            _ => None,
        }
    }
}

// ============================================================================
// Capability model
// ============================================================================

/// A typed capability value in the local device model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CapabilityValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CapabilityValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CapabilityValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CapabilityValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for CapabilityValue {
    fn from(b: bool) -> Self {
        CapabilityValue::Bool(b)
    }
}

impl From<f64> for CapabilityValue {
    fn from(n: f64) -> Self {
        CapabilityValue::Number(n)
    }
}

impl From<&str> for CapabilityValue {
    fn from(s: &str) -> Self {
        CapabilityValue::Text(s.to_string())
    }
}

impl From<String> for CapabilityValue {
    fn from(s: String) -> Self {
        CapabilityValue::Text(s)
    }
}

/// Capability keys of the local device model.
pub mod keys {
    pub const PRESENCE_LEFT: &str = "presence.left";
    pub const PRESENCE_RIGHT: &str = "presence.right";
    pub const PRESENCE_AGGREGATE: &str = "presence.aggregate";
    pub const PRESSURE_THRESHOLD_LEFT: &str = "pressure_threshold.left";
    pub const PRESSURE_THRESHOLD_RIGHT: &str = "pressure_threshold.right";
    pub const CONFIDENCE_LEFT: &str = "confidence.left";
    pub const CONFIDENCE_RIGHT: &str = "confidence.right";
    pub const MODE_RANGE: &str = "mode.range";
    pub const MODE_SPEED: &str = "mode.speed";
    pub const CALIBRATE_LEFT_OCCUPIED: &str = "calibrate.left_occupied";
    pub const CALIBRATE_LEFT_UNOCCUPIED: &str = "calibrate.left_unoccupied";
    pub const CALIBRATE_RIGHT_OCCUPIED: &str = "calibrate.right_occupied";
    pub const CALIBRATE_RIGHT_UNOCCUPIED: &str = "calibrate.right_unoccupied";

    /// Every key of the model, for late capability registration.
    pub const ALL: &[&str] = &[
        PRESENCE_LEFT,
        PRESENCE_RIGHT,
        PRESENCE_AGGREGATE,
        PRESSURE_THRESHOLD_LEFT,
        PRESSURE_THRESHOLD_RIGHT,
        CONFIDENCE_LEFT,
        CONFIDENCE_RIGHT,
        MODE_RANGE,
        MODE_SPEED,
        CALIBRATE_LEFT_OCCUPIED,
        CALIBRATE_LEFT_UNOCCUPIED,
        CALIBRATE_RIGHT_OCCUPIED,
        CALIBRATE_RIGHT_UNOCCUPIED,
    ];
}

/// Display mapping for the full-range toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMode {
    On,
    Off,
}

impl RangeMode {
    pub fn from_bool(on: bool) -> Self {
        if on {
            RangeMode::On
        } else {
            RangeMode::Off
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RangeMode::On => "On",
            RangeMode::Off => "Off",
        }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, RangeMode::On)
    }
}

impl std::str::FromStr for RangeMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "On" => Ok(RangeMode::On),
            "Off" => Ok(RangeMode::Off),
            _ => Err(format!("Unknown range mode: {}", s)),
        }
    }
}

// ============================================================================
// Status snapshot
// ============================================================================

/// Point-in-time view of the connectivity monitor, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    pub availability: AvailabilityState,
    pub consecutive_failures: u32,
    pub backoff_ms: Option<u64>,
    pub probe_in_flight: bool,
    pub last_probe_at: Option<DateTime<Utc>>,
}
