//! ESPHome device integration
//!
//! Client boundary, lifecycle management, and state synchronization for the
//! dual-zone bed presence sensor.

pub mod client;
pub mod manager;
pub mod sync;

pub use client::{ClientConfig, ClientEvent, ClientFactory, EspClient};
pub use manager::ClientManager;
pub use sync::StateSynchronizer;
