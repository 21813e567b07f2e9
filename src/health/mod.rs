//! Connectivity monitoring

pub mod monitor;

pub use monitor::{ConnectivityMonitor, MonitorState, MonitorStep, ProbeOutcome};
