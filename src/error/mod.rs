//! Error handling module

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Reconnect failed: {0}")]
    Lifecycle(String),

    #[error("No client connected")]
    NotConnected,

    #[error("Missing connection parameters")]
    MissingParams,

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Capability store error: {0}")]
    Store(String),
}
