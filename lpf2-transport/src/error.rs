//! Transport error types

use thiserror::Error;

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device disconnected")]
    Disconnected,

    #[error("Communication timeout")]
    Timeout,

    #[error("Write failed: {0}")]
    WriteFailed(String),

    // BLE-specific
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),

    #[error("Characteristic not found: {0}")]
    CharacteristicNotFound(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "bluetooth")]
impl From<btleplug::Error> for TransportError {
    fn from(e: btleplug::Error) -> Self {
        match e {
            btleplug::Error::DeviceNotFound => {
                TransportError::DeviceNotFound("peripheral vanished".into())
            }
            btleplug::Error::NotConnected => TransportError::Disconnected,
            btleplug::Error::TimedOut(_) => TransportError::Timeout,
            other => TransportError::Bluetooth(other.to_string()),
        }
    }
}
