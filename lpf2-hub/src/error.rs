//! Hub client error types

use lpf2_transport::TransportError;
use thiserror::Error;

use crate::types::DeviceType;

/// Errors from hub operations
#[derive(Error, Debug)]
pub enum HubError {
    /// Write or registry mutation attempted outside the connected state
    #[error("Hub is not connected")]
    NotConnected,

    /// Invalid parameter value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Read past the end of a buffer
    #[error("Read of {width} bytes at offset {offset} exceeds buffer of {len} bytes")]
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Non-fatal problems with an inbound notification
///
/// These never abort a session: the offending frame is dropped, the warning
/// is logged and published on the event channel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeWarning {
    #[error("{kind} frame too short: expected {expected} bytes, got {got}")]
    TooShort {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Length byte {declared} exceeds buffer of {got} bytes")]
    LengthMismatch { declared: usize, got: usize },

    #[error("Unknown message type 0x{0:02X}")]
    UnknownMessageType(u8),

    #[error("Unsupported hub property 0x{0:02X}")]
    UnsupportedProperty(u8),

    #[error("Unexpected hub property operation 0x{0:02X}")]
    UnexpectedOperation(u8),

    #[error("Unknown attach event 0x{0:02X}")]
    UnknownAttachEvent(u8),

    #[error("Value from port 0x{0:02X} with no known device")]
    UnknownPort(u8),

    #[error("Value from port 0x{0:02X} which was never activated")]
    PortNotActive(u8),

    #[error("No value parser for {0}")]
    NoParser(DeviceType),
}
