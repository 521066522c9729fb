//! High-level client for LPF2 hubs (Boost, Powered Up, Control+, remotes)
//!
//! This crate implements the protocol and state layer on top of any
//! `lpf2_transport::Connector`: frame encoding and decoding, the port/device
//! registry, the latest reported sensor values and the connection lifecycle.
//!
//! ```ignore
//! use lpf2_hub::{Hub, Port};
//!
//! let hub = Hub::new(connector);
//! hub.connect(None).await?;
//! hub.set_motor_speed(Port::A, 50).await?;
//! println!("battery: {:?}", hub.battery_level());
//! ```

pub mod codec;
pub mod color;
pub mod command;
pub mod connection;
pub mod decoder;
pub mod error;
pub mod hub;
pub mod properties;
pub mod protocol;
pub mod registry;
pub mod state;
pub mod types;

pub use color::{Color, Rgb};
pub use connection::ConnectionState;
pub use decoder::{HubMessage, HubPropertyUpdate, SensorReading};
pub use error::{DecodeWarning, HubError};
pub use hub::{ButtonCallback, Hub, HubOptions};
pub use properties::{PropertySnapshot, RemoteButtons, Tilt, Version};
pub use state::HubEvent;
pub use types::{Device, DeviceType, HubType, Port};
