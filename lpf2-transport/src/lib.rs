//! Transport abstraction layer for LPF2 hub communication
//!
//! LPF2 hubs (Boost Move Hub, Powered Up hub, Control+ hub, remotes, Duplo
//! train base) expose a single GATT characteristic that carries every
//! command and every notification. This crate hides how that characteristic
//! is reached:
//!
//! - Bluetooth Low Energy via `btleplug` (feature `bluetooth`)
//! - In-memory mock for tests and offline tooling
//! - Printer middleware that logs the traffic of any other backend

pub mod error;
pub mod mock;
pub mod printer;
pub mod protocol;
pub mod types;

#[cfg(feature = "bluetooth")]
pub mod bluetooth;

pub use error::TransportError;
pub use mock::{MockConnection, MockConnector};
pub use printer::{PacketFilter, PrinterConfig, PrinterConnector};
pub use types::{TransportDeviceInfo, TransportType};

#[cfg(feature = "bluetooth")]
pub use bluetooth::BleConnector;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Opens connections to hubs
///
/// A connector scans for a device advertising `service` and opens a GATT
/// connection to it. It never interprets protocol frames.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to the hub at `address`, or to the first device advertising
    /// `service` when no address is given
    async fn scan_and_connect(
        &self,
        service: Uuid,
        address: Option<&str>,
    ) -> Result<Arc<dyn Connection>, TransportError>;
}

/// An open link to one hub
///
/// Each `write` carries one complete frame. Notifications are delivered as
/// raw byte buffers through the channel returned by `subscribe`.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Hand one complete frame to the characteristic (no delivery confirmation)
    async fn write(&self, frame: &[u8]) -> Result<(), TransportError>;

    /// Enable notifications and return the receiving end of the notification channel
    ///
    /// The channel closes when the link goes away.
    async fn subscribe(&self) -> Result<mpsc::Receiver<Vec<u8>>, TransportError>;

    /// System type byte from the advertised manufacturer data
    fn manufacturer_id(&self) -> u8;

    /// Get device information
    fn device_info(&self) -> &TransportDeviceInfo;

    /// Close the link
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Capacity of the notification channel between a backend and its consumer
pub const NOTIFICATION_CHANNEL_CAPACITY: usize = 256;
