//! PrinterConnector middleware for monitoring hub traffic
//!
//! Wraps any `Connector` so that every connection it opens logs outbound
//! commands and inbound notifications.
//!
//! # Example
//!
//! ```ignore
//! use lpf2_transport::{BleConnector, PrinterConfig, PrinterConnector};
//!
//! let connector = BleConnector::new().await?;
//! let monitored = PrinterConnector::wrap(Arc::new(connector), PrinterConfig::default());
//! // Every frame on connections opened through `monitored` is now printed
//! ```

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::{
    Connection, Connector, TransportDeviceInfo, TransportError, NOTIFICATION_CHANNEL_CAPACITY,
};

/// Offset of the message type byte in every LPF2 frame
const MESSAGE_TYPE_OFFSET: usize = 2;

/// Packet filter for selective display
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PacketFilter {
    #[default]
    All,
    Notifications,
    Commands,
    MessageType(u8),
}

impl FromStr for PacketFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            "notifications" | "notify" | "events" => Ok(Self::Notifications),
            "commands" | "cmd" | "cmds" => Ok(Self::Commands),
            s if s.starts_with("type=") || s.starts_with("0x") => {
                let hex_str = s.strip_prefix("type=").unwrap_or(s);
                let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
                u8::from_str_radix(hex_str, 16)
                    .map(Self::MessageType)
                    .map_err(|e| format!("Invalid message type: {}", e))
            }
            _ => Err(format!("Unknown filter: {}", s)),
        }
    }
}

/// Direction of a frame on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Outbound,
    Inbound,
}

/// Configuration for the PrinterConnector
#[derive(Debug, Clone, Default)]
pub struct PrinterConfig {
    /// Filter for selective display
    pub filter: PacketFilter,
}

impl PrinterConfig {
    /// Create config with filter
    pub fn with_filter(mut self, filter: PacketFilter) -> Self {
        self.filter = filter;
        self
    }

    fn should_show(&self, direction: Direction, frame: &[u8]) -> bool {
        match &self.filter {
            PacketFilter::All => true,
            PacketFilter::Commands => direction == Direction::Outbound,
            PacketFilter::Notifications => direction == Direction::Inbound,
            PacketFilter::MessageType(t) => frame.get(MESSAGE_TYPE_OFFSET) == Some(t),
        }
    }
}

/// Format a frame as space-separated hex bytes
pub fn hex_dump(frame: &[u8]) -> String {
    frame
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_frame(config: &PrinterConfig, direction: Direction, frame: &[u8]) {
    if !config.should_show(direction, frame) {
        return;
    }
    let arrow = match direction {
        Direction::Outbound => ">>",
        Direction::Inbound => "<<",
    };
    info!("{} [{:2}] {}", arrow, frame.len(), hex_dump(frame));
}

/// Connector middleware that prints all frames
pub struct PrinterConnector {
    inner: Arc<dyn Connector>,
    config: PrinterConfig,
}

impl PrinterConnector {
    /// Wrap a connector with printing middleware
    pub fn wrap(connector: Arc<dyn Connector>, config: PrinterConfig) -> Arc<dyn Connector> {
        Arc::new(Self {
            inner: connector,
            config,
        })
    }
}

#[async_trait]
impl Connector for PrinterConnector {
    async fn scan_and_connect(
        &self,
        service: Uuid,
        address: Option<&str>,
    ) -> Result<Arc<dyn Connection>, TransportError> {
        let inner = self.inner.scan_and_connect(service, address).await?;
        let info = inner.device_info();
        info!(
            "Connected to {} ({}) manufacturer id 0x{:02X}",
            info.label(),
            info.address,
            inner.manufacturer_id()
        );
        Ok(Arc::new(PrinterConnection {
            inner,
            config: self.config.clone(),
        }))
    }
}

/// Connection wrapper produced by `PrinterConnector`
struct PrinterConnection {
    inner: Arc<dyn Connection>,
    config: PrinterConfig,
}

#[async_trait]
impl Connection for PrinterConnection {
    async fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
        print_frame(&self.config, Direction::Outbound, frame);
        self.inner.write(frame).await
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<Vec<u8>>, TransportError> {
        let mut upstream = self.inner.subscribe().await?;
        let (tx, rx) = mpsc::channel(NOTIFICATION_CHANNEL_CAPACITY);
        let config = self.config.clone();
        tokio::spawn(async move {
            while let Some(frame) = upstream.recv().await {
                print_frame(&config, Direction::Inbound, &frame);
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }

    fn manufacturer_id(&self) -> u8 {
        self.inner.manufacturer_id()
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        self.inner.device_info()
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.inner.disconnect().await
    }
}
