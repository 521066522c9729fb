//! In-memory transport
//!
//! `MockConnector` hands out `MockConnection`s that record every written
//! frame and let the caller inject notification frames as if a hub had
//! sent them. Used by the test suites of the crates built on top of this
//! one, and handy for replaying captured sessions without hardware.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::error::TransportError;
use crate::types::{TransportDeviceInfo, TransportType};
use crate::{Connection, Connector, NOTIFICATION_CHANNEL_CAPACITY};

/// Address reported by mock connections unless overridden
pub const MOCK_ADDRESS: &str = "00:16:53:00:00:01";

/// Connector that produces in-memory connections
pub struct MockConnector {
    address: String,
    manufacturer_id: u8,
    fail_connect: AtomicBool,
    connect_attempts: AtomicUsize,
    connections: Mutex<Vec<Arc<MockConnection>>>,
}

impl MockConnector {
    /// Create a connector whose hub advertises `manufacturer_id`
    pub fn new(manufacturer_id: u8) -> Self {
        Self::with_address(MOCK_ADDRESS, manufacturer_id)
    }

    /// Create a connector whose hub lives at `address`
    pub fn with_address(address: &str, manufacturer_id: u8) -> Self {
        Self {
            address: address.to_string(),
            manufacturer_id,
            fail_connect: AtomicBool::new(false),
            connect_attempts: AtomicUsize::new(0),
            connections: Mutex::new(Vec::new()),
        }
    }

    /// Make subsequent connection attempts fail (or succeed again)
    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Number of `scan_and_connect` calls so far
    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    /// Most recently opened connection
    pub fn last_connection(&self) -> Option<Arc<MockConnection>> {
        self.connections.lock().last().cloned()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn scan_and_connect(
        &self,
        service: Uuid,
        address: Option<&str>,
    ) -> Result<Arc<dyn Connection>, TransportError> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        debug!("Mock scan for service {} (address {:?})", service, address);

        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::Bluetooth("mock connect failure".into()));
        }
        if let Some(addr) = address {
            if !addr.eq_ignore_ascii_case(&self.address) {
                return Err(TransportError::DeviceNotFound(addr.to_string()));
            }
        }

        let conn = Arc::new(MockConnection::new(&self.address, self.manufacturer_id));
        self.connections.lock().push(Arc::clone(&conn));
        Ok(conn)
    }
}

/// In-memory connection
pub struct MockConnection {
    info: TransportDeviceInfo,
    written: Mutex<Vec<Vec<u8>>>,
    notify_tx: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    connected: AtomicBool,
    fail_writes: AtomicBool,
}

impl MockConnection {
    /// Create a standalone connection
    pub fn new(address: &str, manufacturer_id: u8) -> Self {
        Self {
            info: TransportDeviceInfo {
                address: address.to_string(),
                name: Some("Mock Hub".to_string()),
                manufacturer_id,
                rssi: None,
                transport_type: TransportType::Mock,
            },
            written: Mutex::new(Vec::new()),
            notify_tx: Mutex::new(None),
            connected: AtomicBool::new(true),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// All frames written so far, in order
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.written.lock().clone()
    }

    /// Forget recorded frames
    pub fn clear_written(&self) {
        self.written.lock().clear();
    }

    /// Make subsequent writes fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Push a notification frame to the subscriber
    pub async fn notify(&self, frame: &[u8]) -> Result<(), TransportError> {
        let tx = self
            .notify_tx
            .lock()
            .clone()
            .ok_or_else(|| TransportError::Internal("no subscriber".into()))?;
        tx.send(frame.to_vec())
            .await
            .map_err(|_| TransportError::Disconnected)
    }

    /// Simulate the hub going away: closes the notification channel
    pub fn drop_link(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.notify_tx.lock().take();
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::WriteFailed("mock write failure".into()));
        }
        self.written.lock().push(frame.to_vec());
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<Vec<u8>>, TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        let (tx, rx) = mpsc::channel(NOTIFICATION_CHANNEL_CAPACITY);
        *self.notify_tx.lock() = Some(tx);
        Ok(rx)
    }

    fn manufacturer_id(&self) -> u8 {
        self.info.manufacturer_id
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.drop_link();
        Ok(())
    }
}
