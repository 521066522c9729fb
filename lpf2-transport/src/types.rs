//! Common types for transport layer

/// Transport type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    /// Bluetooth Low Energy GATT
    Bluetooth,
    /// In-memory transport used by tests and offline tooling
    Mock,
}

/// Device identification information
#[derive(Debug, Clone)]
pub struct TransportDeviceInfo {
    /// Bluetooth address (or a synthetic identifier for mocks)
    pub address: String,
    /// Advertised local name, if any
    pub name: Option<String>,
    /// System type byte from the LEGO manufacturer data
    pub manufacturer_id: u8,
    /// Signal strength at discovery time
    pub rssi: Option<i16>,
    /// Transport type
    pub transport_type: TransportType,
}

impl TransportDeviceInfo {
    /// Human-readable label: name if advertised, address otherwise
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}
