//! Port/device registry
//!
//! Tracks which device is attached to each port and which ports have been
//! asked to report values. Both are rebuilt from scratch per connection.

use std::collections::BTreeMap;

use crate::types::{Device, DeviceType, Port};

/// Reporting request remembered for a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub device_type: DeviceType,
    pub mode: u8,
}

#[derive(Debug, Default)]
pub struct PortRegistry {
    devices: BTreeMap<Port, DeviceType>,
    activations: BTreeMap<Port, Activation>,
}

impl PortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `device_type` to `port`, replacing whatever was there
    pub fn register(&mut self, port: Port, device_type: DeviceType) -> Option<DeviceType> {
        let previous = self.devices.insert(port, device_type);
        if previous.is_some_and(|p| p != device_type) {
            // A different device cannot inherit the old reporting mode
            self.activations.remove(&port);
        }
        previous
    }

    /// Remove the device (and its activation) from `port`
    pub fn deregister(&mut self, port: Port) -> Option<DeviceType> {
        self.activations.remove(&port);
        self.devices.remove(&port)
    }

    pub fn device_type_at(&self, port: Port) -> Option<DeviceType> {
        self.devices.get(&port).copied()
    }

    /// Attached devices ordered by port number
    pub fn devices(&self) -> Vec<Device> {
        self.devices
            .iter()
            .map(|(port, device_type)| Device::new(*port, *device_type))
            .collect()
    }

    pub fn record_activation(&mut self, port: Port, device_type: DeviceType, mode: u8) {
        self.activations.insert(port, Activation { device_type, mode });
    }

    pub fn record_deactivation(&mut self, port: Port) -> Option<Activation> {
        self.activations.remove(&port)
    }

    /// Put back an activation captured earlier, or clear it if there was none
    pub fn restore_activation(&mut self, port: Port, activation: Option<Activation>) {
        match activation {
            Some(activation) => {
                self.activations.insert(port, activation);
            }
            None => {
                self.activations.remove(&port);
            }
        }
    }

    pub fn activation(&self, port: Port) -> Option<Activation> {
        self.activations.get(&port).copied()
    }

    /// Device type expected for values from `port`: the type the
    /// activation was requested for (its mode decides the value layout),
    /// else the attached device
    pub fn reporting_type(&self, port: Port) -> Option<DeviceType> {
        self.activation(port)
            .map(|a| a.device_type)
            .or_else(|| self.device_type_at(port))
    }

    pub fn clear(&mut self) {
        self.devices.clear();
        self.activations.clear();
    }
}
