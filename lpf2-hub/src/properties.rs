//! Latest decoded hub and sensor values

use serde::Serialize;

use crate::color::Color;

/// Four-part firmware/hardware version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub bugfix: u8,
    pub build: u16,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Version fields are BCD encoded on the wire
        write!(
            f,
            "{:x}.{:x}.{:02x}.{:04x}",
            self.major, self.minor, self.bugfix, self.build
        )
    }
}

/// Tilt sensor reading in degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Tilt {
    pub x: i8,
    pub y: i8,
}

/// One side of the Powered Up remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RemoteButtons {
    pub up: bool,
    pub down: bool,
    pub stop: bool,
    pub released: bool,
}

/// Everything the hub has told us so far; `None` means not yet reported
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertySnapshot {
    /// Percent
    pub battery_level: Option<u8>,
    /// Volts
    pub voltage: Option<f64>,
    /// Milliamps
    pub current: Option<f64>,
    /// dBm
    pub rssi: Option<i8>,
    pub firmware_version: Option<Version>,
    pub hardware_version: Option<Version>,
    pub tacho_motor_rotation: Option<i32>,
    pub hub_motor_rotation: Option<i32>,
    pub tilt: Option<Tilt>,
    pub color: Option<Color>,
    /// Centimetres
    pub distance: Option<f64>,
    pub hub_button: Option<bool>,
    pub left_remote: Option<RemoteButtons>,
    pub right_remote: Option<RemoteButtons>,
}

/// Holder for the snapshot; writes are reserved to the decoder
#[derive(Debug, Default)]
pub struct PropertyStore {
    values: PropertySnapshot,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PropertySnapshot {
        self.values.clone()
    }

    pub fn battery_level(&self) -> Option<u8> {
        self.values.battery_level
    }

    pub fn voltage(&self) -> Option<f64> {
        self.values.voltage
    }

    pub fn current(&self) -> Option<f64> {
        self.values.current
    }

    pub fn rssi(&self) -> Option<i8> {
        self.values.rssi
    }

    pub fn firmware_version(&self) -> Option<Version> {
        self.values.firmware_version
    }

    pub fn hardware_version(&self) -> Option<Version> {
        self.values.hardware_version
    }

    pub fn tacho_motor_rotation(&self) -> Option<i32> {
        self.values.tacho_motor_rotation
    }

    pub fn hub_motor_rotation(&self) -> Option<i32> {
        self.values.hub_motor_rotation
    }

    pub fn tilt(&self) -> Option<Tilt> {
        self.values.tilt
    }

    pub fn color(&self) -> Option<Color> {
        self.values.color
    }

    pub fn distance(&self) -> Option<f64> {
        self.values.distance
    }

    pub fn hub_button(&self) -> Option<bool> {
        self.values.hub_button
    }

    pub fn left_remote(&self) -> Option<RemoteButtons> {
        self.values.left_remote
    }

    pub fn right_remote(&self) -> Option<RemoteButtons> {
        self.values.right_remote
    }

    pub(crate) fn values_mut(&mut self) -> &mut PropertySnapshot {
        &mut self.values
    }

    pub(crate) fn reset(&mut self) {
        self.values = PropertySnapshot::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_unknown() {
        let store = PropertyStore::new();
        assert_eq!(store.snapshot(), PropertySnapshot::default());
        assert_eq!(store.battery_level(), None);
        assert_eq!(store.color(), None);
        assert_eq!(store.left_remote(), None);
    }

    #[test]
    fn test_reset() {
        let mut store = PropertyStore::new();
        store.values_mut().battery_level = Some(50);
        store.values_mut().tilt = Some(Tilt { x: 3, y: -4 });
        assert_eq!(store.tilt(), Some(Tilt { x: 3, y: -4 }));
        store.reset();
        assert_eq!(store.battery_level(), None);
        assert_eq!(store.tilt(), None);
    }

    #[test]
    fn test_version_display() {
        let v = Version {
            major: 1,
            minor: 0,
            bugfix: 0,
            build: 0x0224,
        };
        assert_eq!(v.to_string(), "1.0.00.0224");
    }
}
