//! Hub, port and device identifiers

use std::fmt;

use lpf2_transport::protocol::system_type;
use serde::Serialize;

/// Hub model, derived from the advertised system type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum HubType {
    #[default]
    Unknown,
    WeDo2SmartHub,
    BoostMoveHub,
    PoweredUpHub,
    PoweredUpRemote,
    DuploTrainHub,
    ControlPlusHub,
}

impl HubType {
    pub fn from_manufacturer_id(id: u8) -> Self {
        match id {
            system_type::DUPLO_TRAIN_HUB => Self::DuploTrainHub,
            system_type::BOOST_MOVE_HUB => Self::BoostMoveHub,
            system_type::POWERED_UP_HUB => Self::PoweredUpHub,
            system_type::POWERED_UP_REMOTE => Self::PoweredUpRemote,
            system_type::CONTROL_PLUS_HUB => Self::ControlPlusHub,
            _ => Self::Unknown,
        }
    }

    /// Port of the built-in RGB LED
    pub fn led_port(&self) -> Port {
        match self {
            Self::PoweredUpRemote => Port::REMOTE_LED,
            Self::DuploTrainHub => Port::DUPLO_LED,
            _ => Port::LED,
        }
    }
}

impl fmt::Display for HubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "Unknown hub",
            Self::WeDo2SmartHub => "WeDo 2.0 Smart Hub",
            Self::BoostMoveHub => "Boost Move Hub",
            Self::PoweredUpHub => "Powered Up Hub",
            Self::PoweredUpRemote => "Powered Up Remote",
            Self::DuploTrainHub => "Duplo Train Hub",
            Self::ControlPlusHub => "Control+ Hub",
        };
        f.write_str(name)
    }
}

/// Peripheral kind reported in attach messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Undefined,
    BasicMotor,
    TrainMotor,
    LedLights,
    Voltage,
    Current,
    BoostLed,
    BoostDistance,
    BoostTachoMotor,
    BoostMoveHubMotor,
    BoostTilt,
    PoweredUpRemoteButton,
    /// Undocumented device, raw type code kept as-is
    Other(u16),
}

impl DeviceType {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => Self::Undefined,
            1 => Self::BasicMotor,
            2 => Self::TrainMotor,
            8 => Self::LedLights,
            20 => Self::Voltage,
            21 => Self::Current,
            22 => Self::BoostLed,
            37 => Self::BoostDistance,
            38 => Self::BoostTachoMotor,
            39 => Self::BoostMoveHubMotor,
            40 => Self::BoostTilt,
            55 => Self::PoweredUpRemoteButton,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::Undefined => 0,
            Self::BasicMotor => 1,
            Self::TrainMotor => 2,
            Self::LedLights => 8,
            Self::Voltage => 20,
            Self::Current => 21,
            Self::BoostLed => 22,
            Self::BoostDistance => 37,
            Self::BoostTachoMotor => 38,
            Self::BoostMoveHubMotor => 39,
            Self::BoostTilt => 40,
            Self::PoweredUpRemoteButton => 55,
            Self::Other(code) => *code,
        }
    }

    /// Reporting mode requested when activating this device
    pub fn mode(&self) -> u8 {
        match self {
            Self::BoostTachoMotor | Self::BoostMoveHubMotor => 0x02,
            Self::BoostDistance => 0x08,
            _ => 0x00,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::BasicMotor => f.write_str("basic motor"),
            Self::TrainMotor => f.write_str("train motor"),
            Self::LedLights => f.write_str("LED lights"),
            Self::Voltage => f.write_str("voltage sensor"),
            Self::Current => f.write_str("current sensor"),
            Self::BoostLed => f.write_str("Boost LED"),
            Self::BoostDistance => f.write_str("Boost color/distance sensor"),
            Self::BoostTachoMotor => f.write_str("Boost tacho motor"),
            Self::BoostMoveHubMotor => f.write_str("Boost Move Hub motor"),
            Self::BoostTilt => f.write_str("Boost tilt sensor"),
            Self::PoweredUpRemoteButton => f.write_str("remote button"),
            Self::Other(code) => write!(f, "device type {}", code),
        }
    }
}

/// Port number as used on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Port(pub u8);

impl Port {
    pub const A: Port = Port(0x37);
    pub const B: Port = Port(0x38);
    pub const AB: Port = Port(0x39);
    pub const C: Port = Port(0x01);
    pub const D: Port = Port(0x02);
    pub const TILT: Port = Port(0x3A);

    // Powered Up remote sides
    pub const REMOTE_LEFT: Port = Port(0x00);
    pub const REMOTE_RIGHT: Port = Port(0x01);

    // Hub internals
    pub const LED: Port = Port(0x32);
    pub const REMOTE_LED: Port = Port(0x34);
    pub const DUPLO_LED: Port = Port(0x11);
    pub const CURRENT: Port = Port(0x3B);
    pub const VOLTAGE: Port = Port(0x3C);

    pub fn code(&self) -> u8 {
        self.0
    }

    /// Parse a user-facing port name (`A`, `B`, `AB`, `C`, `D`, `TILT`) or a raw number
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "AB" => Some(Self::AB),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            "TILT" => Some(Self::TILT),
            other => {
                let parsed = match other.strip_prefix("0X") {
                    Some(hex) => u8::from_str_radix(hex, 16),
                    None => other.parse::<u8>(),
                };
                parsed.ok().map(Port)
            }
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// A peripheral attached to a port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device {
    pub port: Port,
    pub device_type: DeviceType,
}

impl Device {
    pub fn new(port: Port, device_type: DeviceType) -> Self {
        Self { port, device_type }
    }
}
