//! Notification frame decoding
//!
//! `decode` turns a raw notification into a typed `HubMessage`. Port value
//! frames are only split off here; their payload shape depends on the
//! device at the port, so they are parsed later through `sensor_parser`
//! once the registry has been consulted.
//!
//! Frame layout (all offsets absolute):
//! - Byte 0: total length
//! - Byte 1: hub id
//! - Byte 2: message type
//! - Byte 3..: message-specific payload, multi-byte fields little-endian

use crate::codec;
use crate::color::Color;
use crate::error::{DecodeWarning, HubError};
use crate::properties::{RemoteButtons, Tilt, Version};
use crate::protocol::{
    calibration, hub_property, io_event, message_type, property_op, HEADER_LEN,
};
use crate::types::{DeviceType, Port};

/// Offset of the first value byte in PORT_VALUE_SINGLE frames
const VALUE_OFFSET: usize = 4;

/// Short-range correction of the distance sensor in millimetres
const DISTANCE_CORRECTION_MM: f64 = 20.0;
const MM_PER_INCH: f64 = 25.4;

/// Raw remote button values
mod remote_value {
    pub const RELEASED: i8 = 0;
    pub const UP: i8 = 1;
    pub const DOWN: i8 = -1;
    pub const STOP: i8 = 127;
}

/// Upstream hub property update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HubPropertyUpdate {
    Button(bool),
    FirmwareVersion(Version),
    HardwareVersion(Version),
    Rssi(i8),
    BatteryLevel(u8),
}

/// Decoded notification
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Property(HubPropertyUpdate),
    Attached {
        port: Port,
        device_type: DeviceType,
        virtual_port: bool,
    },
    Detached {
        port: Port,
    },
    /// Raw port value frame, parsed once the device type is known
    PortValue {
        port: Port,
        frame: Vec<u8>,
    },
    /// Hub confirmed an input format setup (activation/deactivation)
    InputFormatAck {
        port: Port,
        mode: u8,
        notify: bool,
    },
    /// Port output command progress
    OutputFeedback {
        port: Port,
        feedback: u8,
    },
    /// Hub rejected a command
    Error {
        command: u8,
        code: u8,
    },
}

/// Parsed port value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorReading {
    DistanceColor { color: Color, distance_cm: f64 },
    TachoRotation(i32),
    HubMotorRotation(i32),
    Tilt(Tilt),
    RemoteButton(RemoteButtons),
    Voltage(f64),
    Current(f64),
}

/// Parser for a port value frame of one device type
pub type SensorParser = fn(&[u8]) -> Result<SensorReading, DecodeWarning>;

/// Map a codec failure onto a "frame too short" warning
fn truncated(kind: &'static str) -> impl FnOnce(HubError) -> DecodeWarning {
    move |err| {
        let (expected, got) = match err {
            HubError::OutOfBounds { offset, width, len } => (offset.saturating_add(width), len),
            _ => (0, 0),
        };
        DecodeWarning::TooShort {
            kind,
            expected,
            got,
        }
    }
}

/// Decode one notification frame
pub fn decode(data: &[u8]) -> Result<HubMessage, DecodeWarning> {
    if data.len() < HEADER_LEN {
        return Err(DecodeWarning::TooShort {
            kind: "frame",
            expected: HEADER_LEN,
            got: data.len(),
        });
    }

    let declared = data[0] as usize;
    if declared < HEADER_LEN || declared > data.len() {
        return Err(DecodeWarning::LengthMismatch {
            declared,
            got: data.len(),
        });
    }
    let frame = &data[..declared];

    match frame[2] {
        message_type::HUB_PROPERTIES => parse_hub_property(frame).map(HubMessage::Property),
        message_type::HUB_ATTACHED_IO => parse_attached_io(frame),
        message_type::GENERIC_ERROR => {
            let command = codec::read_u8(frame, 3).map_err(truncated("generic error"))?;
            let code = codec::read_u8(frame, 4).map_err(truncated("generic error"))?;
            Ok(HubMessage::Error { command, code })
        }
        message_type::PORT_VALUE_SINGLE => {
            let port = codec::read_u8(frame, 3).map_err(truncated("port value"))?;
            Ok(HubMessage::PortValue {
                port: Port(port),
                frame: frame.to_vec(),
            })
        }
        message_type::PORT_INPUT_FORMAT_SINGLE => {
            let notify = codec::read_u8(frame, 9).map_err(truncated("input format"))?;
            Ok(HubMessage::InputFormatAck {
                port: Port(frame[3]),
                mode: frame[4],
                notify: notify != 0,
            })
        }
        message_type::PORT_OUTPUT_FEEDBACK => {
            let feedback = codec::read_u8(frame, 4).map_err(truncated("output feedback"))?;
            Ok(HubMessage::OutputFeedback {
                port: Port(frame[3]),
                feedback,
            })
        }
        other => Err(DecodeWarning::UnknownMessageType(other)),
    }
}

/// Parse a HUB_PROPERTIES update
///
/// Format: [len, hub, 0x01, property, 0x06 (update), value...]
fn parse_hub_property(frame: &[u8]) -> Result<HubPropertyUpdate, DecodeWarning> {
    let property = codec::read_u8(frame, 3).map_err(truncated("hub property"))?;
    let operation = codec::read_u8(frame, 4).map_err(truncated("hub property"))?;
    if operation != property_op::UPDATE {
        return Err(DecodeWarning::UnexpectedOperation(operation));
    }

    match property {
        hub_property::BUTTON => {
            let state = codec::read_u8(frame, 5).map_err(truncated("button"))?;
            Ok(HubPropertyUpdate::Button(state == 1))
        }
        hub_property::FW_VERSION => {
            parse_version(frame, "firmware version").map(HubPropertyUpdate::FirmwareVersion)
        }
        hub_property::HW_VERSION => {
            parse_version(frame, "hardware version").map(HubPropertyUpdate::HardwareVersion)
        }
        hub_property::RSSI => {
            let rssi = codec::read_i8(frame, 5).map_err(truncated("rssi"))?;
            Ok(HubPropertyUpdate::Rssi(rssi))
        }
        hub_property::BATTERY_LEVEL => {
            let level = codec::read_u8(frame, 5).map_err(truncated("battery level"))?;
            Ok(HubPropertyUpdate::BatteryLevel(level))
        }
        other => Err(DecodeWarning::UnsupportedProperty(other)),
    }
}

/// Version number: int32 at byte 5, build in the low 16 bits, bugfix in
/// byte 7, major/minor nibbles in byte 8
fn parse_version(frame: &[u8], kind: &'static str) -> Result<Version, DecodeWarning> {
    let raw = codec::read_u32_le(frame, 5).map_err(truncated(kind))?;
    let [_, _, bugfix, major_minor] = raw.to_le_bytes();
    Ok(Version {
        major: major_minor >> 4,
        minor: major_minor & 0x0F,
        bugfix,
        build: (raw & 0xFFFF) as u16,
    })
}

/// Parse a HUB_ATTACHED_IO message
///
/// Format: [len, hub, 0x04, port, event, type_lo, type_hi, ...]
fn parse_attached_io(frame: &[u8]) -> Result<HubMessage, DecodeWarning> {
    let port = codec::read_u8(frame, 3).map_err(truncated("attached io"))?;
    let event = codec::read_u8(frame, 4).map_err(truncated("attached io"))?;

    match event {
        io_event::DETACHED => Ok(HubMessage::Detached { port: Port(port) }),
        io_event::ATTACHED | io_event::ATTACHED_VIRTUAL => {
            let code = codec::read_u16_le(frame, 5).map_err(truncated("attached io"))?;
            Ok(HubMessage::Attached {
                port: Port(port),
                device_type: DeviceType::from_code(code),
                virtual_port: event == io_event::ATTACHED_VIRTUAL,
            })
        }
        other => Err(DecodeWarning::UnknownAttachEvent(other)),
    }
}

/// Select the value parser for a device type
pub fn sensor_parser(device_type: DeviceType) -> Option<SensorParser> {
    match device_type {
        DeviceType::BoostDistance => Some(parse_distance_color),
        DeviceType::BoostTachoMotor => Some(parse_tacho_motor),
        DeviceType::BoostMoveHubMotor => Some(parse_hub_motor),
        DeviceType::BoostTilt => Some(parse_tilt),
        DeviceType::PoweredUpRemoteButton => Some(parse_remote_button),
        DeviceType::Voltage => Some(parse_voltage),
        DeviceType::Current => Some(parse_current),
        _ => None,
    }
}

/// Color and distance sensor, combined mode 8
///
/// [4] color, [5] distance in inches, [7] fractional divisor (non-zero at short range)
fn parse_distance_color(frame: &[u8]) -> Result<SensorReading, DecodeWarning> {
    let partial = codec::read_u8(frame, VALUE_OFFSET + 3).map_err(truncated("distance/color"))?;
    let color = Color::from_raw(frame[VALUE_OFFSET]);
    let mut inches = f64::from(frame[VALUE_OFFSET + 1]);
    if partial > 0 {
        inches += 1.0 / f64::from(partial);
    }
    let mm = ((inches * MM_PER_INCH).floor() - DISTANCE_CORRECTION_MM).max(0.0);
    Ok(SensorReading::DistanceColor {
        color,
        distance_cm: mm / 10.0,
    })
}

fn parse_tacho_motor(frame: &[u8]) -> Result<SensorReading, DecodeWarning> {
    let rotation = codec::read_i32_le(frame, VALUE_OFFSET).map_err(truncated("tacho motor"))?;
    Ok(SensorReading::TachoRotation(rotation))
}

fn parse_hub_motor(frame: &[u8]) -> Result<SensorReading, DecodeWarning> {
    let rotation = codec::read_i32_le(frame, VALUE_OFFSET).map_err(truncated("hub motor"))?;
    Ok(SensorReading::HubMotorRotation(rotation))
}

fn parse_tilt(frame: &[u8]) -> Result<SensorReading, DecodeWarning> {
    let x = codec::read_i8(frame, VALUE_OFFSET).map_err(truncated("tilt"))?;
    let y = codec::read_i8(frame, VALUE_OFFSET + 1).map_err(truncated("tilt"))?;
    Ok(SensorReading::Tilt(Tilt { x, y }))
}

fn parse_remote_button(frame: &[u8]) -> Result<SensorReading, DecodeWarning> {
    let value = codec::read_i8(frame, VALUE_OFFSET).map_err(truncated("remote button"))?;
    Ok(SensorReading::RemoteButton(RemoteButtons {
        up: value == remote_value::UP,
        down: value == remote_value::DOWN,
        stop: value == remote_value::STOP,
        released: value == remote_value::RELEASED,
    }))
}

fn parse_voltage(frame: &[u8]) -> Result<SensorReading, DecodeWarning> {
    let raw = codec::read_u16_le(frame, VALUE_OFFSET).map_err(truncated("voltage"))?;
    Ok(SensorReading::Voltage(calibration::voltage(raw)))
}

fn parse_current(frame: &[u8]) -> Result<SensorReading, DecodeWarning> {
    let raw = codec::read_u16_le(frame, VALUE_OFFSET).map_err(truncated("current"))?;
    Ok(SensorReading::Current(calibration::current(raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battery_update() {
        let msg = decode(&[0x06, 0x00, 0x01, 0x06, 0x06, 0x57]).unwrap();
        assert_eq!(msg, HubMessage::Property(HubPropertyUpdate::BatteryLevel(87)));
    }

    #[test]
    fn test_button_and_rssi() {
        assert_eq!(
            decode(&[0x06, 0x00, 0x01, 0x02, 0x06, 0x01]).unwrap(),
            HubMessage::Property(HubPropertyUpdate::Button(true))
        );
        assert_eq!(
            decode(&[0x06, 0x00, 0x01, 0x02, 0x06, 0x00]).unwrap(),
            HubMessage::Property(HubPropertyUpdate::Button(false))
        );
        assert_eq!(
            decode(&[0x06, 0x00, 0x01, 0x05, 0x06, 0xC4]).unwrap(),
            HubMessage::Property(HubPropertyUpdate::Rssi(-60))
        );
    }

    #[test]
    fn test_firmware_version() {
        // 1.0.00.0224
        let msg = decode(&[0x09, 0x00, 0x01, 0x03, 0x06, 0x24, 0x02, 0x00, 0x10]).unwrap();
        assert_eq!(
            msg,
            HubMessage::Property(HubPropertyUpdate::FirmwareVersion(Version {
                major: 1,
                minor: 0,
                bugfix: 0,
                build: 0x0224,
            }))
        );
    }

    #[test]
    fn test_truncated_version() {
        let result = decode(&[0x08, 0x00, 0x01, 0x04, 0x06, 0x00, 0x00, 0x00]);
        assert_eq!(
            result,
            Err(DecodeWarning::TooShort {
                kind: "hardware version",
                expected: 9,
                got: 8
            })
        );
    }

    #[test]
    fn test_property_operation_must_be_update() {
        assert_eq!(
            decode(&[0x05, 0x00, 0x01, 0x06, 0x02]),
            Err(DecodeWarning::UnexpectedOperation(0x02))
        );
        assert_eq!(
            decode(&[0x06, 0x00, 0x01, 0x0B, 0x06, 0x00]),
            Err(DecodeWarning::UnsupportedProperty(0x0B))
        );
    }

    #[test]
    fn test_attach_and_detach() {
        assert_eq!(
            decode(&[0x0F, 0x00, 0x04, 0x37, 0x01, 0x01, 0x00, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap(),
            HubMessage::Attached {
                port: Port::A,
                device_type: DeviceType::BasicMotor,
                virtual_port: false,
            }
        );
        assert_eq!(
            decode(&[0x09, 0x00, 0x04, 0x39, 0x02, 0x27, 0x00, 0x37, 0x38]).unwrap(),
            HubMessage::Attached {
                port: Port::AB,
                device_type: DeviceType::BoostMoveHubMotor,
                virtual_port: true,
            }
        );
        assert_eq!(
            decode(&[0x05, 0x00, 0x04, 0x37, 0x00]).unwrap(),
            HubMessage::Detached { port: Port::A }
        );
        assert_eq!(
            decode(&[0x05, 0x00, 0x04, 0x37, 0x07]),
            Err(DecodeWarning::UnknownAttachEvent(0x07))
        );
    }

    #[test]
    fn test_envelope_checks() {
        assert!(matches!(
            decode(&[0x06, 0x00]),
            Err(DecodeWarning::TooShort { kind: "frame", .. })
        ));
        assert_eq!(
            decode(&[0x10, 0x00, 0x01, 0x06, 0x06, 0x57]),
            Err(DecodeWarning::LengthMismatch {
                declared: 16,
                got: 6
            })
        );
        assert_eq!(
            decode(&[0x04, 0x00, 0x66, 0x00]),
            Err(DecodeWarning::UnknownMessageType(0x66))
        );
        // Trailing bytes past the declared length are ignored
        assert_eq!(
            decode(&[0x06, 0x00, 0x01, 0x06, 0x06, 0x20, 0xAA, 0xBB]).unwrap(),
            HubMessage::Property(HubPropertyUpdate::BatteryLevel(32))
        );
    }

    #[test]
    fn test_acks_and_errors() {
        assert_eq!(
            decode(&[0x0A, 0x00, 0x47, 0x01, 0x08, 0x01, 0x00, 0x00, 0x00, 0x01]).unwrap(),
            HubMessage::InputFormatAck {
                port: Port::C,
                mode: 8,
                notify: true,
            }
        );
        assert_eq!(
            decode(&[0x05, 0x00, 0x82, 0x37, 0x0A]).unwrap(),
            HubMessage::OutputFeedback {
                port: Port::A,
                feedback: 0x0A,
            }
        );
        assert_eq!(
            decode(&[0x05, 0x00, 0x05, 0x81, 0x05]).unwrap(),
            HubMessage::Error {
                command: 0x81,
                code: 0x05,
            }
        );
    }

    #[test]
    fn test_distance_color() {
        let parse = sensor_parser(DeviceType::BoostDistance).unwrap();
        // Red, 2 inches, no fraction: floor(50.8) - 20 = 30 mm
        let reading = parse(&[0x08, 0x00, 0x45, 0x01, 0x09, 0x02, 0x00, 0x00]).unwrap();
        assert_eq!(
            reading,
            SensorReading::DistanceColor {
                color: Color::Red,
                distance_cm: 3.0,
            }
        );

        // Short range: 1 + 1/2 inches: floor(38.1) - 20 = 18 mm
        let reading = parse(&[0x08, 0x00, 0x45, 0x01, 0xFF, 0x01, 0x00, 0x02]).unwrap();
        assert_eq!(
            reading,
            SensorReading::DistanceColor {
                color: Color::None,
                distance_cm: 1.8,
            }
        );
    }

    #[test]
    fn test_distance_color_too_short() {
        let parse = sensor_parser(DeviceType::BoostDistance).unwrap();
        assert!(matches!(
            parse(&[0x07, 0x00, 0x45, 0x01, 0x09, 0x02, 0x00]),
            Err(DecodeWarning::TooShort { expected: 8, got: 7, .. })
        ));
    }

    #[test]
    fn test_motor_rotation() {
        let frame = [0x08, 0x00, 0x45, 0x37, 0x98, 0xFE, 0xFF, 0xFF];
        assert_eq!(
            sensor_parser(DeviceType::BoostTachoMotor).unwrap()(&frame).unwrap(),
            SensorReading::TachoRotation(-360)
        );
        assert_eq!(
            sensor_parser(DeviceType::BoostMoveHubMotor).unwrap()(&frame).unwrap(),
            SensorReading::HubMotorRotation(-360)
        );
    }

    #[test]
    fn test_tilt() {
        let reading = sensor_parser(DeviceType::BoostTilt).unwrap()(&[
            0x06, 0x00, 0x45, 0x3A, 0x05, 0xF6,
        ])
        .unwrap();
        assert_eq!(reading, SensorReading::Tilt(Tilt { x: 5, y: -10 }));
    }

    #[test]
    fn test_remote_button_values() {
        let parse = sensor_parser(DeviceType::PoweredUpRemoteButton).unwrap();
        let buttons = |v: u8| match parse(&[0x05, 0x00, 0x45, 0x00, v]).unwrap() {
            SensorReading::RemoteButton(b) => b,
            other => panic!("Expected RemoteButton, got {:?}", other),
        };
        assert!(buttons(0x01).up);
        assert!(buttons(0xFF).down);
        assert!(buttons(0x7F).stop);
        assert!(buttons(0x00).released);
        assert_eq!(buttons(0x33), RemoteButtons::default());
    }

    #[test]
    fn test_voltage_current() {
        let v = sensor_parser(DeviceType::Voltage).unwrap()(&[0x06, 0x00, 0x45, 0x3C, 0x35, 0x0F])
            .unwrap();
        match v {
            SensorReading::Voltage(volts) => assert!((volts - 9.6).abs() < 1e-9),
            other => panic!("Expected Voltage, got {:?}", other),
        }
        let c = sensor_parser(DeviceType::Current).unwrap()(&[0x06, 0x00, 0x45, 0x3B, 0xFF, 0x0F])
            .unwrap();
        match c {
            SensorReading::Current(ma) => assert!((ma - 2444.0).abs() < 1e-9),
            other => panic!("Expected Current, got {:?}", other),
        }
    }

    #[test]
    fn test_no_parser_for_outputs() {
        assert!(sensor_parser(DeviceType::TrainMotor).is_none());
        assert!(sensor_parser(DeviceType::Other(75)).is_none());
    }
}
