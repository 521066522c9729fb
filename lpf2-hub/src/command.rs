//! Typed command builders
//!
//! Every builder returns complete frames ready for a single transport write.
//! Argument validation happens here so nothing malformed reaches the hub.

use crate::codec::{i16_to_bytes, i32_to_bytes};
use crate::color::{Color, Rgb};
use crate::error::HubError;
use crate::protocol::{self, hub_action, hub_property, message_type, output, property_op};
use crate::types::Port;

/// Longest advertising name the hub accepts
pub const MAX_NAME_LEN: usize = 14;

/// Motor power limit in either direction
pub const MAX_SPEED: i32 = 100;

/// LED mode selecting an indexed color
const LED_MODE_COLOR: u8 = 0x00;
/// LED mode selecting a raw RGB triple
const LED_MODE_RGB: u8 = 0x01;
/// Motor mode for direct power
const MOTOR_MODE_POWER: u8 = 0x00;

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::HubProperty {}
    impl Sealed for super::HubAction {}
    impl Sealed for super::PortInputFormatSetup {}
    impl Sealed for super::WriteDirectModeData {}
    impl Sealed for super::StartSpeedForTime {}
    impl Sealed for super::StartSpeedForDegrees {}
}

/// A command that can be serialized to an LPF2 frame
///
/// Implemented only by the command structs below, which all fit a
/// short-length frame.
pub trait HubCommand: sealed::Sealed {
    /// Message type byte (e.g. 0x81 for port output commands)
    const MESSAGE_TYPE: u8;

    /// Serialize everything after the message type byte
    fn payload(&self) -> Vec<u8>;

    /// Build the complete frame including length and hub id
    fn build(&self) -> Vec<u8> {
        protocol::build_frame(Self::MESSAGE_TYPE, &self.payload())
    }
}

/// HUB_PROPERTIES downstream command (0x01)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubProperty {
    pub property: u8,
    pub operation: u8,
    pub(crate) data: Vec<u8>,
}

impl HubProperty {
    pub fn enable_updates(property: u8) -> Self {
        Self {
            property,
            operation: property_op::ENABLE_UPDATES,
            data: Vec::new(),
        }
    }

    pub fn request_update(property: u8) -> Self {
        Self {
            property,
            operation: property_op::REQUEST_UPDATE,
            data: Vec::new(),
        }
    }
}

impl HubCommand for HubProperty {
    const MESSAGE_TYPE: u8 = message_type::HUB_PROPERTIES;

    fn payload(&self) -> Vec<u8> {
        let mut payload = vec![self.property, self.operation];
        payload.extend_from_slice(&self.data);
        payload
    }
}

/// HUB_ACTIONS command (0x02)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubAction {
    pub action: u8,
}

impl HubCommand for HubAction {
    const MESSAGE_TYPE: u8 = message_type::HUB_ACTIONS;

    fn payload(&self) -> Vec<u8> {
        vec![self.action]
    }
}

/// PORT_INPUT_FORMAT_SETUP_SINGLE command (0x41)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortInputFormatSetup {
    pub port: Port,
    pub mode: u8,
    /// Minimum value change that triggers a notification
    pub delta: u32,
    pub notify: bool,
}

impl HubCommand for PortInputFormatSetup {
    const MESSAGE_TYPE: u8 = message_type::PORT_INPUT_FORMAT_SETUP_SINGLE;

    fn payload(&self) -> Vec<u8> {
        let mut payload = vec![self.port.code(), self.mode];
        payload.extend_from_slice(&self.delta.to_le_bytes());
        payload.push(u8::from(self.notify));
        payload
    }
}

/// PORT_OUTPUT_COMMAND with WriteDirectModeData (0x81 / 0x51)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteDirectModeData {
    pub port: Port,
    pub mode: u8,
    pub(crate) data: Vec<u8>,
}

impl HubCommand for WriteDirectModeData {
    const MESSAGE_TYPE: u8 = message_type::PORT_OUTPUT_COMMAND;

    fn payload(&self) -> Vec<u8> {
        let mut payload = vec![
            self.port.code(),
            output::STARTUP_AND_COMPLETION,
            output::WRITE_DIRECT_MODE_DATA,
            self.mode,
        ];
        payload.extend_from_slice(&self.data);
        payload
    }
}

/// PORT_OUTPUT_COMMAND StartSpeedForTime (0x81 / 0x09)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartSpeedForTime {
    pub port: Port,
    pub time_ms: i16,
    pub speed: i8,
}

impl HubCommand for StartSpeedForTime {
    const MESSAGE_TYPE: u8 = message_type::PORT_OUTPUT_COMMAND;

    fn payload(&self) -> Vec<u8> {
        let time = i16_to_bytes(self.time_ms);
        vec![
            self.port.code(),
            output::STARTUP_AND_COMPLETION,
            output::START_SPEED_FOR_TIME,
            time[0],
            time[1],
            self.speed as u8,
            output::MAX_POWER,
            output::END_STATE_BRAKE,
            output::USE_PROFILES,
        ]
    }
}

/// PORT_OUTPUT_COMMAND StartSpeedForDegrees (0x81 / 0x0B)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartSpeedForDegrees {
    pub port: Port,
    pub degrees: i32,
    pub speed: i8,
}

impl HubCommand for StartSpeedForDegrees {
    const MESSAGE_TYPE: u8 = message_type::PORT_OUTPUT_COMMAND;

    fn payload(&self) -> Vec<u8> {
        let mut payload = vec![
            self.port.code(),
            output::STARTUP_AND_COMPLETION,
            output::START_SPEED_FOR_DEGREES,
        ];
        payload.extend_from_slice(&i32_to_bytes(self.degrees));
        payload.extend_from_slice(&[
            self.speed as u8,
            output::MAX_POWER,
            output::END_STATE_BRAKE,
            output::USE_PROFILES,
        ]);
        payload
    }
}

// =============================================================================
// Hub-level commands
// =============================================================================

/// Set the advertising name (1-14 ASCII characters)
pub fn set_hub_name(name: &str) -> Result<Vec<u8>, HubError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(HubError::InvalidArgument(format!(
            "Hub name must be 1-{} characters, got {}",
            MAX_NAME_LEN,
            name.len()
        )));
    }
    if !name.is_ascii() {
        return Err(HubError::InvalidArgument(
            "Hub name must be ASCII".into(),
        ));
    }
    Ok(HubProperty {
        property: hub_property::ADVERTISING_NAME,
        operation: property_op::SET,
        data: name.as_bytes().to_vec(),
    }
    .build())
}

/// Switch the hub off
pub fn shut_down() -> Vec<u8> {
    HubAction {
        action: hub_action::SWITCH_OFF,
    }
    .build()
}

/// Enable hub button notifications
pub fn activate_button_reports() -> Vec<u8> {
    HubProperty::enable_updates(hub_property::BUTTON).build()
}

/// Frames sent right after connecting: property updates plus the internal
/// voltage and current sensors
pub fn hub_update_subscription() -> Vec<Vec<u8>> {
    vec![
        HubProperty::enable_updates(hub_property::BATTERY_LEVEL).build(),
        HubProperty::enable_updates(hub_property::RSSI).build(),
        HubProperty::request_update(hub_property::FW_VERSION).build(),
        HubProperty::request_update(hub_property::HW_VERSION).build(),
        activate_port(Port::VOLTAGE, 0),
        activate_port(Port::CURRENT, 0),
    ]
}

// =============================================================================
// LED
// =============================================================================

/// Set the hub LED to an indexed color (mode switch + color write)
pub fn led_color(port: Port, color: Color) -> Result<Vec<Vec<u8>>, HubError> {
    if color == Color::None {
        return Err(HubError::InvalidArgument(
            "Color 'none' cannot be shown on the LED".into(),
        ));
    }
    Ok(vec![
        led_mode(port, LED_MODE_COLOR),
        WriteDirectModeData {
            port,
            mode: LED_MODE_COLOR,
            data: vec![color.code()],
        }
        .build(),
    ])
}

/// Set the hub LED to an RGB value (mode switch + color write)
pub fn led_rgb(port: Port, rgb: Rgb) -> Vec<Vec<u8>> {
    vec![
        led_mode(port, LED_MODE_RGB),
        WriteDirectModeData {
            port,
            mode: LED_MODE_RGB,
            data: vec![rgb.r, rgb.g, rgb.b],
        }
        .build(),
    ]
}

/// Set the hub LED from HSV; hue in `[0, 360)`, saturation and value in `[0, 1]`
pub fn led_hsv(port: Port, hue: f64, saturation: f64, value: f64) -> Result<Vec<Vec<u8>>, HubError> {
    if !hue.is_finite() || !(0.0..360.0).contains(&hue) {
        return Err(HubError::InvalidArgument(format!(
            "Hue must be in [0, 360), got {}",
            hue
        )));
    }
    for (label, v) in [("Saturation", saturation), ("Value", value)] {
        if !v.is_finite() || !(0.0..=1.0).contains(&v) {
            return Err(HubError::InvalidArgument(format!(
                "{} must be in [0, 1], got {}",
                label, v
            )));
        }
    }
    Ok(led_rgb(port, Rgb::from_hsv(hue, saturation, value)))
}

fn led_mode(port: Port, mode: u8) -> Vec<u8> {
    PortInputFormatSetup {
        port,
        mode,
        delta: 0,
        notify: false,
    }
    .build()
}

// =============================================================================
// Motors
// =============================================================================

/// Map a user speed onto the hub's signed power byte
///
/// Saturates at +/-100; 127 is reserved by the hub for braking.
pub fn map_speed(speed: i32) -> i8 {
    speed.clamp(-MAX_SPEED, MAX_SPEED) as i8
}

/// Run a motor at constant power
pub fn motor_speed(port: Port, speed: i32) -> Vec<u8> {
    WriteDirectModeData {
        port,
        mode: MOTOR_MODE_POWER,
        data: vec![map_speed(speed) as u8],
    }
    .build()
}

/// Stop a motor (float)
pub fn motor_stop(port: Port) -> Vec<u8> {
    motor_speed(port, 0)
}

/// Run a tacho motor for a fixed time, then brake
pub fn motor_speed_for_time(port: Port, speed: i32, time_ms: i16) -> Result<Vec<u8>, HubError> {
    if time_ms <= 0 {
        return Err(HubError::InvalidArgument(format!(
            "Time must be positive, got {} ms",
            time_ms
        )));
    }
    Ok(StartSpeedForTime {
        port,
        time_ms,
        speed: map_speed(speed),
    }
    .build())
}

/// Run a tacho motor for a number of degrees, then brake
pub fn motor_speed_for_degrees(port: Port, speed: i32, degrees: i32) -> Result<Vec<u8>, HubError> {
    if degrees <= 0 {
        return Err(HubError::InvalidArgument(format!(
            "Degrees must be positive, got {}",
            degrees
        )));
    }
    Ok(StartSpeedForDegrees {
        port,
        degrees,
        speed: map_speed(speed),
    }
    .build())
}

// =============================================================================
// Port reporting
// =============================================================================

/// Ask the hub to report values for `port` in `mode`
pub fn activate_port(port: Port, mode: u8) -> Vec<u8> {
    PortInputFormatSetup {
        port,
        mode,
        delta: 1,
        notify: true,
    }
    .build()
}

/// Stop value reports for `port`
pub fn deactivate_port(port: Port, mode: u8) -> Vec<u8> {
    PortInputFormatSetup {
        port,
        mode,
        delta: 1,
        notify: false,
    }
    .build()
}
