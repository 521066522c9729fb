//! LPF2 protocol constants and frame helpers

/// Hub id byte carried in every frame (always 0 for a directly connected hub)
pub const HUB_ID: u8 = 0x00;

/// Length byte, hub id, message type
pub const HEADER_LEN: usize = 3;

/// Frames longer than this would need the two-byte length encoding
pub const MAX_SHORT_FRAME_LEN: usize = 127;

/// Message types (byte 2 of every frame)
pub mod message_type {
    pub const HUB_PROPERTIES: u8 = 0x01;
    pub const HUB_ACTIONS: u8 = 0x02;
    pub const HUB_ATTACHED_IO: u8 = 0x04;
    pub const GENERIC_ERROR: u8 = 0x05;
    pub const PORT_INPUT_FORMAT_SETUP_SINGLE: u8 = 0x41;
    pub const PORT_VALUE_SINGLE: u8 = 0x45;
    pub const PORT_INPUT_FORMAT_SINGLE: u8 = 0x47;
    pub const PORT_OUTPUT_COMMAND: u8 = 0x81;
    pub const PORT_OUTPUT_FEEDBACK: u8 = 0x82;

    /// Get human-readable name for message type byte
    pub fn name(t: u8) -> &'static str {
        match t {
            HUB_PROPERTIES => "HUB_PROPERTIES",
            HUB_ACTIONS => "HUB_ACTIONS",
            HUB_ATTACHED_IO => "HUB_ATTACHED_IO",
            GENERIC_ERROR => "GENERIC_ERROR",
            PORT_INPUT_FORMAT_SETUP_SINGLE => "PORT_INPUT_FORMAT_SETUP_SINGLE",
            PORT_VALUE_SINGLE => "PORT_VALUE_SINGLE",
            PORT_INPUT_FORMAT_SINGLE => "PORT_INPUT_FORMAT_SINGLE",
            PORT_OUTPUT_COMMAND => "PORT_OUTPUT_COMMAND",
            PORT_OUTPUT_FEEDBACK => "PORT_OUTPUT_FEEDBACK",
            _ => "UNKNOWN",
        }
    }
}

/// Hub property references (byte 3 of HUB_PROPERTIES frames)
pub mod hub_property {
    pub const ADVERTISING_NAME: u8 = 0x01;
    pub const BUTTON: u8 = 0x02;
    pub const FW_VERSION: u8 = 0x03;
    pub const HW_VERSION: u8 = 0x04;
    pub const RSSI: u8 = 0x05;
    pub const BATTERY_LEVEL: u8 = 0x06;
}

/// Hub property operations (byte 4 of HUB_PROPERTIES frames)
pub mod property_op {
    pub const SET: u8 = 0x01;
    pub const ENABLE_UPDATES: u8 = 0x02;
    pub const REQUEST_UPDATE: u8 = 0x05;
    /// Upstream only
    pub const UPDATE: u8 = 0x06;
}

/// Hub actions (byte 3 of HUB_ACTIONS frames)
pub mod hub_action {
    pub const SWITCH_OFF: u8 = 0x01;
}

/// Attach events (byte 4 of HUB_ATTACHED_IO frames)
pub mod io_event {
    pub const DETACHED: u8 = 0x00;
    pub const ATTACHED: u8 = 0x01;
    pub const ATTACHED_VIRTUAL: u8 = 0x02;
}

/// Port output sub-commands
pub mod output {
    /// Execute immediately, request command feedback
    pub const STARTUP_AND_COMPLETION: u8 = 0x11;
    pub const START_SPEED_FOR_TIME: u8 = 0x09;
    pub const START_SPEED_FOR_DEGREES: u8 = 0x0B;
    pub const WRITE_DIRECT_MODE_DATA: u8 = 0x51;

    pub const MAX_POWER: u8 = 100;
    pub const END_STATE_BRAKE: u8 = 127;
    /// Use both acceleration and deceleration profiles
    pub const USE_PROFILES: u8 = 0x03;
}

/// Calibration of the hub's internal voltage/current sensors
pub mod calibration {
    pub const VOLTAGE_MAX: f64 = 9.6;
    pub const VOLTAGE_MAX_RAW: f64 = 3893.0;
    pub const CURRENT_MAX: f64 = 2444.0;
    pub const CURRENT_MAX_RAW: f64 = 4095.0;

    /// Raw ADC reading to volts
    pub fn voltage(raw: u16) -> f64 {
        f64::from(raw) * VOLTAGE_MAX / VOLTAGE_MAX_RAW
    }

    /// Raw ADC reading to milliamps
    pub fn current(raw: u16) -> f64 {
        f64::from(raw) * CURRENT_MAX / CURRENT_MAX_RAW
    }
}

/// Build a complete frame: length, hub id, message type, payload
///
/// Callers keep payloads within `MAX_SHORT_FRAME_LEN`; every payload built
/// in this crate has a fixed or validated length.
pub(crate) fn build_frame(message_type: u8, payload: &[u8]) -> Vec<u8> {
    let len = HEADER_LEN + payload.len();
    debug_assert!(len <= MAX_SHORT_FRAME_LEN);
    let mut frame = Vec::with_capacity(len);
    frame.push(len as u8);
    frame.push(HUB_ID);
    frame.push(message_type);
    frame.extend_from_slice(payload);
    frame
}
