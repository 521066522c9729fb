//! Per-connection hub state and application of decoded messages

use tracing::{debug, warn};

use crate::decoder::{sensor_parser, HubMessage, HubPropertyUpdate, SensorReading};
use crate::error::DecodeWarning;
use crate::properties::PropertyStore;
use crate::registry::PortRegistry;
use crate::types::{Device, DeviceType, HubType, Port};

/// Something the hub reported, published on the event channel
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    Connected {
        hub_type: HubType,
    },
    Disconnected,
    DeviceAttached(Device),
    DeviceDetached {
        port: Port,
        device_type: Option<DeviceType>,
    },
    Property(HubPropertyUpdate),
    SensorValue {
        port: Port,
        reading: SensorReading,
    },
    PortFormatAck {
        port: Port,
        mode: u8,
        notify: bool,
    },
    PortFeedback {
        port: Port,
        feedback: u8,
    },
    HubError {
        command: u8,
        code: u8,
    },
    DecodeWarning(DecodeWarning),
}

/// Registry and property store of one connection
#[derive(Debug, Default)]
pub struct HubState {
    pub hub_type: HubType,
    pub registry: PortRegistry,
    pub properties: PropertyStore,
}

impl HubState {
    /// Forget everything from the previous connection
    pub(crate) fn reset(&mut self, hub_type: HubType) {
        self.hub_type = hub_type;
        self.registry.clear();
        self.properties.reset();
    }

    /// Apply one decoded message
    ///
    /// Either every affected field is updated or, on a warning, nothing is.
    pub(crate) fn apply(&mut self, message: HubMessage) -> Result<HubEvent, DecodeWarning> {
        match message {
            HubMessage::Property(update) => {
                self.apply_property(update);
                Ok(HubEvent::Property(update))
            }
            HubMessage::Attached {
                port,
                device_type,
                virtual_port,
            } => {
                debug!(%port, %device_type, virtual_port, "Device attached");
                self.registry.register(port, device_type);
                Ok(HubEvent::DeviceAttached(Device::new(port, device_type)))
            }
            HubMessage::Detached { port } => {
                let device_type = self.registry.deregister(port);
                debug!(%port, ?device_type, "Device detached");
                Ok(HubEvent::DeviceDetached { port, device_type })
            }
            HubMessage::PortValue { port, frame } => {
                let reading = self.parse_port_value(port, &frame)?;
                self.apply_reading(port, reading)?;
                Ok(HubEvent::SensorValue { port, reading })
            }
            HubMessage::InputFormatAck { port, mode, notify } => {
                Ok(HubEvent::PortFormatAck { port, mode, notify })
            }
            HubMessage::OutputFeedback { port, feedback } => {
                Ok(HubEvent::PortFeedback { port, feedback })
            }
            HubMessage::Error { command, code } => {
                warn!(
                    command = format_args!("0x{:02X}", command),
                    code = format_args!("0x{:02X}", code),
                    "Hub rejected command"
                );
                Ok(HubEvent::HubError { command, code })
            }
        }
    }

    fn apply_property(&mut self, update: HubPropertyUpdate) {
        let values = self.properties.values_mut();
        match update {
            HubPropertyUpdate::Button(pressed) => values.hub_button = Some(pressed),
            HubPropertyUpdate::FirmwareVersion(v) => values.firmware_version = Some(v),
            HubPropertyUpdate::HardwareVersion(v) => values.hardware_version = Some(v),
            HubPropertyUpdate::Rssi(rssi) => values.rssi = Some(rssi),
            HubPropertyUpdate::BatteryLevel(level) => values.battery_level = Some(level),
        }
    }

    fn parse_port_value(&self, port: Port, frame: &[u8]) -> Result<SensorReading, DecodeWarning> {
        let device_type = self
            .registry
            .reporting_type(port)
            .ok_or(DecodeWarning::UnknownPort(port.code()))?;
        if self.registry.activation(port).is_none() {
            return Err(DecodeWarning::PortNotActive(port.code()));
        }
        let parse = sensor_parser(device_type).ok_or(DecodeWarning::NoParser(device_type))?;
        parse(frame)
    }

    fn apply_reading(&mut self, port: Port, reading: SensorReading) -> Result<(), DecodeWarning> {
        let values = self.properties.values_mut();
        match reading {
            SensorReading::DistanceColor { color, distance_cm } => {
                values.color = Some(color);
                values.distance = Some(distance_cm);
            }
            SensorReading::TachoRotation(rotation) => values.tacho_motor_rotation = Some(rotation),
            SensorReading::HubMotorRotation(rotation) => values.hub_motor_rotation = Some(rotation),
            SensorReading::Tilt(tilt) => values.tilt = Some(tilt),
            SensorReading::RemoteButton(buttons) => match port {
                Port::REMOTE_LEFT => values.left_remote = Some(buttons),
                Port::REMOTE_RIGHT => values.right_remote = Some(buttons),
                other => return Err(DecodeWarning::UnknownPort(other.code())),
            },
            SensorReading::Voltage(volts) => values.voltage = Some(volts),
            SensorReading::Current(milliamps) => values.current = Some(milliamps),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::decoder::decode;
    use crate::properties::{RemoteButtons, Tilt};

    fn feed(state: &mut HubState, frame: &[u8]) -> Result<HubEvent, DecodeWarning> {
        decode(frame).and_then(|message| state.apply(message))
    }

    fn activated(port: Port, device_type: DeviceType) -> HubState {
        let mut state = HubState::default();
        state.registry.register(port, device_type);
        state
            .registry
            .record_activation(port, device_type, device_type.mode());
        state
    }

    #[test]
    fn test_battery_frame() {
        let mut state = HubState::default();
        feed(&mut state, &[0x06, 0x00, 0x01, 0x06, 0x06, 0x57]).unwrap();
        assert_eq!(state.properties.battery_level(), Some(87));
    }

    #[test]
    fn test_attach_then_detach() {
        let mut state = HubState::default();
        let event = feed(&mut state, &[0x07, 0x00, 0x04, 0x37, 0x01, 0x26, 0x00]).unwrap();
        assert_eq!(
            event,
            HubEvent::DeviceAttached(Device::new(Port::A, DeviceType::BoostTachoMotor))
        );
        assert_eq!(
            state.registry.device_type_at(Port::A),
            Some(DeviceType::BoostTachoMotor)
        );

        let event = feed(&mut state, &[0x05, 0x00, 0x04, 0x37, 0x00]).unwrap();
        assert_eq!(
            event,
            HubEvent::DeviceDetached {
                port: Port::A,
                device_type: Some(DeviceType::BoostTachoMotor),
            }
        );
        assert_eq!(state.registry.device_type_at(Port::A), None);
    }

    #[test]
    fn test_basic_motor_attach_then_detach() {
        let mut state = HubState::default();
        feed(&mut state, &[0x07, 0x00, 0x04, 0x37, 0x01, 0x01, 0x00]).unwrap();
        assert_eq!(
            state.registry.device_type_at(Port::A),
            Some(DeviceType::BasicMotor)
        );

        let event = feed(&mut state, &[0x05, 0x00, 0x04, 0x37, 0x00]).unwrap();
        assert_eq!(
            event,
            HubEvent::DeviceDetached {
                port: Port::A,
                device_type: Some(DeviceType::BasicMotor),
            }
        );
        assert_eq!(state.registry.device_type_at(Port::A), None);
        assert!(state.registry.devices().is_empty());
    }

    #[test]
    fn test_values_parsed_as_activated_type() {
        let mut state = HubState::default();
        state.registry.register(Port::A, DeviceType::BasicMotor);
        state.registry.record_activation(
            Port::A,
            DeviceType::BoostTachoMotor,
            DeviceType::BoostTachoMotor.mode(),
        );

        feed(&mut state, &[0x08, 0x00, 0x45, 0x37, 0x5A, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(state.properties.tacho_motor_rotation(), Some(90));
    }

    #[test]
    fn test_unknown_color_is_none() {
        let mut state = activated(Port::C, DeviceType::BoostDistance);
        feed(&mut state, &[0x08, 0x00, 0x45, 0x01, 0xFF, 0x04, 0x00, 0x00]).unwrap();
        assert_eq!(state.properties.color(), Some(Color::None));
        // floor(101.6) - 20 = 81 mm
        assert_eq!(state.properties.distance(), Some(8.1));

        feed(&mut state, &[0x08, 0x00, 0x45, 0x01, 0x2A, 0x04, 0x00, 0x00]).unwrap();
        assert_eq!(state.properties.color(), Some(Color::None));
    }

    #[test]
    fn test_short_frame_leaves_store_unchanged() {
        let mut state = activated(Port::C, DeviceType::BoostDistance);
        feed(&mut state, &[0x08, 0x00, 0x45, 0x01, 0x03, 0x04, 0x00, 0x00]).unwrap();
        let before = state.properties.snapshot();

        let result = feed(&mut state, &[0x07, 0x00, 0x45, 0x01, 0x09, 0x02, 0x00]);
        assert!(matches!(result, Err(DecodeWarning::TooShort { .. })));
        assert_eq!(state.properties.snapshot(), before);
    }

    #[test]
    fn test_value_from_inactive_port_is_dropped() {
        let mut state = HubState::default();
        state.registry.register(Port::TILT, DeviceType::BoostTilt);
        let result = feed(&mut state, &[0x06, 0x00, 0x45, 0x3A, 0x05, 0x05]);
        assert_eq!(result, Err(DecodeWarning::PortNotActive(0x3A)));
        assert_eq!(state.properties.tilt(), None);

        let result = feed(&mut state, &[0x06, 0x00, 0x45, 0x02, 0x05, 0x05]);
        assert_eq!(result, Err(DecodeWarning::UnknownPort(0x02)));
    }

    #[test]
    fn test_value_without_parser() {
        let mut state = activated(Port::A, DeviceType::TrainMotor);
        let result = feed(&mut state, &[0x05, 0x00, 0x45, 0x37, 0x00]);
        assert_eq!(result, Err(DecodeWarning::NoParser(DeviceType::TrainMotor)));
    }

    #[test]
    fn test_tilt_replaced_as_unit() {
        let mut state = activated(Port::TILT, DeviceType::BoostTilt);
        feed(&mut state, &[0x06, 0x00, 0x45, 0x3A, 0x0A, 0xF6]).unwrap();
        assert_eq!(state.properties.tilt(), Some(Tilt { x: 10, y: -10 }));
    }

    #[test]
    fn test_remote_sides_are_isolated() {
        let mut state = activated(Port::REMOTE_LEFT, DeviceType::PoweredUpRemoteButton);
        state
            .registry
            .register(Port::REMOTE_RIGHT, DeviceType::PoweredUpRemoteButton);
        state
            .registry
            .record_activation(Port::REMOTE_RIGHT, DeviceType::PoweredUpRemoteButton, 0);

        feed(&mut state, &[0x05, 0x00, 0x45, 0x00, 0x01]).unwrap();
        let left = state.properties.left_remote().unwrap();
        assert!(left.up && !left.down && !left.stop && !left.released);
        assert_eq!(state.properties.right_remote(), None);

        feed(&mut state, &[0x05, 0x00, 0x45, 0x01, 0x7F]).unwrap();
        assert_eq!(state.properties.left_remote(), Some(left));
        assert_eq!(
            state.properties.right_remote(),
            Some(RemoteButtons {
                stop: true,
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_voltage_via_activation_only() {
        let mut state = HubState::default();
        state
            .registry
            .record_activation(Port::VOLTAGE, DeviceType::Voltage, 0);
        feed(&mut state, &[0x06, 0x00, 0x45, 0x3C, 0x35, 0x0F]).unwrap();
        let volts = state.properties.voltage().unwrap();
        assert!((volts - 9.6).abs() < 1e-9);
    }

    #[test]
    fn test_hub_error_event() {
        let mut state = HubState::default();
        let event = feed(&mut state, &[0x05, 0x00, 0x05, 0x81, 0x06]).unwrap();
        assert_eq!(
            event,
            HubEvent::HubError {
                command: 0x81,
                code: 0x06
            }
        );
    }

    #[test]
    fn test_reset() {
        let mut state = activated(Port::A, DeviceType::BoostTachoMotor);
        feed(&mut state, &[0x06, 0x00, 0x01, 0x06, 0x06, 0x57]).unwrap();
        state.reset(HubType::PoweredUpHub);
        assert_eq!(state.hub_type, HubType::PoweredUpHub);
        assert!(state.registry.devices().is_empty());
        assert_eq!(state.properties.battery_level(), None);
    }
}
