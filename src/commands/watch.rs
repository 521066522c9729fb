//! Live event stream.

use lpf2_driver::DriverConfig;
use lpf2_hub::{Hub, HubEvent, HubPropertyUpdate, Port, SensorReading};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use super::{with_hub, CommandResult};

/// Print hub events until Ctrl-C or until the hub goes away
///
/// Ports in `ports` are activated as soon as the hub announces a device on
/// them (or immediately, if it already has).
pub async fn watch(config: &DriverConfig, ports: Vec<Port>, button: bool) -> CommandResult {
    with_hub(config, |hub| async move {
        let mut events = hub.subscribe_events();

        if button {
            hub.activate_button_reports().await?;
        }
        for device in hub.devices() {
            if ports.contains(&device.port) {
                activate(&hub, device.port).await;
            }
        }

        println!("Watching {} (Ctrl-C to stop)", hub.hub_type());
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                event = events.recv() => match event {
                    Ok(HubEvent::Disconnected) => {
                        println!("Hub disconnected");
                        break;
                    }
                    Ok(event) => {
                        if let HubEvent::DeviceAttached(device) = &event {
                            if ports.contains(&device.port) {
                                activate(&hub, device.port).await;
                            }
                        }
                        println!("{}", describe(&event));
                    }
                    Err(RecvError::Lagged(n)) => warn!("Missed {} events", n),
                    Err(RecvError::Closed) => break,
                },
            }
        }
        Ok::<_, anyhow::Error>(())
    })
    .await
}

async fn activate(hub: &Hub, port: Port) {
    if let Err(e) = hub.activate_port_device(port, None).await {
        warn!("Could not activate port {}: {}", port, e);
    }
}

/// One-line description of an event
pub fn describe(event: &HubEvent) -> String {
    match event {
        HubEvent::Connected { hub_type } => format!("connected to {}", hub_type),
        HubEvent::Disconnected => "disconnected".to_string(),
        HubEvent::DeviceAttached(device) => {
            format!("port {}: {} attached", device.port, device.device_type)
        }
        HubEvent::DeviceDetached { port, device_type } => match device_type {
            Some(device_type) => format!("port {}: {} detached", port, device_type),
            None => format!("port {}: detached", port),
        },
        HubEvent::Property(update) => match update {
            HubPropertyUpdate::Button(true) => "button pressed".to_string(),
            HubPropertyUpdate::Button(false) => "button released".to_string(),
            HubPropertyUpdate::FirmwareVersion(v) => format!("firmware {}", v),
            HubPropertyUpdate::HardwareVersion(v) => format!("hardware {}", v),
            HubPropertyUpdate::Rssi(rssi) => format!("rssi {} dBm", rssi),
            HubPropertyUpdate::BatteryLevel(level) => format!("battery {}%", level),
        },
        HubEvent::SensorValue { port, reading } => {
            let value = match reading {
                SensorReading::DistanceColor { color, distance_cm } => {
                    format!("color {}, distance {:.1} cm", color, distance_cm)
                }
                SensorReading::TachoRotation(deg) | SensorReading::HubMotorRotation(deg) => {
                    format!("rotation {}°", deg)
                }
                SensorReading::Tilt(tilt) => format!("tilt x={} y={}", tilt.x, tilt.y),
                SensorReading::RemoteButton(b) => format!(
                    "remote up={} down={} stop={} released={}",
                    b.up, b.down, b.stop, b.released
                ),
                SensorReading::Voltage(volts) => format!("voltage {:.2} V", volts),
                SensorReading::Current(ma) => format!("current {:.0} mA", ma),
            };
            format!("port {}: {}", port, value)
        }
        HubEvent::PortFormatAck { port, mode, notify } => {
            format!("port {}: mode {} reporting {}", port, mode, if *notify { "on" } else { "off" })
        }
        HubEvent::PortFeedback { port, feedback } => {
            format!("port {}: feedback 0x{:02X}", port, feedback)
        }
        HubEvent::HubError { command, code } => {
            format!("hub error 0x{:02X} for command 0x{:02X}", code, command)
        }
        HubEvent::DecodeWarning(warning) => format!("warning: {}", warning),
    }
}
