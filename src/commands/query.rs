//! Query (read-only) command handlers.

use std::time::Duration;

use lpf2_driver::DriverConfig;
use lpf2_hub::{Hub, HubEvent, PropertySnapshot};
use serde::Serialize;
use tokio::time::Instant;

use super::{with_hub, CommandResult};

/// How long `info` waits for the hub to answer the version/battery requests
const INFO_SETTLE_TIME: Duration = Duration::from_secs(3);

/// List hubs advertising the LPF2 service
#[cfg(feature = "bluetooth")]
pub async fn scan(config: &DriverConfig) -> CommandResult {
    use lpf2_transport::protocol::{system_type, SERVICE_UUID};

    let connector = lpf2_transport::BleConnector::new()
        .await?
        .with_scan_timeout(config.scan_timeout());
    println!("Scanning for {}s...", config.scan_timeout_secs);
    let hubs = connector.scan(SERVICE_UUID).await?;
    if hubs.is_empty() {
        println!("No hubs found");
    }
    for hub in hubs {
        println!(
            "{}  {:<20} {:<18} rssi={}",
            hub.address,
            hub.name.as_deref().unwrap_or("-"),
            system_type::name(hub.manufacturer_id),
            hub.rssi.map_or("-".to_string(), |r| r.to_string())
        );
    }
    Ok(())
}

#[cfg(not(feature = "bluetooth"))]
pub async fn scan(config: &DriverConfig) -> CommandResult {
    lpf2_driver::session::hardware_connector(config).await?;
    Ok(())
}

#[derive(Serialize)]
struct DeviceRow {
    port: String,
    device: String,
    type_code: u16,
}

#[derive(Serialize)]
struct InfoReport {
    hub_type: String,
    devices: Vec<DeviceRow>,
    properties: PropertySnapshot,
}

/// Show hub identity, reported properties and attached devices
pub async fn info(config: &DriverConfig, json: bool) -> CommandResult {
    with_hub(config, |hub| async move {
        wait_for_identity(&hub).await;

        let report = InfoReport {
            hub_type: hub.hub_type().to_string(),
            devices: hub
                .devices()
                .into_iter()
                .map(|d| DeviceRow {
                    port: d.port.to_string(),
                    device: d.device_type.to_string(),
                    type_code: d.device_type.code(),
                })
                .collect(),
            properties: hub.snapshot(),
        };

        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok::<_, anyhow::Error>(())
    })
    .await
}

/// Wait until versions and battery are known, or the settle time runs out
async fn wait_for_identity(hub: &Hub) {
    let mut events = hub.subscribe_events();
    let deadline = Instant::now() + INFO_SETTLE_TIME;
    loop {
        let snapshot = hub.snapshot();
        if snapshot.firmware_version.is_some()
            && snapshot.hardware_version.is_some()
            && snapshot.battery_level.is_some()
        {
            return;
        }
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Ok(HubEvent::Disconnected)) | Err(_) => return,
            Ok(Ok(_)) => {}
            Ok(Err(tokio::sync::broadcast::error::RecvError::Lagged(_))) => {}
            Ok(Err(tokio::sync::broadcast::error::RecvError::Closed)) => return,
        }
    }
}

fn print_report(report: &InfoReport) {
    fn show<T: std::fmt::Display>(value: Option<T>, unit: &str) -> String {
        value.map_or("unknown".to_string(), |v| format!("{}{}", v, unit))
    }

    let p = &report.properties;
    println!("Hub:       {}", report.hub_type);
    println!("Firmware:  {}", show(p.firmware_version, ""));
    println!("Hardware:  {}", show(p.hardware_version, ""));
    println!("Battery:   {}", show(p.battery_level, "%"));
    println!("Voltage:   {}", show(p.voltage.map(|v| format!("{:.2}", v)), " V"));
    println!("Current:   {}", show(p.current.map(|c| format!("{:.0}", c)), " mA"));
    println!("RSSI:      {}", show(p.rssi, " dBm"));

    if report.devices.is_empty() {
        println!("Devices:   none");
    } else {
        println!("Devices:");
        for d in &report.devices {
            println!("  {}  {} ({})", d.port, d.device, d.type_code);
        }
    }
}
