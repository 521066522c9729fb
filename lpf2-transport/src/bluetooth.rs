//! Bluetooth GATT transport
//!
//! Talks to hubs through the platform BLE stack via `btleplug` (BlueZ on
//! Linux, CoreBluetooth on macOS, WinRT on Windows).
//!
//! Hubs advertise the LPF2 service and LEGO manufacturer data; the system
//! type byte in that data identifies the hub model. Commands are written
//! without response and notifications arrive on the same characteristic.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::TransportError;
use crate::protocol::{system_type_from_manufacturer_data, CHARACTERISTIC_UUID, LEGO_COMPANY_ID};
use crate::types::{TransportDeviceInfo, TransportType};
use crate::{Connection, Connector, NOTIFICATION_CHANNEL_CAPACITY};

/// How long to scan before giving up
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// How often the peripheral list is polled while scanning
const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Connector backed by the first Bluetooth adapter of the host
pub struct BleConnector {
    adapter: Adapter,
    scan_timeout: Duration,
}

impl BleConnector {
    /// Open the first available Bluetooth adapter
    pub async fn new() -> Result<Self, TransportError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::Bluetooth("No Bluetooth adapter found".into()))?;

        Ok(Self {
            adapter,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        })
    }

    /// Override the scan timeout
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Scan for the full timeout and list every hub advertising `service`
    pub async fn scan(&self, service: Uuid) -> Result<Vec<TransportDeviceInfo>, TransportError> {
        self.adapter
            .start_scan(ScanFilter {
                services: vec![service],
            })
            .await?;
        tokio::time::sleep(self.scan_timeout).await;
        self.adapter.stop_scan().await?;

        let mut hubs = Vec::new();
        for peripheral in self.adapter.peripherals().await? {
            if let Some(info) = hub_info(&peripheral, service).await? {
                hubs.push(info);
            }
        }
        Ok(hubs)
    }

    async fn find_peripheral(
        &self,
        service: Uuid,
        address: Option<&str>,
    ) -> Result<(Peripheral, TransportDeviceInfo), TransportError> {
        self.adapter
            .start_scan(ScanFilter {
                services: vec![service],
            })
            .await?;

        let deadline = Instant::now() + self.scan_timeout;
        loop {
            for peripheral in self.adapter.peripherals().await? {
                let Some(info) = hub_info(&peripheral, service).await? else {
                    continue;
                };
                let wanted = address.map_or(true, |a| a.eq_ignore_ascii_case(&info.address));
                if wanted {
                    if let Err(e) = self.adapter.stop_scan().await {
                        warn!("Failed to stop scan: {}", e);
                    }
                    return Ok((peripheral, info));
                }
            }

            if Instant::now() >= deadline {
                if let Err(e) = self.adapter.stop_scan().await {
                    warn!("Failed to stop scan: {}", e);
                }
                return Err(TransportError::DeviceNotFound(
                    address.unwrap_or("any LPF2 hub").to_string(),
                ));
            }
            tokio::time::sleep(SCAN_POLL_INTERVAL).await;
        }
    }
}

/// Build device info for a peripheral if it looks like an LPF2 hub
async fn hub_info(
    peripheral: &Peripheral,
    service: Uuid,
) -> Result<Option<TransportDeviceInfo>, TransportError> {
    let Some(props) = peripheral.properties().await? else {
        return Ok(None);
    };

    let lego_data = props.manufacturer_data.get(&LEGO_COMPANY_ID);
    if !props.services.contains(&service) && lego_data.is_none() {
        return Ok(None);
    }

    let manufacturer_id = lego_data
        .and_then(|data| system_type_from_manufacturer_data(data))
        .unwrap_or(0);

    Ok(Some(TransportDeviceInfo {
        address: props.address.to_string(),
        name: props.local_name,
        manufacturer_id,
        rssi: props.rssi,
        transport_type: TransportType::Bluetooth,
    }))
}

#[async_trait]
impl Connector for BleConnector {
    async fn scan_and_connect(
        &self,
        service: Uuid,
        address: Option<&str>,
    ) -> Result<Arc<dyn Connection>, TransportError> {
        let (peripheral, info) = self.find_peripheral(service, address).await?;
        info!(
            "Connecting to {} ({}) system type 0x{:02X}",
            info.label(),
            info.address,
            info.manufacturer_id
        );

        peripheral.connect().await?;
        peripheral.discover_services().await?;

        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == CHARACTERISTIC_UUID)
            .ok_or_else(|| TransportError::CharacteristicNotFound(CHARACTERISTIC_UUID.to_string()))?;

        Ok(Arc::new(BleConnection {
            peripheral,
            characteristic,
            info,
        }))
    }
}

/// Open GATT connection to one hub
pub struct BleConnection {
    peripheral: Peripheral,
    characteristic: Characteristic,
    info: TransportDeviceInfo,
}

#[async_trait]
impl Connection for BleConnection {
    async fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
        self.peripheral
            .write(&self.characteristic, frame, WriteType::WithoutResponse)
            .await
            .map_err(|e| TransportError::WriteFailed(e.to_string()))
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<Vec<u8>>, TransportError> {
        self.peripheral.subscribe(&self.characteristic).await?;
        let mut stream = self.peripheral.notifications().await?;
        let (tx, rx) = mpsc::channel(NOTIFICATION_CHANNEL_CAPACITY);

        let label = self.info.address.clone();
        tokio::spawn(async move {
            debug!("{} notification reader started", label);
            while let Some(notification) = stream.next().await {
                if notification.uuid != CHARACTERISTIC_UUID {
                    continue;
                }
                if tx.send(notification.value).await.is_err() {
                    break;
                }
            }
            debug!("{} notification reader exiting", label);
        });

        Ok(rx)
    }

    fn manufacturer_id(&self) -> u8 {
        self.info.manufacturer_id
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
