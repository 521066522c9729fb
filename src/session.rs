//! Opening a hub session from the driver configuration

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use lpf2_hub::Hub;
use lpf2_transport::{Connector, PacketFilter, PrinterConfig, PrinterConnector};
use tracing::info;

use crate::config::DriverConfig;

/// Monitor settings, or `None` when monitoring is off
pub fn printer_config(config: &DriverConfig) -> anyhow::Result<Option<PrinterConfig>> {
    if !config.monitor {
        return Ok(None);
    }

    let filter = match config.filter.as_deref() {
        Some(f) => PacketFilter::from_str(f).map_err(anyhow::Error::msg)?,
        None => PacketFilter::All,
    };
    Ok(Some(PrinterConfig::default().with_filter(filter)))
}

/// Connector for real hardware
#[cfg(feature = "bluetooth")]
pub async fn hardware_connector(config: &DriverConfig) -> anyhow::Result<Arc<dyn Connector>> {
    let connector = lpf2_transport::BleConnector::new()
        .await
        .context("Failed to open Bluetooth adapter")?
        .with_scan_timeout(config.scan_timeout());
    Ok(Arc::new(connector))
}

#[cfg(not(feature = "bluetooth"))]
pub async fn hardware_connector(_config: &DriverConfig) -> anyhow::Result<Arc<dyn Connector>> {
    anyhow::bail!("lpf2ctl was built without Bluetooth support (enable the `bluetooth` feature)")
}

/// Connect to the configured hub over Bluetooth
pub async fn open_hub(config: &DriverConfig) -> anyhow::Result<Hub> {
    let connector = hardware_connector(config).await?;
    open_hub_with(connector, config).await
}

/// Connect through `connector`, wrapping it with the monitor when enabled
pub async fn open_hub_with(
    connector: Arc<dyn Connector>,
    config: &DriverConfig,
) -> anyhow::Result<Hub> {
    let connector = match printer_config(config)? {
        Some(printer) => PrinterConnector::wrap(connector, printer),
        None => connector,
    };

    let hub = Hub::with_options(connector, config.hub_options());
    tokio::time::timeout(config.connect_timeout(), hub.connect(config.address.as_deref()))
        .await
        .with_context(|| {
            format!(
                "Timed out after {}s connecting to hub",
                config.connect_timeout_secs
            )
        })?
        .context("Failed to connect to hub")?;

    info!("Connected to {}", hub.hub_type());
    Ok(hub)
}
