//! `lpf2ctl` configuration
//!
//! Read from a TOML file; every field is optional. Command-line flags
//! override values from the file.
//!
//! ```toml
//! address = "00:16:53:A4:CD:7E"
//! scan_timeout_secs = 10
//! connect_timeout_secs = 15
//! event_capacity = 64
//! monitor = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use lpf2_hub::HubOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Bluetooth address of the hub; first hub found when unset
    pub address: Option<String>,
    pub scan_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Capacity of the hub event channel
    pub event_capacity: usize,
    /// Log every frame on the wire
    pub monitor: bool,
    /// Monitor filter (all, commands, notifications, type=0xNN)
    pub filter: Option<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            address: None,
            scan_timeout_secs: 10,
            connect_timeout_secs: 15,
            event_capacity: lpf2_hub::hub::DEFAULT_EVENT_CAPACITY,
            monitor: false,
            filter: None,
        }
    }
}

impl DriverConfig {
    /// `$XDG_CONFIG_HOME/lpf2ctl/config.toml` (or the platform equivalent)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lpf2ctl")
            .join("config.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Self::parse(&content).with_context(|| format!("Invalid config {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Load an explicitly requested file (must exist), or the default location
    pub fn load_from(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                anyhow::ensure!(path.exists(), "Config file {} not found", path.display());
                Self::load(path)
            }
            None => Self::load(&Self::default_path()),
        }
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply command-line overrides
    pub fn with_overrides(
        mut self,
        address: Option<String>,
        monitor: bool,
        filter: Option<String>,
    ) -> Self {
        if address.is_some() {
            self.address = address;
        }
        if filter.is_some() {
            self.filter = filter;
        }
        self.monitor |= monitor;
        self
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn hub_options(&self) -> HubOptions {
        HubOptions {
            event_capacity: self.event_capacity,
        }
    }
}
