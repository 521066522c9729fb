// lpf2ctl - command-line client for LPF2 Bluetooth hubs
// Shared library: configuration and hub session setup

pub mod config;
pub mod session;

pub use config::DriverConfig;
pub use session::{open_hub, printer_config};
