//! lpf2ctl - LPF2 hub client CLI
//!
//! Connects to Boost / Powered Up / Control+ hubs over Bluetooth and
//! drives LEDs and motors or prints what the hub reports.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lpf2_driver::DriverConfig;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;
use commands::set::LedValue;

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = DriverConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(cli.address, cli.monitor, cli.filter);

    match cli.command {
        // Default: show hub info
        None => commands::query::info(&config, false).await?,

        Some(Commands::Scan) => commands::query::scan(&config).await?,
        Some(Commands::Info { json }) => commands::query::info(&config, json).await?,
        Some(Commands::Watch { ports, button }) => {
            commands::watch::watch(&config, ports, button).await?
        }
        Some(Commands::Led { color, rgb, hsv }) => {
            let value = LedValue::from_args(color, rgb, hsv)?;
            commands::set::led(&config, value).await?
        }
        Some(Commands::Motor {
            port,
            speed,
            time,
            degrees,
        }) => commands::set::motor(&config, port, speed, time, degrees).await?,
        Some(Commands::Name { name }) => commands::set::name(&config, &name).await?,
        Some(Commands::Shutdown) => commands::set::shutdown(&config).await?,
    }

    Ok(())
}
