//! Command handlers for the CLI application.
//!
//! - `query`: read-only commands (scan, info)
//! - `set`: commands that change hub state (led, motor, name, shutdown)
//! - `watch`: live event stream

pub mod query;
pub mod set;
pub mod watch;

use lpf2_driver::session;
use lpf2_driver::DriverConfig;
use lpf2_hub::Hub;

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Connect, run `f`, then disconnect even when `f` failed
pub async fn with_hub<F, Fut>(config: &DriverConfig, f: F) -> CommandResult
where
    F: FnOnce(Hub) -> Fut,
    Fut: std::future::Future<Output = CommandResult>,
{
    let hub = session::open_hub(config).await?;
    let result = f(hub.clone()).await;
    if let Err(e) = hub.disconnect().await {
        tracing::debug!("Disconnect failed: {}", e);
    }
    result
}
