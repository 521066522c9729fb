//! Setting command handlers.

use anyhow::Context;
use lpf2_driver::DriverConfig;
use lpf2_hub::{Color, Port};

use super::{with_hub, CommandResult};

/// Which LED value the user asked for
pub enum LedValue {
    Named(Color),
    Rgb(u8, u8, u8),
    Hsv(f64, f64, f64),
}

impl LedValue {
    /// Build from the mutually exclusive `--color`, `--rgb` and `--hsv` flags
    pub fn from_args(
        color: Option<Color>,
        rgb: Option<Vec<u8>>,
        hsv: Option<Vec<f64>>,
    ) -> anyhow::Result<Self> {
        match (color, rgb.as_deref(), hsv.as_deref()) {
            (Some(color), None, None) => Ok(Self::Named(color)),
            (None, Some(&[r, g, b]), None) => Ok(Self::Rgb(r, g, b)),
            (None, None, Some(&[h, s, v])) => Ok(Self::Hsv(h, s, v)),
            _ => anyhow::bail!("Specify exactly one of --color, --rgb R G B or --hsv H S V"),
        }
    }
}

pub async fn led(config: &DriverConfig, value: LedValue) -> CommandResult {
    with_hub(config, |hub| async move {
        match value {
            LedValue::Named(color) => hub.set_led_color(color).await?,
            LedValue::Rgb(r, g, b) => hub.set_led_rgb(r, g, b).await?,
            LedValue::Hsv(h, s, v) => hub.set_led_hsv(h, s, v).await?,
        }
        println!("LED set on {}", hub.hub_type().led_port());
        Ok::<_, anyhow::Error>(())
    })
    .await
}

pub async fn motor(
    config: &DriverConfig,
    port: Port,
    speed: i32,
    time_ms: Option<i16>,
    degrees: Option<i32>,
) -> CommandResult {
    with_hub(config, |hub| async move {
        match (time_ms, degrees) {
            (Some(ms), _) => {
                hub.set_motor_speed_for_time(port, speed, ms).await?;
                // The hub brakes on its own; stay connected until it has
                tokio::time::sleep(std::time::Duration::from_millis(ms as u64)).await;
            }
            (None, Some(deg)) => {
                hub.set_motor_speed_for_degrees(port, speed, deg).await?;
            }
            (None, None) if speed == 0 => hub.stop_motor(port).await?,
            (None, None) => hub.set_motor_speed(port, speed).await?,
        }
        println!("Motor on {} at {}%", port, lpf2_hub::command::map_speed(speed));
        Ok::<_, anyhow::Error>(())
    })
    .await
}

pub async fn name(config: &DriverConfig, name: &str) -> CommandResult {
    with_hub(config, |hub| async move {
        hub.set_hub_name(name)
            .await
            .with_context(|| format!("Failed to rename hub to {:?}", name))?;
        println!("Hub renamed to {}", name);
        Ok::<_, anyhow::Error>(())
    })
    .await
}

pub async fn shutdown(config: &DriverConfig) -> CommandResult {
    let hub = lpf2_driver::open_hub(config).await?;
    hub.shut_down_hub().await?;
    // The hub drops the link itself
    println!("Hub switched off");
    Ok(())
}
