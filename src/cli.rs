// CLI definitions using clap

use clap::{ArgGroup, Parser, Subcommand};
use lpf2_hub::{Color, Port};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lpf2ctl")]
#[command(author, version, about = "Client for LPF2 Bluetooth hubs (Boost, Powered Up, Control+)")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Bluetooth address of the hub (default: first hub found)
    #[arg(long, short, global = true)]
    pub address: Option<String>,

    /// Config file (default: ~/.config/lpf2ctl/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable transport monitoring (prints all commands/notifications)
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Monitor filter (all, commands, notifications, type=0xNN)
    #[arg(long, global = true)]
    pub filter: Option<String>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List hubs in range
    Scan,

    /// Show hub type, versions, battery and attached devices
    #[command(visible_alias = "i")]
    Info {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print events until interrupted
    #[command(visible_alias = "w")]
    Watch {
        /// Ports to activate once a device appears on them (A, B, C, D, TILT, 0x3A, ...)
        #[arg(value_parser = parse_port)]
        ports: Vec<Port>,

        /// Report hub button presses
        #[arg(long)]
        button: bool,
    },

    /// Set the hub LED
    #[command(group(ArgGroup::new("value").required(true).args(["color", "rgb", "hsv"])))]
    Led {
        /// Named color (black, pink, purple, blue, lightblue, cyan, green, yellow, orange, red, white)
        #[arg(long, value_parser = parse_color)]
        color: Option<Color>,

        /// Red, green, blue (0-255 each)
        #[arg(long, num_args = 3, value_names = ["R", "G", "B"])]
        rgb: Option<Vec<u8>>,

        /// Hue (0-360), saturation and value (0-1)
        #[arg(long, num_args = 3, value_names = ["H", "S", "V"], allow_negative_numbers = true)]
        hsv: Option<Vec<f64>>,
    },

    /// Run a motor
    #[command(visible_alias = "m")]
    Motor {
        /// Port the motor is attached to
        #[arg(value_parser = parse_port)]
        port: Port,

        /// Speed in percent (-100 to 100, 0 stops)
        #[arg(allow_negative_numbers = true)]
        speed: i32,

        /// Run for this many milliseconds, then brake
        #[arg(long, conflicts_with = "degrees")]
        time: Option<i16>,

        /// Turn this many degrees, then brake
        #[arg(long)]
        degrees: Option<i32>,
    },

    /// Change the advertised hub name (1-14 ASCII characters)
    Name { name: String },

    /// Switch the hub off
    #[command(visible_alias = "off")]
    Shutdown,
}

fn parse_port(s: &str) -> Result<Port, String> {
    Port::parse(s).ok_or_else(|| format!("Invalid port: {}", s))
}

fn parse_color(s: &str) -> Result<Color, String> {
    s.parse()
}
