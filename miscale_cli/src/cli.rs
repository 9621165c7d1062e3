//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(
    name = "miscale",
    version,
    about = "Decode and stabilize Mi Body Composition Scale 2 measurements"
)]
pub struct Cli {
    /// Path to config TOML (typed); built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results and logs as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Firmware layout override on the command line.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ProfileArg {
    Auto,
    Mi2,
    Centigram,
}

/// Byte layout the simulator encodes with.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LayoutArg {
    Mi2,
    Centigram,
}

/// Options shared by every command that drives a weighing session.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Body height in cm for BMI; overrides [user].height_cm
    #[arg(long, value_name = "CM")]
    pub height: Option<f32>,

    /// Force a firmware profile instead of [decoder].profile
    #[arg(long, value_enum, value_name = "PROFILE")]
    pub profile: Option<ProfileArg>,

    /// Previous weight in kg, used as the trend baseline
    #[arg(long = "previous-kg", value_name = "KG")]
    pub previous_kg: Option<f32>,

    /// Read notifications on a background listener thread
    #[arg(long, action = ArgAction::SetTrue)]
    pub threaded: bool,

    /// Pace frames in wall-clock time instead of replaying instantly
    #[arg(long, action = ArgAction::SetTrue)]
    pub realtime: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a recorded capture CSV (t_ms,characteristic,payload) through a session
    Replay {
        /// Capture CSV file
        #[arg(value_name = "CAPTURE")]
        capture: PathBuf,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Weigh on a simulated scale
    Simulate {
        /// Weight the simulated user settles at
        #[arg(long, value_name = "KG", default_value_t = 70.0)]
        weight: f32,
        /// Impedance reported once settled
        #[arg(long, value_name = "OHMS", default_value_t = 500)]
        impedance: u16,
        /// Report no impedance (composition unavailable)
        #[arg(long = "no-impedance", action = ArgAction::SetTrue)]
        no_impedance: bool,
        /// Frame layout to encode
        #[arg(long, value_enum, default_value = "mi2")]
        layout: LayoutArg,
        /// Report weights in pounds
        #[arg(long, action = ArgAction::SetTrue)]
        pounds: bool,
        /// Mirror each settled frame on a second characteristic after this many ms
        #[arg(long = "mirror-ms", value_name = "MS")]
        mirror_ms: Option<u64>,
        /// Stop after the ramp; the session runs into its timeout
        #[arg(long = "no-settle", action = ArgAction::SetTrue)]
        no_settle: bool,
        /// Noise amplitude in kg while settling
        #[arg(long, value_name = "KG")]
        noise: Option<f32>,
        /// Noise seed
        #[arg(long, value_name = "N")]
        seed: Option<u32>,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Decode a single notification payload given as hex
    Decode {
        /// Payload bytes, e.g. 22b036000000000000f401
        #[arg(value_name = "HEX")]
        payload: String,
        /// Characteristic id, full UUID or 16-bit short form
        #[arg(long, value_name = "ID", default_value = "2a9c")]
        characteristic: String,
        /// Decode under this profile only; all profiles when omitted
        #[arg(long, value_enum, value_name = "PROFILE")]
        profile: Option<ProfileArg>,
    },
    /// Validate the config and run one simulated weighing end to end
    SelfCheck,
}
