//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "loadnode", version, about = "Load-cell force node")]
pub struct Cli {
    /// Path to config TOML; a missing file means built-in defaults
    #[arg(long, value_name = "FILE", default_value = "etc/loadnode.toml")]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Which serial link carries commands and frames.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum LinkKind {
    /// Commands on stdin, frames on stdout
    #[default]
    Stdio,
    /// Primary UART (needs the `hardware` feature)
    Uart,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the sensing loop until Ctrl-C or --cycles
    Run {
        /// Stop after this many cycles
        #[arg(long, value_name = "N")]
        cycles: Option<u64>,
        /// Serial link to use
        #[arg(long, value_enum, default_value_t = LinkKind::Stdio)]
        link: LinkKind,
        /// Enable real-time mode (SCHED_FIFO, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on supported OSes.\n\nLinux: requests SCHED_FIFO and locks current and future pages with mlockall. Needs CAP_SYS_NICE / CAP_IPC_LOCK (or root); failures are logged and the loop runs anyway.\n\nmacOS: only mlockall is attempted."
        )]
        rt: bool,
        /// SCHED_FIFO priority for --rt (Linux; clamped to the system range)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
    },
    /// Decode node frames read from stdin
    Decode,
    /// Fit a conversion factor from a reference CSV (reading,load)
    Fit {
        /// CSV with headers `reading,load`
        #[arg(long, value_name = "FILE")]
        csv: PathBuf,
        /// Factor the node was running with when the readings were taken
        #[arg(long, value_name = "F", allow_negative_numbers = true)]
        current_factor: f32,
    },
    /// Conversion factor from an unloaded and a loaded reading
    TwoPoint {
        /// Reading with nothing on the cell
        #[arg(long, value_name = "READING", allow_negative_numbers = true)]
        zero: f32,
        /// Reading with the reference load on the cell
        #[arg(long, value_name = "READING", allow_negative_numbers = true)]
        loaded: f32,
        /// The reference load, in force units
        #[arg(long, value_name = "LOAD", allow_negative_numbers = true)]
        known: f32,
        /// Factor the node was running with when the readings were taken
        #[arg(long, value_name = "F", allow_negative_numbers = true)]
        current_factor: f32,
    },
}
