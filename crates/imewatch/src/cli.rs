//! Command-line interface definitions for imewatch.

use std::path::PathBuf;

use clap::Parser;
use logging::LogArgs;

/// Command-line interface for the `imewatch` binary.
#[derive(Parser, Debug)]
#[command(
    name = "imewatch",
    about = "Log IME on/off and input language changes of the foreground window",
    version
)]
pub struct Cli {
    /// Logging controls shared across our binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// Engine configuration in RON syntax, e.g. `(polling_interval_ms: 50)`.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Reconciliation tick period in milliseconds (overrides the file).
    #[arg(long, value_name = "MS")]
    pub poll_ms: Option<u64>,

    /// Periodic pixel verification period in milliseconds; 0 disables it
    /// (overrides the file).
    #[arg(long, value_name = "MS")]
    pub pixel_ms: Option<u64>,

    /// Also log cursor positions sampled on each tick.
    #[arg(long)]
    pub cursor: bool,
}
