//! Command-line argument definitions.

use std::path::PathBuf;

use clap::Parser;

use crate::config;
use crate::logging::{LogLevel, LogSettings};

/// Sniff the RTMP server address and stream key from local traffic.
#[derive(Parser, Debug)]
#[command(name = "streamkey-sniffer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file with `interface` and `display_filter`
    #[arg(short, long, value_name = "FILE", default_value = config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable debug mode (debug logging and interface listing)
    #[arg(long)]
    pub debug: bool,

    /// Log level (TRACE/DEBUG/INFO/WARN/ERROR)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "INFO")]
    pub log_level: String,

    /// Print the available capture interfaces and exit
    #[arg(long = "list-interfaces")]
    pub list_interfaces: bool,

    /// Exit without waiting for Enter
    #[arg(long = "no-pause")]
    pub no_pause: bool,
}

impl Cli {
    pub fn log_settings(&self) -> LogSettings {
        LogSettings::new(LogLevel::parse_lenient(&self.log_level), self.debug)
    }
}
