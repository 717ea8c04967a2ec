use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{MonitorConfig, DEFAULT_CONFIG_FILE, DEFAULT_HISTORY_FILE, DEVICE_TIMEOUT, SWEEP_INTERVAL};
use crate::dashboard::OutputMode;

/// Passive ARP listener: shows which hosts are on the local segment
#[derive(Debug, Parser)]
#[command(name = "lytter", version, about)]
pub struct Cli {
    /// Capture interface (defaults to the first non-loopback device)
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Whitelist file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Device history file
    #[arg(long, default_value = DEFAULT_HISTORY_FILE)]
    pub history: PathBuf,

    /// Seconds without a sighting before a device counts as disconnected
    #[arg(long, default_value_t = DEVICE_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Print one JSON snapshot per sweep instead of the table
    #[arg(long)]
    pub json: bool,

    /// Write diagnostics here instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            config_path: self.config.clone(),
            history_path: self.history.clone(),
            timeout: Duration::from_secs(self.timeout),
            sweep_interval: SWEEP_INTERVAL,
        }
    }

    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::JsonLines
        } else {
            OutputMode::Table
        }
    }
}
