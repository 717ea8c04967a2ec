//! Tunables for the presence tracker

use std::path::PathBuf;
use std::time::Duration;

/// A device not sighted for this long is no longer active
pub const DEVICE_TIMEOUT: Duration = Duration::from_secs(10);

/// Period of the sweep loop (activity recomputation + redraw)
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Number of entries kept in the on-screen event log
pub const EVENT_LOG_CAPACITY: usize = 5;

/// Default whitelist file, looked up relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Default device history file
pub const DEFAULT_HISTORY_FILE: &str = "device_history.json";

/// pcap read timeout; bounds how long the capture thread takes to notice shutdown
pub const CAPTURE_TIMEOUT_MS: i32 = 500;

/// How long shutdown waits for the capture and ingestion threads before saving anyway
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Runtime settings for one monitoring session
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub config_path: PathBuf,
    pub history_path: PathBuf,
    pub timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            history_path: PathBuf::from(DEFAULT_HISTORY_FILE),
            timeout: DEVICE_TIMEOUT,
            sweep_interval: SWEEP_INTERVAL,
        }
    }
}
