//! lytter: passive ARP presence tracking
//!
//! - `sniff` captures ARP frames and decodes them into sightings
//! - `tracker` turns sightings into a persisted device registry
//! - `presence` classifies devices active/inactive on a timeout
//! - `monitor` runs the ingestion and sweep loops over one shared tracker
//! - `dashboard` draws each sweep's snapshot

pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod event_log;
pub mod history;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod presence;
pub mod sniff;
pub mod tracker;
pub mod whitelist;

pub use config::MonitorConfig;
pub use error::{ConfigError, HistoryError};
pub use event_log::EventLog;
pub use history::{Device, DeviceHistory, HistoryStore, LoadStatus};
pub use models::domain::{ArpOp, Sighting};
pub use models::dto::{DeviceRow, RenderSnapshot};
pub use monitor::Monitor;
pub use presence::{Disconnect, Presence, PresenceTracker};
pub use tracker::{SightingOutcome, Tracker};
pub use whitelist::Whitelist;
