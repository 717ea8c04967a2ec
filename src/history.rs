//! Device history store
//!
//! Durable registry of every (IP, MAC) pair ever sighted, kept in
//! first-seen order and written through to a JSON file after every change.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::HistoryError;

/// Local-time timestamp codec used by the history file.
pub mod timestamp {
    use chrono::{Local, NaiveDateTime};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Older records were written with minute precision
    const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M";

    pub fn now() -> NaiveDateTime {
        Local::now().naive_local()
    }

    pub fn format(ts: &NaiveDateTime) -> String {
        ts.format(FORMAT).to_string()
    }

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, MINUTE_FORMAT))
            .ok()
    }

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("unrecognised timestamp '{raw}'")))
    }
}

/// One known host. Identity is the exact (ip, mac) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub ip: String,
    pub mac: String,
    #[serde(with = "timestamp")]
    pub first_seen: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub last_seen: NaiveDateTime,
}

impl Device {
    pub fn new(ip: &str, mac: &str, now: NaiveDateTime) -> Self {
        Self {
            ip: ip.to_string(),
            mac: mac.to_string(),
            first_seen: now,
            last_seen: now,
        }
    }

    pub fn matches(&self, ip: &str, mac: &str) -> bool {
        self.ip == ip && self.mac == mac
    }
}

/// The persisted record: `{ "devices": [...] }`
///
/// Deserializing always rebuilds the index and merges duplicate pairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "StoredHistory")]
pub struct DeviceHistory {
    devices: Vec<Device>,
    /// ip -> positions of every device seen at that ip
    #[serde(skip)]
    index: HashMap<String, Vec<usize>>,
}

#[derive(Deserialize)]
struct StoredHistory {
    devices: Vec<Device>,
}

impl From<StoredHistory> for DeviceHistory {
    fn from(stored: StoredHistory) -> Self {
        let mut history = DeviceHistory {
            devices: stored.devices,
            index: HashMap::new(),
        };
        let merged = history.merge_duplicates();
        if merged > 0 {
            tracing::warn!("[HISTORY] Merged {} duplicate device entries", merged);
        }
        history
    }
}

impl DeviceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a history record, merging any duplicate pairs it contains.
    pub fn from_json(raw: &str) -> Result<Self, HistoryError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String, HistoryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn is_known(&self, ip: &str, mac: &str) -> bool {
        self.position(ip, mac).is_some()
    }

    pub fn get(&self, ip: &str, mac: &str) -> Option<&Device> {
        self.position(ip, mac).map(|i| &self.devices[i])
    }

    /// Append a new device. Returns `None` if the pair is already known.
    pub fn add(&mut self, ip: &str, mac: &str, now: NaiveDateTime) -> Option<&Device> {
        if self.is_known(ip, mac) {
            return None;
        }
        let position = self.devices.len();
        self.devices.push(Device::new(ip, mac, now));
        self.index.entry(ip.to_string()).or_default().push(position);
        self.devices.last()
    }

    /// Refresh `last_seen` for a known pair. `last_seen` never moves backwards.
    ///
    /// Returns `None` if the pair is unknown.
    pub fn touch(&mut self, ip: &str, mac: &str, now: NaiveDateTime) -> Option<&Device> {
        let position = self.position(ip, mac)?;
        let device = &mut self.devices[position];
        if now > device.last_seen {
            device.last_seen = now;
        }
        Some(&*device)
    }

    fn position(&self, ip: &str, mac: &str) -> Option<usize> {
        self.index
            .get(ip)?
            .iter()
            .copied()
            .find(|&i| self.devices[i].mac == mac)
    }

    fn merge_duplicates(&mut self) -> usize {
        let before = self.devices.len();
        let mut merged: Vec<Device> = Vec::with_capacity(before);
        self.index.clear();

        for device in std::mem::take(&mut self.devices) {
            let existing = self.index.get(&device.ip).and_then(|positions| {
                positions
                    .iter()
                    .copied()
                    .find(|&i| merged[i].mac == device.mac)
            });
            match existing {
                Some(i) => {
                    let kept = &mut merged[i];
                    kept.first_seen = kept.first_seen.min(device.first_seen);
                    kept.last_seen = kept.last_seen.max(device.last_seen);
                }
                None => {
                    self.index.entry(device.ip.clone()).or_default().push(merged.len());
                    merged.push(device);
                }
            }
        }

        self.devices = merged;
        before - self.devices.len()
    }
}

/// Result of opening the history file
#[derive(Debug)]
pub enum LoadStatus {
    /// No file yet
    Fresh,
    Loaded { devices: usize },
    /// File was unreadable or malformed; starting empty.
    Corrupt {
        error: HistoryError,
        backup: Option<PathBuf>,
    },
}

/// File-backed owner of the device registry
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    history: DeviceHistory,
}

impl HistoryStore {
    /// Open the history at `path`.
    ///
    /// Never fails: a missing file gives an empty registry, and a corrupt one
    /// is moved aside to `<file>.corrupt` before starting empty.
    pub fn open(path: impl Into<PathBuf>) -> (Self, LoadStatus) {
        let path = path.into();
        let (history, status) = match std::fs::read_to_string(&path) {
            Ok(raw) => match DeviceHistory::from_json(&raw) {
                Ok(history) => {
                    let devices = history.len();
                    (history, LoadStatus::Loaded { devices })
                }
                Err(error) => {
                    let backup = quarantine(&path);
                    tracing::warn!(
                        "[HISTORY] {} is corrupt ({}); starting with empty history",
                        path.display(),
                        error
                    );
                    (DeviceHistory::new(), LoadStatus::Corrupt { error, backup })
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (DeviceHistory::new(), LoadStatus::Fresh)
            }
            Err(e) => {
                tracing::warn!(
                    "[HISTORY] Could not read {} ({}); starting with empty history",
                    path.display(),
                    e
                );
                (
                    DeviceHistory::new(),
                    LoadStatus::Corrupt {
                        error: e.into(),
                        backup: None,
                    },
                )
            }
        };

        (Self { path, history }, status)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn history(&self) -> &DeviceHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut DeviceHistory {
        &mut self.history
    }

    /// Replace the file with the full current registry.
    ///
    /// Written to a sibling temp file and renamed over the target so a crash
    /// mid-write leaves the previous record intact.
    pub fn save(&self) -> Result<(), HistoryError> {
        let json = self.history.to_json()?;
        let tmp = sibling(&self.path, ".tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn quarantine(path: &Path) -> Option<PathBuf> {
    let backup = sibling(path, ".corrupt");
    match std::fs::rename(path, &backup) {
        Ok(()) => Some(backup),
        Err(e) => {
            tracing::warn!("[HISTORY] Could not move corrupt history aside: {}", e);
            None
        }
    }
}
