//! Device presence tracker
//!
//! Single owned aggregate of everything the capture path and the sweep path
//! share: registry, active set, packet counter and event log. Callers wrap
//! it in [`crate::monitor::Monitor`] so both paths go through one lock.

use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::time::Duration;

use crate::config::MonitorConfig;
use crate::error::{ConfigError, HistoryError};
use crate::event_log::EventLog;
use crate::history::{timestamp, Device, DeviceHistory, HistoryStore, LoadStatus};
use crate::models::dto::{DeviceRow, RenderSnapshot};
use crate::presence::{Disconnect, Presence, PresenceTracker};
use crate::whitelist::Whitelist;

/// What a single sighting did to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SightingOutcome {
    /// Matched the whitelist; only counted.
    Whitelisted,
    /// First sighting of this pair; registry grew by one.
    Added,
    /// Known pair; `last_seen` refreshed.
    Touched,
    /// Unknown pair at an IP already added during this sweep window.
    Deferred,
}

pub struct Tracker {
    whitelist: Whitelist,
    store: HistoryStore,
    presence: PresenceTracker,
    log: EventLog,
    packets_captured: u64,
    /// IPs added since the last sweep
    newly_found: HashSet<String>,
    scan_started: NaiveDateTime,
    elapsed: chrono::Duration,
    save_failing: bool,
}

impl Tracker {
    pub fn new(
        whitelist: Whitelist,
        store: HistoryStore,
        timeout: Duration,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            whitelist,
            store,
            presence: PresenceTracker::new(timeout),
            log: EventLog::new(),
            packets_captured: 0,
            newly_found: HashSet::new(),
            scan_started: now,
            elapsed: chrono::Duration::zero(),
            save_failing: false,
        }
    }

    /// Load whitelist and history for a session.
    ///
    /// Missing or malformed whitelist and unreadable history all degrade to
    /// empty state with one event log entry each.
    pub fn start(config: &MonitorConfig, now: NaiveDateTime) -> Self {
        let mut notices = Vec::new();

        let whitelist = match Whitelist::load(&config.config_path) {
            Ok(whitelist) => {
                tracing::info!(
                    "[TRACKER] Loaded {} whitelist entries from {}",
                    whitelist.len(),
                    config.config_path.display()
                );
                whitelist
            }
            Err(ConfigError::Missing(path)) => {
                tracing::warn!("[TRACKER] {} not found, whitelist is empty", path.display());
                notices.push(format!(
                    "No {} found. No devices whitelisted.",
                    path.display()
                ));
                Whitelist::empty()
            }
            Err(e) => {
                tracing::warn!(
                    "[TRACKER] Ignoring {}: {}",
                    config.config_path.display(),
                    e
                );
                notices.push(format!(
                    "Ignoring {} ({}). No devices whitelisted.",
                    config.config_path.display(),
                    e
                ));
                Whitelist::empty()
            }
        };

        let (store, status) = HistoryStore::open(&config.history_path);
        match status {
            LoadStatus::Fresh => {
                tracing::info!(
                    "[TRACKER] No history at {}, starting fresh",
                    config.history_path.display()
                );
            }
            LoadStatus::Loaded { devices } => {
                tracing::info!(
                    "[TRACKER] Loaded {} known devices from {}",
                    devices,
                    config.history_path.display()
                );
            }
            LoadStatus::Corrupt { error, backup } => {
                let moved = backup
                    .map(|p| format!(", moved to {}", p.display()))
                    .unwrap_or_default();
                notices.push(format!(
                    "Device history unreadable ({error}){moved}. Starting fresh."
                ));
            }
        }

        let mut tracker = Self::new(whitelist, store, config.timeout, now);
        for notice in notices {
            tracker.log.append_at(now, notice);
        }
        tracker
    }

    /// Handle one decoded ARP sighting.
    pub fn on_sighting(&mut self, ip: &str, mac: &str, now: NaiveDateTime) -> SightingOutcome {
        self.packets_captured += 1;
        tracing::debug!("[TRACKER] Sighting {} ({})", ip, mac);
        self.log
            .append_at(now, format!("Packet detected - IP: {ip}, MAC: {mac}"));

        if self.whitelist.is_whitelisted(ip, mac) {
            tracing::debug!("[TRACKER] {} ({}) is whitelisted", ip, mac);
            self.log
                .append_at(now, format!("Skipping whitelisted device: {ip}"));
            return SightingOutcome::Whitelisted;
        }

        if self.is_known(ip, mac) {
            self.touch(ip, mac, now);
            return SightingOutcome::Touched;
        }

        // A burst of replies from one new host must add it once per window.
        if !self.newly_found.insert(ip.to_string()) {
            tracing::debug!("[TRACKER] {} already added this window, deferring {}", ip, mac);
            return SightingOutcome::Deferred;
        }
        self.add(ip, mac, now);
        SightingOutcome::Added
    }

    pub fn is_known(&self, ip: &str, mac: &str) -> bool {
        self.store.history().is_known(ip, mac)
    }

    /// Register a new device. Returns `None` if the pair is already known.
    pub fn add(&mut self, ip: &str, mac: &str, now: NaiveDateTime) -> Option<Device> {
        let device = self.store.history_mut().add(ip, mac, now)?.clone();
        self.presence.mark_active(ip);
        self.persist(now);

        tracing::info!("[TRACKER] New device: {} ({})", ip, mac);
        self.log.append_at(now, format!("► New device: {ip} ({mac})"));
        Some(device)
    }

    /// Refresh a known device. Unknown pairs are ignored; returns whether one matched.
    pub fn touch(&mut self, ip: &str, mac: &str, now: NaiveDateTime) -> bool {
        if self.store.history_mut().touch(ip, mac, now).is_none() {
            tracing::debug!("[TRACKER] touch for unknown pair {} ({}) ignored", ip, mac);
            return false;
        }
        self.presence.mark_active(ip);
        self.persist(now);
        true
    }

    /// Recompute activity, log disconnects and open a new dedup window.
    pub fn sweep(&mut self, now: NaiveDateTime) -> Vec<Disconnect> {
        self.newly_found.clear();

        let disconnects = self.presence.sweep(self.store.history(), now);
        for gone in &disconnects {
            tracing::info!("[TRACKER] Device disconnected: {} ({})", gone.ip, gone.mac);
            self.log.append_at(
                now,
                format!("Device disconnected: {} ({})", gone.ip, gone.mac),
            );
        }

        self.elapsed = now
            .signed_duration_since(self.scan_started)
            .max(chrono::Duration::zero());
        disconnects
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        let devices = self
            .store
            .history()
            .devices()
            .iter()
            .map(|device| DeviceRow {
                ip: device.ip.clone(),
                mac: device.mac.clone(),
                first_seen: timestamp::format(&device.first_seen),
                last_seen: timestamp::format(&device.last_seen),
                active: self.presence.is_active(&device.ip),
            })
            .collect();

        RenderSnapshot {
            scan_started: timestamp::format(&self.scan_started),
            elapsed_secs: self.elapsed.num_seconds().max(0) as u64,
            packets_captured: self.packets_captured,
            active_ips: self.presence.active_ips().map(str::to_string).collect(),
            devices,
            messages: self.log.snapshot(),
        }
    }

    /// Append an operator-facing note to the event log.
    pub fn note(&mut self, now: NaiveDateTime, message: impl AsRef<str>) {
        tracing::info!("[TRACKER] {}", message.as_ref());
        self.log.append_at(now, message);
    }

    /// Final entry plus one last save before exit.
    pub fn shutdown(&mut self, now: NaiveDateTime, reason: &str) -> Result<(), HistoryError> {
        self.note(now, reason);
        let result = self.store.save();
        match &result {
            Ok(()) => tracing::info!(
                "[TRACKER] Saved {} devices to {}",
                self.store.history().len(),
                self.store.path().display()
            ),
            Err(e) => tracing::error!("[TRACKER] Final save failed: {}", e),
        }
        result
    }

    pub fn presence_of(&self, ip: &str, mac: &str, now: NaiveDateTime) -> Presence {
        self.presence.classify(self.store.history(), ip, mac, now)
    }

    pub fn history(&self) -> &DeviceHistory {
        self.store.history()
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub fn packets_captured(&self) -> u64 {
        self.packets_captured
    }

    /// Write-through save. A failure is reported once per failing streak and
    /// the tracker keeps running with memory ahead of disk.
    fn persist(&mut self, now: NaiveDateTime) {
        match self.store.save() {
            Ok(()) => {
                if self.save_failing {
                    tracing::info!("[TRACKER] Device history writable again");
                    self.save_failing = false;
                }
            }
            Err(e) => {
                tracing::warn!(
                    "[TRACKER] Failed to save {}: {}",
                    self.store.path().display(),
                    e
                );
                if !self.save_failing {
                    self.save_failing = true;
                    self.log
                        .append_at(now, format!("Failed to save device history: {e}"));
                }
            }
        }
    }
}
