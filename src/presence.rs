//! Presence state machine
//!
//! A device is active while `now - last_seen < timeout`. Activity is not
//! stored per device; the set of active IPs is recomputed from the registry
//! on every sweep, and ingestion may mark an IP active early so a fresh
//! sighting shows up before the next sweep.

use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use crate::history::{Device, DeviceHistory};

/// Derived state of an (ip, mac) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    NeverSeen,
    Active,
    Inactive,
}

/// An IP that dropped out of the active set during a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    pub ip: String,
    pub mac: String,
    pub last_seen: NaiveDateTime,
}

impl From<&Device> for Disconnect {
    fn from(device: &Device) -> Self {
        Self {
            ip: device.ip.clone(),
            mac: device.mac.clone(),
            last_seen: device.last_seen,
        }
    }
}

/// Owner of the active set
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    active: BTreeSet<String>,
    timeout: chrono::Duration,
}

impl PresenceTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            active: BTreeSet::new(),
            timeout: chrono::TimeDelta::from_std(timeout).unwrap_or(chrono::TimeDelta::MAX),
        }
    }

    pub fn timeout(&self) -> chrono::Duration {
        self.timeout
    }

    pub fn is_recent(&self, last_seen: NaiveDateTime, now: NaiveDateTime) -> bool {
        now.signed_duration_since(last_seen) < self.timeout
    }

    /// Mark an IP present on a fresh sighting. Returns true if it was not already active.
    pub fn mark_active(&mut self, ip: &str) -> bool {
        if self.active.contains(ip) {
            return false;
        }
        self.active.insert(ip.to_string())
    }

    pub fn is_active(&self, ip: &str) -> bool {
        self.active.contains(ip)
    }

    pub fn active_ips(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(String::as_str)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Classify one pair against the registry.
    pub fn classify(
        &self,
        history: &DeviceHistory,
        ip: &str,
        mac: &str,
        now: NaiveDateTime,
    ) -> Presence {
        match history.get(ip, mac) {
            None => Presence::NeverSeen,
            Some(device) if self.is_recent(device.last_seen, now) => Presence::Active,
            Some(_) => Presence::Inactive,
        }
    }

    /// Recompute the active set from the registry.
    ///
    /// Returns one [`Disconnect`] per IP that was active before and is not
    /// anymore, naming the device most recently seen at that IP. IPs entering
    /// the set are not reported.
    pub fn sweep(&mut self, history: &DeviceHistory, now: NaiveDateTime) -> Vec<Disconnect> {
        let mut next = BTreeSet::new();
        let mut stale: HashMap<&str, &Device> = HashMap::new();

        for device in history.devices() {
            if self.is_recent(device.last_seen, now) {
                next.insert(device.ip.clone());
                continue;
            }
            stale
                .entry(device.ip.as_str())
                .and_modify(|latest| {
                    if device.last_seen > latest.last_seen {
                        *latest = device;
                    }
                })
                .or_insert(device);
        }

        let disconnects = self
            .active
            .iter()
            .filter(|ip| !next.contains(*ip))
            .filter_map(|ip| stale.get(ip.as_str()).map(|device| Disconnect::from(*device)))
            .collect();

        self.active = next;
        disconnects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn history_with(entries: &[(&str, &str, i64)]) -> DeviceHistory {
        let mut history = DeviceHistory::new();
        for (ip, mac, secs_ago) in entries {
            let seen = now() - ChronoDuration::seconds(*secs_ago);
            history.add(ip, mac, seen);
        }
        history
    }

    #[test]
    fn boundary_is_exclusive() {
        let presence = PresenceTracker::new(Duration::from_secs(10));
        assert!(presence.is_recent(now() - ChronoDuration::seconds(9), now()));
        assert!(!presence.is_recent(now() - ChronoDuration::seconds(10), now()));
    }

    #[test]
    fn sweep_enters_recent_devices_silently() {
        let history = history_with(&[("10.0.0.5", "aa", 3), ("10.0.0.6", "bb", 60)]);
        let mut presence = PresenceTracker::new(Duration::from_secs(10));

        let disconnects = presence.sweep(&history, now());
        assert!(disconnects.is_empty());
        assert!(presence.is_active("10.0.0.5"));
        assert!(!presence.is_active("10.0.0.6"));
    }

    #[test]
    fn stale_active_ip_disconnects_once() {
        let history = history_with(&[("10.0.0.5", "aa", 15)]);
        let mut presence = PresenceTracker::new(Duration::from_secs(10));
        presence.mark_active("10.0.0.5");

        let disconnects = presence.sweep(&history, now());
        assert_eq!(disconnects.len(), 1);
        assert_eq!(disconnects[0].mac, "aa");
        assert!(!presence.is_active("10.0.0.5"));

        assert!(presence.sweep(&history, now()).is_empty());
    }

    #[test]
    fn shared_ip_stays_active_while_any_mac_is_recent() {
        let history = history_with(&[("10.0.0.5", "old", 300), ("10.0.0.5", "new", 2)]);
        let mut presence = PresenceTracker::new(Duration::from_secs(10));
        presence.mark_active("10.0.0.5");

        assert!(presence.sweep(&history, now()).is_empty());
        assert!(presence.is_active("10.0.0.5"));
    }

    #[test]
    fn disconnect_names_most_recent_device_at_ip() {
        let history = history_with(&[("10.0.0.5", "old", 300), ("10.0.0.5", "new", 20)]);
        let mut presence = PresenceTracker::new(Duration::from_secs(10));
        presence.mark_active("10.0.0.5");

        let disconnects = presence.sweep(&history, now());
        assert_eq!(disconnects.len(), 1);
        assert_eq!(disconnects[0].mac, "new");
    }

    #[test]
    fn classify_covers_all_states() {
        let history = history_with(&[("10.0.0.5", "aa", 1), ("10.0.0.6", "bb", 30)]);
        let presence = PresenceTracker::new(Duration::from_secs(10));

        assert_eq!(presence.classify(&history, "10.0.0.5", "aa", now()), Presence::Active);
        assert_eq!(presence.classify(&history, "10.0.0.6", "bb", now()), Presence::Inactive);
        assert_eq!(presence.classify(&history, "10.0.0.7", "cc", now()), Presence::NeverSeen);
    }

    #[test]
    fn mark_active_reports_first_insert_only() {
        let mut presence = PresenceTracker::new(Duration::from_secs(10));
        assert!(presence.mark_active("10.0.0.5"));
        assert!(!presence.mark_active("10.0.0.5"));
        assert_eq!(presence.active_count(), 1);
    }

    #[test]
    fn unrepresentable_timeout_never_expires() {
        let history = history_with(&[("10.0.0.5", "aa", 10 * 365 * 24 * 3600)]);
        let mut presence = PresenceTracker::new(Duration::MAX);
        assert_eq!(presence.timeout(), chrono::TimeDelta::MAX);

        assert!(presence.sweep(&history, now()).is_empty());
        assert!(presence.is_active("10.0.0.5"));
    }
}
