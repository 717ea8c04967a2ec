//! Bounded, timestamped trail of notable events shown under the device table.

use chrono::NaiveDateTime;
use std::collections::VecDeque;

use crate::config::EVENT_LOG_CAPACITY;
use crate::history::timestamp;

const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<String>,
    capacity: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message stamped with the current wall-clock time.
    pub fn append(&mut self, message: impl AsRef<str>) {
        self.append_at(timestamp::now(), message);
    }

    /// Append a message stamped with `at`, evicting the oldest entry when full.
    pub fn append_at(&mut self, at: NaiveDateTime, message: impl AsRef<str>) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries
            .push_back(format!("{} {}", at.format(TIME_FORMAT), message.as_ref()));
    }

    /// Entries oldest first
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn keeps_only_most_recent_entries_in_order() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 5)
            .unwrap();
        let mut log = EventLog::new();
        for i in 0..8 {
            log.append_at(at, format!("event {i}"));
        }

        assert_eq!(
            log.snapshot(),
            vec![
                "12:30:05 event 3",
                "12:30:05 event 4",
                "12:30:05 event 5",
                "12:30:05 event 6",
                "12:30:05 event 7",
            ]
        );
    }

    #[test]
    fn append_stamps_wall_clock_time() {
        let mut log = EventLog::with_capacity(2);
        log.append("hello");
        let entry = &log.snapshot()[0];
        // "HH:MM:SS hello"
        assert_eq!(entry.len(), 8 + 1 + 5);
        assert!(entry.ends_with(" hello"));
    }

    #[test]
    fn zero_capacity_discards_everything() {
        let mut log = EventLog::with_capacity(0);
        log.append("dropped");
        assert!(log.is_empty());
    }
}
