//! Terminal output for render snapshots

use std::io::{self, Write};

use crate::models::dto::RenderSnapshot;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const ACTIVE: &str = "●";
const INACTIVE: &str = "○";

/// How each sweep's snapshot is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Redraw a table in place
    Table,
    /// One JSON object per line
    JsonLines,
}

pub fn render_table(snapshot: &RenderSnapshot) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Scan time: {} • Active devices: {} • Packets: {}\n\n",
        format_elapsed(snapshot.elapsed_secs),
        snapshot.active_count(),
        snapshot.packets_captured
    ));
    out.push_str(&format!(
        "{:<15}  {:<17}  {:<19}  {:<19}  {}\n",
        "IP", "MAC", "First Seen", "Last Seen", "Status"
    ));

    if snapshot.devices.is_empty() {
        out.push_str("Waiting for devices...\n");
    }
    for device in &snapshot.devices {
        out.push_str(&format!(
            "{:<15}  {:<17}  {:<19}  {:<19}  {}\n",
            device.ip,
            device.mac,
            device.first_seen,
            device.last_seen,
            if device.active { ACTIVE } else { INACTIVE }
        ));
    }

    out.push_str("\nMessages\n");
    for message in &snapshot.messages {
        out.push_str("  ");
        out.push_str(message);
        out.push('\n');
    }
    out
}

/// `H:MM:SS`
pub fn format_elapsed(secs: u64) -> String {
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

pub fn draw(snapshot: &RenderSnapshot, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Table => {
            write!(out, "{}{}", CLEAR_SCREEN, render_table(snapshot))?;
        }
        OutputMode::JsonLines => {
            serde_json::to_writer(&mut out, snapshot)?;
            writeln!(out)?;
        }
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dto::DeviceRow;

    fn snapshot(devices: Vec<DeviceRow>) -> RenderSnapshot {
        RenderSnapshot {
            scan_started: "2024-03-01 12:00:00".to_string(),
            elapsed_secs: 3725,
            packets_captured: 17,
            active_ips: devices
                .iter()
                .filter(|d| d.active)
                .map(|d| d.ip.clone())
                .collect(),
            devices,
            messages: vec!["12:00:01 Starting network scan...".to_string()],
        }
    }

    #[test]
    fn elapsed_matches_clock_layout() {
        assert_eq!(format_elapsed(0), "0:00:00");
        assert_eq!(format_elapsed(3725), "1:02:05");
    }

    #[test]
    fn empty_table_shows_placeholder() {
        let text = render_table(&snapshot(vec![]));
        assert!(text.contains("Waiting for devices..."));
        assert!(text.contains("Scan time: 1:02:05 • Active devices: 0 • Packets: 17"));
        assert!(text.contains("Starting network scan..."));
    }

    #[test]
    fn rows_carry_status_markers() {
        let text = render_table(&snapshot(vec![
            DeviceRow {
                ip: "10.0.0.5".to_string(),
                mac: "aa:bb:cc:dd:ee:ff".to_string(),
                first_seen: "2024-03-01 12:00:00".to_string(),
                last_seen: "2024-03-01 12:00:09".to_string(),
                active: true,
            },
            DeviceRow {
                ip: "10.0.0.6".to_string(),
                mac: "11:22:33:44:55:66".to_string(),
                first_seen: "2024-03-01 11:00:00".to_string(),
                last_seen: "2024-03-01 11:00:00".to_string(),
                active: false,
            },
        ]));

        let row = |ip: &str| text.lines().find(|l| l.starts_with(ip)).unwrap().to_string();
        assert!(row("10.0.0.5").ends_with(ACTIVE));
        assert!(row("10.0.0.6").ends_with(INACTIVE));
        assert!(text.contains("Active devices: 1"));
        assert!(!text.contains("Waiting for devices"));
    }
}
