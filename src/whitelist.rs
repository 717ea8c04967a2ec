//! Whitelist filter
//!
//! IPs and MACs listed under `[whitelisted]` in the config file are
//! excluded from tracking. A sighting is exempt when its IP OR its MAC
//! is listed; the two lists are not paired.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    whitelisted: WhitelistSection,
}

#[derive(Debug, Default, Deserialize)]
struct WhitelistSection {
    #[serde(default)]
    ipv4: Vec<String>,
    #[serde(default)]
    mac: Vec<String>,
}

/// Immutable set of exempt IPs and MACs
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    ips: HashSet<String>,
    macs: HashSet<String>,
}

impl Whitelist {
    pub fn new<I, M>(ips: I, macs: M) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        M: IntoIterator,
        M::Item: AsRef<str>,
    {
        Self {
            ips: ips.into_iter().map(|ip| ip.as_ref().trim().to_string()).collect(),
            macs: macs.into_iter().map(|mac| normalize_mac(mac.as_ref())).collect(),
        }
    }

    /// Empty whitelist; nothing is exempt
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the whitelist from a TOML file.
    ///
    /// Returns [`ConfigError::Missing`] when the file does not exist so the
    /// caller can tell "not configured" apart from "configured badly".
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::Missing(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(Self::new(file.whitelisted.ipv4, file.whitelisted.mac))
    }

    pub fn is_whitelisted(&self, ip: &str, mac: &str) -> bool {
        self.ips.contains(ip) || self.macs.contains(&normalize_mac(mac))
    }

    pub fn is_empty(&self) -> bool {
        self.ips.is_empty() && self.macs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ips.len() + self.macs.len()
    }
}

fn normalize_mac(mac: &str) -> String {
    mac.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_or_mac_match_is_enough() {
        let wl = Whitelist::new(["10.0.0.1"], ["aa:bb:cc:dd:ee:ff"]);
        assert!(wl.is_whitelisted("10.0.0.1", "11:22:33:44:55:66"));
        assert!(wl.is_whitelisted("10.0.0.9", "aa:bb:cc:dd:ee:ff"));
        assert!(!wl.is_whitelisted("10.0.0.9", "11:22:33:44:55:66"));
    }

    #[test]
    fn mac_match_ignores_case() {
        let wl = Whitelist::new(Vec::<String>::new(), ["AA:BB:CC:DD:EE:FF"]);
        assert!(wl.is_whitelisted("192.168.1.5", "aa:bb:cc:dd:ee:ff"));
        assert!(wl.is_whitelisted("192.168.1.5", "AA:bb:CC:dd:EE:ff"));
    }

    #[test]
    fn parses_config_file_layout() {
        let wl = Whitelist::from_toml(
            r#"
            [whitelisted]
            ipv4 = ["192.168.1.1", "192.168.1.2"]
            mac = ["de:ad:be:ef:00:01"]
            "#,
        )
        .expect("valid config should parse");

        assert_eq!(wl.len(), 3);
        assert!(wl.is_whitelisted("192.168.1.2", "00:00:00:00:00:00"));
    }

    #[test]
    fn missing_keys_default_to_empty() {
        let wl = Whitelist::from_toml("[whitelisted]\nipv4 = [\"10.0.0.1\"]\n").unwrap();
        assert_eq!(wl.len(), 1);

        let wl = Whitelist::from_toml("").unwrap();
        assert!(wl.is_empty());
    }

    #[test]
    fn malformed_config_is_a_parse_error() {
        let err = Whitelist::from_toml("[whitelisted]\nipv4 = 42\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_reported_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = Whitelist::load(&dir.path().join("config.toml")).unwrap_err();
        assert!(err.is_missing());
    }
}
