pub mod domain {
    use etherparse::ArpOperation;

    /// ARP operation carried by a sighting
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ArpOp {
        Request,
        Reply,
    }

    impl ArpOp {
        /// Only who-has and is-at are tracked
        pub fn from_operation(op: ArpOperation) -> Option<Self> {
            if op == ArpOperation::REQUEST {
                Some(ArpOp::Request)
            } else if op == ArpOperation::REPLY {
                Some(ArpOp::Reply)
            } else {
                None
            }
        }
    }

    /// One decoded ARP frame attributing a MAC to an IP
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Sighting {
        pub op: ArpOp,
        pub source_ip: String,
        pub source_mac: String,
    }

    impl Sighting {
        pub fn new(op: ArpOp, source_ip: impl Into<String>, source_mac: impl Into<String>) -> Self {
            Self {
                op,
                source_ip: source_ip.into(),
                source_mac: source_mac.into(),
            }
        }
    }
}

pub mod dto {
    use serde::Serialize;

    #[derive(Debug, Serialize, Clone, PartialEq, Eq)]
    pub struct DeviceRow {
        pub ip: String,
        pub mac: String,
        pub first_seen: String,
        pub last_seen: String,
        pub active: bool,
    }

    /// Consistent view of the tracker handed to the display once per sweep
    #[derive(Debug, Serialize, Clone)]
    pub struct RenderSnapshot {
        pub scan_started: String,
        pub elapsed_secs: u64,
        pub packets_captured: u64,
        pub active_ips: Vec<String>,
        pub devices: Vec<DeviceRow>,
        pub messages: Vec<String>,
    }

    impl RenderSnapshot {
        pub fn active_count(&self) -> usize {
            self.active_ips.len()
        }
    }
}
