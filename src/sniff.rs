// src/sniff.rs
use crossbeam_channel::Sender;
use etherparse::{ArpHardwareId, ArpPacketSlice, EtherType, Ethernet2HeaderSlice};
use pcap::{Active, Capture, Device};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::CAPTURE_TIMEOUT_MS;
use crate::models::domain::{ArpOp, Sighting};

/// Capture ARP traffic until `running` clears or the receiver hangs up.
pub fn start_sniffing(
    interface: Option<&str>,
    sender: Sender<Sighting>,
    running: Arc<AtomicBool>,
) -> Result<(), pcap::Error> {
    let mut cap = create_capture(interface)?;
    configure_capture(&mut cap)?;

    process_packets(&mut cap, sender, &running)
}

fn create_capture(interface: Option<&str>) -> Result<Capture<Active>, pcap::Error> {
    let device = match interface {
        Some(name) => Device::from(name),
        None => default_device()?,
    };
    tracing::info!("[SNIFF] Listening for ARP on {}", device.name);

    Capture::from_device(device)?
        .promisc(false)
        .snaplen(128)  // Ethernet + ARP fits easily
        .timeout(CAPTURE_TIMEOUT_MS)  // lets the loop notice shutdown
        .immediate_mode(true)
        .open()
}

fn default_device() -> Result<Device, pcap::Error> {
    Device::list()?
        .into_iter()
        .find(|d| d.name != "any" && !d.name.starts_with("lo"))
        .ok_or(pcap::Error::NoSuchDevice)
}

fn configure_capture(cap: &mut Capture<Active>) -> Result<(), pcap::Error> {
    cap.filter("arp", true)
}

fn process_packets(
    cap: &mut Capture<Active>,
    sender: Sender<Sighting>,
    running: &AtomicBool,
) -> Result<(), pcap::Error> {
    while running.load(Ordering::SeqCst) {
        match cap.next_packet() {
            Ok(packet) => {
                let Some(sighting) = decode_frame(packet.data) else {
                    continue;
                };
                if sender.send(sighting).is_err() {
                    tracing::warn!("[SNIFF] Sighting channel closed, stopping capture");
                    break;
                }
            }
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Decode an Ethernet II frame carrying an ARP request or reply.
///
/// Returns `None` for anything else, including ARP probes whose sender
/// address is still 0.0.0.0.
pub fn decode_frame(frame: &[u8]) -> Option<Sighting> {
    let eth = Ethernet2HeaderSlice::from_slice(frame).ok()?;
    if eth.ether_type() != EtherType::ARP {
        return None;
    }
    decode_arp(&frame[eth.slice().len()..])
}

fn decode_arp(payload: &[u8]) -> Option<Sighting> {
    let arp = ArpPacketSlice::from_slice(payload).ok()?;
    if arp.hw_addr_type() != ArpHardwareId::ETHERNET || arp.proto_addr_type() != EtherType::IPV4 {
        return None;
    }

    let op = ArpOp::from_operation(arp.operation())?;
    let sender_mac = arp.sender_hw_addr();
    let sender_ip: [u8; 4] = arp.sender_protocol_addr().try_into().ok()?;
    let sender_ip = Ipv4Addr::from(sender_ip);
    if sender_mac.len() != 6 || sender_ip.is_unspecified() {
        return None;
    }

    Some(Sighting::new(op, sender_ip.to_string(), format_mac(sender_mac)))
}

/// Lowercase colon-separated hex, e.g. `aa:bb:cc:dd:ee:ff`
pub fn format_mac(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}
