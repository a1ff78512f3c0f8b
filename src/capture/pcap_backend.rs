//! Live capture through libpcap (Npcap on Windows) using the `pcap` crate.
//!
//! Handles are opened in promiscuous mode with a bounded snapshot length. Without a
//! configured read timeout the read blocks until a packet arrives, so on an idle
//! interface shutdown waits for the next packet.

use pcap::{Active, Capture, Device};

use crate::capture::render::render_packet;
use crate::capture::{CaptureBackend, PacketReader, ReadError};
use crate::config;

#[derive(Debug, Clone)]
pub struct PcapBackend {
    snaplen: i32,
    read_timeout_ms: Option<i32>,
}

impl PcapBackend {
    pub fn new(read_timeout_ms: Option<i32>) -> Self {
        Self {
            snaplen: config::SNAPLEN,
            read_timeout_ms,
        }
    }
}

impl Default for PcapBackend {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CaptureBackend for PcapBackend {
    type Reader = PcapReader;

    fn open(&self, interface: &str) -> Result<PcapReader, String> {
        let mut inactive = Capture::from_device(interface)
            .map_err(|e| e.to_string())?
            .promisc(true)
            .snaplen(self.snaplen);
        if let Some(ms) = self.read_timeout_ms {
            inactive = inactive.timeout(ms);
        }

        let cap = inactive.open().map_err(|e| {
            format!("{e}. Ensure Npcap is installed and the program is running as administrator.")
        })?;
        let linktype = cap.get_datalink().0;
        tracing::debug!("Opened {interface} (linktype {linktype}, snaplen {})", self.snaplen);

        Ok(PcapReader { cap, linktype })
    }
}

pub struct PcapReader {
    cap: Capture<Active>,
    linktype: i32,
}

impl PacketReader for PcapReader {
    fn apply_filter(&mut self, expr: &str) -> Result<(), String> {
        self.cap.filter(expr, true).map_err(|e| e.to_string())
    }

    fn next_packet(&mut self) -> Result<String, ReadError> {
        match self.cap.next_packet() {
            Ok(packet) => Ok(render_packet(self.linktype, packet.data)),
            Err(pcap::Error::TimeoutExpired) => Err(ReadError::Timeout),
            Err(pcap::Error::NoMorePackets) => Err(ReadError::Closed),
            Err(e) => Err(ReadError::Transient(e.to_string())),
        }
    }
}

/// All capture devices known to libpcap.
pub fn list_interfaces() -> Result<Vec<Device>, pcap::Error> {
    Device::list()
}

/// One line per device, then one indented line per address.
pub fn describe_device(device: &Device) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({})",
        device.name,
        device.desc.as_deref().unwrap_or("no description")
    )];
    for address in &device.addresses {
        let mut line = format!("  - IP {}", address.addr);
        if let Some(netmask) = address.netmask {
            line.push_str(&format!(" netmask {netmask}"));
        }
        if let Some(broadcast) = address.broadcast_addr {
            line.push_str(&format!(" broadcast {broadcast}"));
        }
        lines.push(line);
    }
    lines
}
