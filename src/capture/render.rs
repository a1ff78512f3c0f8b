//! Human-readable rendering of captured frames.
//!
//! Produces one header line per decoded layer followed by the transport payload with
//! every non-printable byte replaced by a space. Length-prefixed strings inside binary
//! payloads (such as AMF-encoded RTMP commands) therefore end up as standalone tokens.

use std::fmt::Write;

use etherparse::{LinkSlice, NetSlice, SlicedPacket, TransportSlice};

/// Datalink type numbers as reported by libpcap.
pub const DLT_NULL: i32 = 0;
pub const DLT_EN10MB: i32 = 1;
pub const DLT_RAW: i32 = 12;
pub const DLT_RAW_ALT: i32 = 14;
pub const DLT_LOOP: i32 = 108;
pub const LINKTYPE_RAW: i32 = 101;

/// Render `data` captured on a link of type `linktype`.
pub fn render_packet(linktype: i32, data: &[u8]) -> String {
    let sliced = match linktype {
        DLT_EN10MB => SlicedPacket::from_ethernet(data).ok(),
        DLT_RAW | DLT_RAW_ALT | LINKTYPE_RAW => SlicedPacket::from_ip(data).ok(),
        // BSD loopback: 4-byte address family header before the IP packet.
        DLT_NULL | DLT_LOOP if data.len() > 4 => SlicedPacket::from_ip(&data[4..]).ok(),
        _ => None,
    };

    match sliced {
        Some(packet) => render_sliced(&packet, data.len()),
        None => format!("Frame {} bytes\nPayload: {}", data.len(), printable(data)),
    }
}

fn render_sliced(packet: &SlicedPacket<'_>, frame_len: usize) -> String {
    let mut out = format!("Frame {frame_len} bytes\n");

    if let Some(LinkSlice::Ethernet2(eth)) = &packet.link {
        let _ = writeln!(
            out,
            "Ethernet {} -> {}",
            format_mac(&eth.source()),
            format_mac(&eth.destination())
        );
    }

    if let Some(NetSlice::Ipv4(ip)) = &packet.net {
        let header = ip.header();
        let _ = writeln!(out, "IPv4 {} -> {}", header.source_addr(), header.destination_addr());
    } else if let Some(NetSlice::Ipv6(ip)) = &packet.net {
        let header = ip.header();
        let _ = writeln!(out, "IPv6 {} -> {}", header.source_addr(), header.destination_addr());
    }

    let payload = if let Some(TransportSlice::Tcp(tcp)) = &packet.transport {
        let _ = writeln!(
            out,
            "TCP {} -> {} len={}",
            tcp.source_port(),
            tcp.destination_port(),
            tcp.payload().len()
        );
        Some(tcp.payload())
    } else if let Some(TransportSlice::Udp(udp)) = &packet.transport {
        let _ = writeln!(
            out,
            "UDP {} -> {} len={}",
            udp.source_port(),
            udp.destination_port(),
            udp.payload().len()
        );
        Some(udp.payload())
    } else {
        None
    };

    if let Some(payload) = payload {
        if !payload.is_empty() {
            let _ = write!(out, "Payload: {}", printable(payload));
        }
    }

    out
}

/// Keep visible ASCII, turn everything else into a space.
pub fn printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii_graphic() { b as char } else { ' ' })
        .collect()
}

fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}
