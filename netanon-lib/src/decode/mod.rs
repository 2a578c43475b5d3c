mod quic_detect;
mod tls_detect;

pub use quic_detect::is_quic_handshake;
pub use tls_detect::is_tls_handshake;

use etherparse::{IpHeader, LinkHeader, PacketHeaders, TransportHeader, VlanHeader};

use crate::packet::{IpLayer, PacketRecord, TransportLayer};

/// Parses `pkt.raw` into `pkt`'s decoded-layer fields. Returns `false` on any soft
/// decode error (truncated frame, unsupported L3/L4) — the caller drops the packet and
/// continues; no error type crosses this boundary, matching the "soft errors never
/// propagate past the pipeline" rule.
pub fn decode(pkt: &mut PacketRecord) -> bool {
    pkt.clear_bool();
    pkt.eth = None;
    pkt.vlan = None;
    pkt.ip = None;
    pkt.transport = None;

    let headers = match PacketHeaders::from_ethernet_slice(&pkt.raw) {
        Ok(h) => h,
        Err(e) => {
            tracing::debug!(error = %e, "dropping packet: decode failed");
            return false;
        }
    };

    match headers.link {
        Some(LinkHeader::Ethernet2(eth)) => pkt.eth = Some(eth),
        _ => {
            tracing::debug!("dropping packet: no Ethernet II header");
            return false;
        }
    }

    if let Some(vlan) = headers.vlan {
        match vlan {
            VlanHeader::Single(tag) => pkt.vlan = Some(tag),
            VlanHeader::Double(_) => {
                tracing::debug!("dropping packet: double VLAN tag unsupported");
                return false;
            }
        }
    }

    match headers.ip {
        Some(IpHeader::Version4(v4, _)) => {
            pkt.is_ipv4 = true;
            pkt.src_ip = Some(std::net::IpAddr::V4(v4.source.into()));
            pkt.dst_ip = Some(std::net::IpAddr::V4(v4.destination.into()));
            pkt.ip = Some(IpLayer::V4(v4));
        }
        Some(IpHeader::Version6(v6, _)) => {
            pkt.is_ipv6 = true;
            pkt.src_ip = Some(std::net::IpAddr::V6(v6.source.into()));
            pkt.dst_ip = Some(std::net::IpAddr::V6(v6.destination.into()));
            pkt.ip = Some(IpLayer::V6(v6));
        }
        None => {
            tracing::debug!("dropping packet: no IPv4/IPv6 header");
            return false;
        }
    }

    match headers.transport {
        Some(TransportHeader::Tcp(tcp)) => {
            pkt.is_tcp = true;
            pkt.src_port = tcp.source_port;
            pkt.dst_port = tcp.destination_port;
            pkt.transport = Some(TransportLayer::Tcp(tcp));
        }
        Some(TransportHeader::Udp(udp)) => {
            pkt.is_udp = true;
            pkt.src_port = udp.source_port;
            pkt.dst_port = udp.destination_port;
            pkt.transport = Some(TransportLayer::Udp(udp));
        }
        _ => {
            tracing::debug!("dropping packet: no TCP/UDP header");
            return false;
        }
    }

    pkt.is_dns = pkt.is_udp && (pkt.src_port == 53 || pkt.dst_port == 53);

    let offset = headers.payload.as_ptr() as usize - pkt.raw.as_ptr() as usize;
    pkt.payload = (offset, headers.payload.len());

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use etherparse::PacketBuilder;

    fn build_udp_dns_packet() -> Vec<u8> {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4([192, 168, 0, 1], [8, 8, 8, 8], 64)
            .udp(40000, 53);
        let payload = b"\x00\x01\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00";
        let mut out = Vec::new();
        builder.write(&mut out, payload).unwrap();
        out
    }

    fn build_tcp_packet() -> Vec<u8> {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4([10, 0, 0, 5], [10, 0, 0, 7], 64)
            .tcp(1234, 443, 0, 64240);
        let payload = b"hello";
        let mut out = Vec::new();
        builder.write(&mut out, payload).unwrap();
        out
    }

    #[test]
    fn decodes_udp_dns_packet() {
        let mut pkt = PacketRecord::new();
        pkt.raw = build_udp_dns_packet();
        assert!(decode(&mut pkt));
        assert!(pkt.is_ipv4);
        assert!(pkt.is_udp);
        assert!(pkt.is_dns);
        assert_eq!(pkt.src_ip, Some("192.168.0.1".parse().unwrap()));
        assert_eq!(pkt.dst_ip, Some("8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn decodes_tcp_packet_and_finds_payload() {
        let mut pkt = PacketRecord::new();
        pkt.raw = build_tcp_packet();
        assert!(decode(&mut pkt));
        assert!(pkt.is_ipv4);
        assert!(pkt.is_tcp);
        assert!(!pkt.is_dns);
        assert_eq!(pkt.payload_bytes(), b"hello");
    }

    #[test]
    fn rejects_truncated_frame() {
        let mut pkt = PacketRecord::new();
        pkt.raw = vec![0u8; 4];
        assert!(!decode(&mut pkt));
    }
}
