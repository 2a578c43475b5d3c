use std::net::IpAddr;

use etherparse::PacketBuilder;

use crate::packet::{IpLayer, PacketRecord, TransportLayer};

/// Rebuilds `pkt.out` from the decoded layers with `new_src`/`new_dst` substituted in
/// place of the originals. `keep_payload` controls whether the original L4 payload
/// survives (DNS and TLS/QUIC handshake traffic) or is truncated to zero bytes.
///
/// `etherparse`'s `PacketBuilder` recomputes every length and checksum field from
/// scratch, so there is never a stale checksum left over from the original capture.
///
/// Ethernet source and destination are always scrubbed to the zero MAC; the original
/// hardware addresses never reach the emitted frame.
pub fn write_frame(pkt: &mut PacketRecord, new_src: IpAddr, new_dst: IpAddr, keep_payload: bool) {
    let payload: &[u8] = if keep_payload { pkt.payload_bytes() } else { &[] };

    if pkt.eth.is_none() {
        return;
    }
    let builder = PacketBuilder::ethernet2([0u8; 6], [0u8; 6]);

    let builder = match (&pkt.ip, new_src, new_dst) {
        (Some(IpLayer::V4(v4)), IpAddr::V4(s), IpAddr::V4(d)) => {
            builder.ipv4(s.octets(), d.octets(), v4.time_to_live)
        }
        (Some(IpLayer::V6(v6)), IpAddr::V6(s), IpAddr::V6(d)) => {
            builder.ipv6(s.octets(), d.octets(), v6.hop_limit)
        }
        _ => return,
    };

    let result = match &pkt.transport {
        Some(TransportLayer::Tcp(tcp)) => {
            let mut step = builder.tcp(
                tcp.source_port,
                tcp.destination_port,
                tcp.sequence_number,
                tcp.window_size,
            );
            if tcp.syn {
                step = step.syn();
            }
            if tcp.fin {
                step = step.fin();
            }
            if tcp.rst {
                step = step.rst();
            }
            if tcp.ack {
                step = step.ack(tcp.acknowledgment_number);
            }
            step.write(&mut pkt.out, payload)
        }
        Some(TransportLayer::Udp(udp)) => {
            builder.udp(udp.source_port, udp.destination_port).write(&mut pkt.out, payload)
        }
        None => return,
    };

    if result.is_err() {
        pkt.out.clear();
    }
}
