mod serialize;

use std::sync::Arc;

use crate::crypto::CryptoPanEngine;
use crate::decode::{is_quic_handshake, is_tls_handshake};
use crate::packet::{PacketRecord, TransportLayer};
use crate::policy::PolicySet;

/// What the worker does with a packet after the rewriter has run.
#[derive(Debug, PartialEq, Eq)]
pub enum PacketOutcome {
    /// `pkt.out` holds the rewritten frame, ready for the sink.
    Emit,
    /// Both endpoints are local traffic that should never leave the box.
    Drop,
}

/// Rewrites addresses in place and re-serializes the frame into `pkt.out`.
///
/// Order of operations: both-ends-local drop test, address substitution under the
/// engine's read lock, handshake-aware payload policy, then innermost-first
/// serialization (L4 checksum, L3 addresses/length/checksum, L2 passthrough) with a
/// capture-length fix-up that only ever grows the recorded length.
pub async fn rewrite(
    pkt: &mut PacketRecord,
    policy: &PolicySet,
    engine: &Arc<CryptoPanEngine>,
) -> PacketOutcome {
    let (Some(src), Some(dst)) = (pkt.src_ip, pkt.dst_ip) else {
        return PacketOutcome::Drop;
    };

    if policy.should_drop(src, dst) {
        return PacketOutcome::Drop;
    }

    let new_src = if policy.should_anonymize(src) { engine.anonymize(src).await } else { src };
    let new_dst = if policy.should_anonymize(dst) { engine.anonymize(dst).await } else { dst };

    let keep_payload = pkt.is_dns || is_handshake_payload(pkt);

    pkt.clear_out();
    serialize::write_frame(pkt, new_src, new_dst, keep_payload);

    if pkt.out.len() > pkt.info.capture_length {
        pkt.info.capture_length = pkt.out.len();
    }

    PacketOutcome::Emit
}

fn is_handshake_payload(pkt: &PacketRecord) -> bool {
    let payload = pkt.payload_bytes();
    match pkt.transport {
        Some(TransportLayer::Tcp(_)) => is_tls_handshake(payload),
        Some(TransportLayer::Udp(_)) => is_quic_handshake(payload),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::AddressKey;
    use etherparse::PacketBuilder;

    fn engine() -> Arc<CryptoPanEngine> {
        Arc::new(CryptoPanEngine::new(AddressKey::create_random()))
    }

    fn tcp_packet(src: [u8; 4], dst: [u8; 4]) -> PacketRecord {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4(src, dst, 64)
            .tcp(1234, 443, 0, 64240);
        let mut raw = Vec::new();
        builder.write(&mut raw, b"app data, not a handshake").unwrap();
        let mut pkt = PacketRecord::new();
        pkt.raw = raw;
        pkt.info.capture_length = pkt.raw.len();
        pkt.info.original_length = pkt.raw.len();
        assert!(crate::decode::decode(&mut pkt));
        pkt
    }

    #[tokio::test]
    async fn both_ends_local_is_dropped() {
        let policy = PolicySet::new(true, true, vec!["10.0.0.0/8".parse().unwrap()]);
        let mut pkt = tcp_packet([10, 0, 0, 5], [10, 0, 0, 7]);
        let outcome = rewrite(&mut pkt, &policy, &engine()).await;
        assert_eq!(outcome, PacketOutcome::Drop);
    }

    #[tokio::test]
    async fn private_addresses_are_substituted() {
        let policy = PolicySet::new(true, true, vec![]);
        let mut pkt = tcp_packet([10, 0, 0, 5], [8, 8, 8, 8]);
        let outcome = rewrite(&mut pkt, &policy, &engine()).await;
        assert_eq!(outcome, PacketOutcome::Emit);
        assert_ne!(&pkt.out[26..30], &[10, 0, 0, 5]);
        assert_eq!(&pkt.out[30..34], &[8, 8, 8, 8]);
    }

    #[tokio::test]
    async fn non_handshake_tcp_payload_is_dropped_from_output() {
        let policy = PolicySet::new(true, false, vec![]);
        let mut pkt = tcp_packet([203, 0, 113, 1], [203, 0, 113, 2]);
        let original_len = pkt.raw.len();
        rewrite(&mut pkt, &policy, &engine()).await;
        assert!(pkt.out.len() < original_len);
    }

    #[tokio::test]
    async fn capture_length_never_shrinks() {
        let policy = PolicySet::new(true, false, vec![]);
        let mut pkt = tcp_packet([203, 0, 113, 1], [203, 0, 113, 2]);
        let before = pkt.info.capture_length;
        rewrite(&mut pkt, &policy, &engine()).await;
        assert!(pkt.info.capture_length >= before);
    }
}
