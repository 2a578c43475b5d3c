use std::net::IpAddr;
use std::time::SystemTime;

use etherparse::{Ethernet2Header, Ipv4Header, Ipv6Header, SingleVlanHeader, TcpHeader, UdpHeader};

/// Per-packet capture metadata, independent of the capture backend.
#[derive(Debug, Clone, Copy)]
pub struct CaptureInfo {
    pub timestamp: SystemTime,
    pub capture_length: usize,
    pub original_length: usize,
    pub interface_index: i32,
}

impl Default for CaptureInfo {
    fn default() -> Self {
        CaptureInfo {
            timestamp: SystemTime::UNIX_EPOCH,
            capture_length: 0,
            original_length: 0,
            interface_index: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum IpLayer {
    V4(Ipv4Header),
    V6(Ipv6Header),
}

#[derive(Debug, Clone)]
pub enum TransportLayer {
    Tcp(TcpHeader),
    Udp(UdpHeader),
}

/// A byte range into `PacketRecord::raw`.
pub type Span = (usize, usize);

/// Mutable per-packet record. One instance is allocated per worker and reused across
/// every packet on that worker's pipeline (arena-of-one): `clear()` resets decode state
/// between packets, `raw` and `out` are overwritten in place rather than reallocated.
pub struct PacketRecord {
    pub raw: Vec<u8>,
    pub info: CaptureInfo,

    pub eth: Option<Ethernet2Header>,
    pub vlan: Option<SingleVlanHeader>,
    pub ip: Option<IpLayer>,
    pub transport: Option<TransportLayer>,
    /// The L4 payload byte range within `raw`.
    pub payload: Span,

    pub is_ipv4: bool,
    pub is_ipv6: bool,
    pub is_tcp: bool,
    pub is_udp: bool,
    pub is_dns: bool,

    pub src_ip: Option<IpAddr>,
    pub dst_ip: Option<IpAddr>,
    pub src_port: u16,
    pub dst_port: u16,

    /// Output serialization buffer, innermost-first then reversed into wire order.
    pub out: Vec<u8>,
}

impl Default for PacketRecord {
    fn default() -> Self {
        PacketRecord {
            raw: Vec::with_capacity(2048),
            info: CaptureInfo::default(),
            eth: None,
            vlan: None,
            ip: None,
            transport: None,
            payload: (0, 0),
            is_ipv4: false,
            is_ipv6: false,
            is_tcp: false,
            is_udp: false,
            is_dns: false,
            src_ip: None,
            dst_ip: None,
            src_port: 0,
            dst_port: 0,
            out: Vec::with_capacity(2048),
        }
    }
}

impl PacketRecord {
    pub fn new() -> Self {
        PacketRecord::default()
    }

    /// Resets decode state ahead of decoding the next packet. `raw` is left alone — the
    /// caller overwrites it with the freshly captured bytes before decoding.
    pub fn clear(&mut self) {
        self.info = CaptureInfo::default();
        self.eth = None;
        self.vlan = None;
        self.ip = None;
        self.transport = None;
        self.payload = (0, 0);
        self.clear_bool();
        self.src_ip = None;
        self.dst_ip = None;
        self.src_port = 0;
        self.dst_port = 0;
    }

    pub fn clear_bool(&mut self) {
        self.is_ipv4 = false;
        self.is_ipv6 = false;
        self.is_tcp = false;
        self.is_udp = false;
        self.is_dns = false;
    }

    pub fn clear_out(&mut self) {
        self.out.clear();
    }

    pub fn payload_bytes(&self) -> &[u8] {
        let (start, len) = self.payload;
        &self.raw[start..start + len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_resets_decode_state_but_not_raw() {
        let mut pkt = PacketRecord::new();
        pkt.raw = vec![1, 2, 3, 4];
        pkt.is_tcp = true;
        pkt.src_ip = Some("10.0.0.1".parse().unwrap());
        pkt.clear();
        assert!(!pkt.is_tcp);
        assert!(pkt.src_ip.is_none());
        assert_eq!(pkt.raw, vec![1, 2, 3, 4]);
    }

    #[test]
    fn payload_bytes_reads_the_recorded_span() {
        let mut pkt = PacketRecord::new();
        pkt.raw = vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE];
        pkt.payload = (1, 3);
        assert_eq!(pkt.payload_bytes(), &[0xBB, 0xCC, 0xDD]);
    }
}
