use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::net::UdpSocket;

use super::{CaptureHandle, HandleStats};
use crate::error::{AnonError, Result};
use crate::packet::PacketRecord;

const TIMESTAMP_PREFIX_LEN: usize = 8;

/// Tunnels rewritten frames to a remote collector over UDP. Each datagram is the
/// capture timestamp as an 8-byte big-endian nanosecond count since the Unix epoch,
/// followed by the frame bytes.
pub struct DatagramSocketHandle {
    socket: UdpSocket,
    stats: HandleStats,
}

impl DatagramSocketHandle {
    pub async fn connect(remote: &str) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(AnonError::Io)?;
        socket.connect(remote).await.map_err(AnonError::Io)?;
        Ok(DatagramSocketHandle { socket, stats: HandleStats::default() })
    }
}

#[async_trait]
impl CaptureHandle for DatagramSocketHandle {
    async fn read_packet(&mut self, _pkt: &mut PacketRecord) -> Result<bool> {
        Ok(false)
    }

    async fn write_packet(&mut self, pkt: &PacketRecord) -> Result<()> {
        let nanos = pkt
            .info
            .timestamp
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_nanos() as u64;

        let mut datagram = Vec::with_capacity(TIMESTAMP_PREFIX_LEN + pkt.out.len());
        datagram.extend_from_slice(&nanos.to_be_bytes());
        datagram.extend_from_slice(&pkt.out);

        self.socket.send(&datagram).await.map_err(AnonError::Io)?;
        self.stats.written += 1;
        Ok(())
    }

    fn stats(&self) -> HandleStats {
        self.stats
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Inverse of [`DatagramSocketHandle`]: the receiving end that strips the timestamp
/// prefix and hands the original frame back for decapsulation into a plain capture
/// file. A malformed (too-short) datagram is a soft failure: the frame is kept and the
/// capture clock is used for its timestamp instead of failing the whole stream.
pub struct DecapsulateHandle {
    socket: UdpSocket,
    recv_buf: Vec<u8>,
    stats: HandleStats,
}

impl DecapsulateHandle {
    pub async fn bind(local: &str) -> Result<Self> {
        let socket = UdpSocket::bind(local).await.map_err(AnonError::Io)?;
        Ok(DecapsulateHandle { socket, recv_buf: vec![0u8; 65536], stats: HandleStats::default() })
    }
}

#[async_trait]
impl CaptureHandle for DecapsulateHandle {
    async fn read_packet(&mut self, pkt: &mut PacketRecord) -> Result<bool> {
        let n = self.socket.recv(&mut self.recv_buf).await.map_err(AnonError::Io)?;
        let datagram = &self.recv_buf[..n];

        if datagram.len() < TIMESTAMP_PREFIX_LEN {
            tracing::debug!("decapsulate: datagram shorter than timestamp prefix, keeping capture clock");
            pkt.raw.clear();
            pkt.raw.extend_from_slice(datagram);
            pkt.info.timestamp = SystemTime::now();
        } else {
            let nanos = u64::from_be_bytes(datagram[..TIMESTAMP_PREFIX_LEN].try_into().unwrap());
            pkt.raw.clear();
            pkt.raw.extend_from_slice(&datagram[TIMESTAMP_PREFIX_LEN..]);
            pkt.info.timestamp = UNIX_EPOCH + Duration::from_nanos(nanos);
        }
        pkt.info.capture_length = pkt.raw.len();
        pkt.info.original_length = pkt.raw.len();
        self.stats.received += 1;
        Ok(true)
    }

    async fn write_packet(&mut self, _pkt: &PacketRecord) -> Result<()> {
        Ok(())
    }

    fn stats(&self) -> HandleStats {
        self.stats
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tunnel_round_trip_preserves_timestamp_and_bytes() {
        let receiver = DecapsulateHandle::bind("127.0.0.1:0").await.unwrap();
        let local_addr = receiver.socket.local_addr().unwrap();
        let mut receiver = receiver;

        let mut sender = DatagramSocketHandle::connect(&local_addr.to_string()).await.unwrap();

        let mut pkt = PacketRecord::new();
        pkt.out = vec![1, 2, 3, 4, 5];
        pkt.info.timestamp = UNIX_EPOCH + Duration::from_nanos(123_456_789);

        sender.write_packet(&pkt).await.unwrap();

        let mut received = PacketRecord::new();
        receiver.read_packet(&mut received).await.unwrap();

        assert_eq!(received.raw, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            received.info.timestamp.duration_since(UNIX_EPOCH).unwrap().as_nanos(),
            123_456_789
        );
    }

    #[tokio::test]
    async fn short_datagram_keeps_capture_clock() {
        let mut receiver = DecapsulateHandle::bind("127.0.0.1:0").await.unwrap();
        let local_addr = receiver.socket.local_addr().unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.connect(local_addr).await.unwrap();
        client.send(&[1, 2, 3]).await.unwrap();

        let mut pkt = PacketRecord::new();
        let before = SystemTime::now();
        receiver.read_packet(&mut pkt).await.unwrap();
        assert_eq!(pkt.raw, vec![1, 2, 3]);
        assert!(pkt.info.timestamp >= before);
    }
}
