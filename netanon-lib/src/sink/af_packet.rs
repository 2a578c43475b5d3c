use std::io::{Read, Write};

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::task;

use super::{CaptureHandle, HandleStats};
use crate::error::{AnonError, Result};
use crate::packet::PacketRecord;

/// Compiles a libpcap filter expression against a `Dead` (device-less) capture and
/// applies it to an arbitrary byte buffer. Used to give a raw socket the same
/// filter-compile primitive `LivePcapHandle` gets from an open `Capture`, since
/// `socket2::Socket` has no filtering of its own.
fn compile_filter(expr: &str, snap_len: i32) -> std::io::Result<pcap::BpfProgram> {
    let dead = pcap::Capture::dead(pcap::Linktype::ETHERNET, snap_len)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    dead.compile(expr, true).map_err(|e| std::io::Error::other(e.to_string()))
}

/// AF_PACKET-style raw socket bound to one interface. When `clustered` is set,
/// `SO_REUSEPORT` is enabled so the kernel load-balances incoming frames across every
/// process/thread bound to the same interface with the option set, approximating
/// PF_RING's clustering without a PF_RING kernel module.
pub struct AfPacketHandle {
    socket: Socket,
    snap_len: i32,
    filter: Option<String>,
    stats: HandleStats,
}

impl AfPacketHandle {
    pub fn bind(interface: &str, clustered: bool, snap_len: u32, filter: Option<&str>) -> Result<Self> {
        let domain = Domain::for_address("0.0.0.0:0".parse::<std::net::SocketAddr>().unwrap());
        let socket = Socket::new(domain, Type::RAW, Some(Protocol::from(libc::IPPROTO_RAW)))
            .map_err(|e| AnonError::CaptureInit(format!("raw socket creation failed: {e}")))?;

        if clustered {
            socket
                .set_reuse_port(true)
                .map_err(|e| AnonError::CaptureInit(format!("SO_REUSEPORT failed: {e}")))?;
        }

        socket
            .bind_device(Some(interface.as_bytes()))
            .map_err(|e| AnonError::CaptureInit(format!("bind to {interface} failed: {e}")))?;

        socket
            .set_nonblocking(true)
            .map_err(|e| AnonError::CaptureInit(e.to_string()))?;

        // Compiled once up front just to reject a bad expression at startup; the
        // compiled program itself is not Send, so each read recompiles it on the
        // blocking thread rather than holding it across an await point.
        if let Some(expr) = filter {
            compile_filter(expr, snap_len as i32)
                .map_err(|e| AnonError::CaptureInit(format!("BPF filter compile failed: {e}")))?;
        }

        Ok(AfPacketHandle {
            socket,
            snap_len: snap_len as i32,
            filter: filter.map(str::to_string),
            stats: HandleStats::default(),
        })
    }
}

#[async_trait]
impl CaptureHandle for AfPacketHandle {
    async fn read_packet(&mut self, pkt: &mut PacketRecord) -> Result<bool> {
        let mut socket = self.socket.try_clone().map_err(|e| AnonError::CaptureInit(e.to_string()))?;
        let filter = self.filter.clone();
        let snap_len = self.snap_len;
        let (n, data) = task::spawn_blocking(move || -> std::io::Result<(usize, Vec<u8>)> {
            let program = filter.as_deref().map(|expr| compile_filter(expr, snap_len)).transpose()?;
            loop {
                let mut buf = vec![0u8; 65536];
                let n = socket.read(&mut buf)?;
                buf.truncate(n);
                if let Some(prog) = &program {
                    if !prog.filter(&buf) {
                        continue;
                    }
                }
                return Ok((n, buf));
            }
        })
        .await
        .map_err(|e| AnonError::CaptureInit(e.to_string()))?
        .map_err(AnonError::Io)?;

        pkt.raw.clear();
        pkt.raw.extend_from_slice(&data);
        pkt.info.capture_length = n;
        pkt.info.original_length = n;
        pkt.info.timestamp = std::time::SystemTime::now();
        self.stats.received += 1;
        Ok(true)
    }

    async fn write_packet(&mut self, pkt: &PacketRecord) -> Result<()> {
        let mut socket = self.socket.try_clone().map_err(|e| AnonError::CaptureInit(e.to_string()))?;
        let data = pkt.out.clone();
        task::spawn_blocking(move || socket.write_all(&data))
            .await
            .map_err(|e| AnonError::CaptureInit(e.to_string()))?
            .map_err(AnonError::Io)?;
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
