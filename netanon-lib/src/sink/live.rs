use async_trait::async_trait;
use pcap::{Active, Capture};
use tokio::task;

use super::{CaptureHandle, HandleStats};
use crate::error::{AnonError, Result};
use crate::packet::PacketRecord;

/// Live capture off a real NIC via libpcap. Blocking `pcap` calls run on a blocking
/// thread so they never stall the async runtime.
pub struct LivePcapHandle {
    capture: Option<Capture<Active>>,
    stats: HandleStats,
}

impl LivePcapHandle {
    pub fn open(device: &str, snap_len: u32, filter: Option<&str>) -> Result<Self> {
        let mut cap = Capture::from_device(device)
            .map_err(|e| AnonError::CaptureInit(e.to_string()))?
            .snaplen(snap_len as i32)
            .promisc(true)
            .immediate_mode(true)
            .open()
            .map_err(|e| AnonError::CaptureInit(e.to_string()))?;

        if let Some(expr) = filter {
            cap.filter(expr, true).map_err(|e| AnonError::CaptureInit(e.to_string()))?;
        }

        Ok(LivePcapHandle { capture: Some(cap), stats: HandleStats::default() })
    }
}

#[async_trait]
impl CaptureHandle for LivePcapHandle {
    async fn read_packet(&mut self, pkt: &mut PacketRecord) -> Result<bool> {
        let mut cap = self.capture.take().ok_or_else(|| {
            AnonError::CaptureInit("live handle closed".into())
        })?;

        let (cap, result) = task::spawn_blocking(move || {
            let result = cap
                .next_packet()
                .map(|p| (p.header.ts, p.header.len, p.data.to_vec()))
                .map_err(|e| e.to_string());
            (cap, result)
        })
        .await
        .map_err(|e| AnonError::CaptureInit(e.to_string()))?;

        self.capture = Some(cap);

        match result {
            Ok((ts, original_len, data)) => {
                pkt.raw.clear();
                pkt.raw.extend_from_slice(&data);
                pkt.info.capture_length = data.len();
                pkt.info.original_length = original_len as usize;
                pkt.info.timestamp = std::time::UNIX_EPOCH
                    + std::time::Duration::new(ts.tv_sec as u64, (ts.tv_usec as u32) * 1000);
                self.stats.received += 1;
                Ok(true)
            }
            Err(e) => Err(AnonError::CaptureInit(e)),
        }
    }

    async fn write_packet(&mut self, pkt: &PacketRecord) -> Result<()> {
        let mut cap = self.capture.take().ok_or_else(|| {
            AnonError::CaptureInit("live handle closed".into())
        })?;
        let data = pkt.out.clone();
        let (cap, result) = task::spawn_blocking(move || {
            let result = cap.sendpacket(data.as_slice()).map_err(|e| e.to_string());
            (cap, result)
        })
        .await
        .map_err(|e| AnonError::CaptureInit(e.to_string()))?;
        self.capture = Some(cap);
        result.map_err(AnonError::CaptureInit)?;
        self.stats.written += 1;
        Ok(())
    }

    fn stats(&self) -> HandleStats {
        self.stats
    }

    async fn close(&mut self) -> Result<()> {
        self.capture = None;
        Ok(())
    }
}
