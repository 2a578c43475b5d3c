use async_trait::async_trait;

use super::{CaptureHandle, HandleStats};
use crate::error::Result;
use crate::packet::PacketRecord;

/// Discards every packet written to it. Used for the `drop` output driver and in tests
/// that only care about the rewriter's decision, not the bytes it produces.
#[derive(Default)]
pub struct NullHandle {
    stats: HandleStats,
}

impl NullHandle {
    pub fn new() -> Self {
        NullHandle::default()
    }
}

#[async_trait]
impl CaptureHandle for NullHandle {
    async fn read_packet(&mut self, _pkt: &mut PacketRecord) -> Result<bool> {
        Ok(false)
    }

    async fn write_packet(&mut self, _pkt: &PacketRecord) -> Result<()> {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_writes_without_storing_them() {
        let mut handle = NullHandle::new();
        let pkt = PacketRecord::new();
        handle.write_packet(&pkt).await.unwrap();
        handle.write_packet(&pkt).await.unwrap();
        assert_eq!(handle.stats().written, 2);
    }
}
