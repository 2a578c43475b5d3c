mod af_packet;
mod datagram;
mod live;
mod null;
mod pcap_file_handle;
mod rotating;

pub use af_packet::AfPacketHandle;
pub use datagram::{DatagramSocketHandle, DecapsulateHandle};
pub use live::LivePcapHandle;
pub use null::NullHandle;
pub use pcap_file_handle::PcapFileHandle;
pub use rotating::RotatingPcapHandle;

use async_trait::async_trait;

use crate::error::Result;
use crate::packet::PacketRecord;

/// Counters a capture handle can report to the stats sampler. Backends that cannot
/// track a given counter (e.g. a write-only sink has no `received`) leave it at zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct HandleStats {
    pub received: u64,
    pub dropped: u64,
    pub written: u64,
}

/// Uniform contract every input/output backend implements. Input handles only use
/// `read_packet`, output handles only use `write_packet`; a handle that is only ever
/// used one way may return `Ok(None)`/no-op for the other.
#[async_trait]
pub trait CaptureHandle: Send + Sync {
    /// Reads the next captured frame into `pkt`, overwriting `pkt.raw` and `pkt.info`.
    /// Returns `Ok(false)` on clean end-of-stream (file sinks only; live sinks never
    /// return it).
    async fn read_packet(&mut self, pkt: &mut PacketRecord) -> Result<bool>;

    /// Emits `pkt.out` (the rewritten frame) through this sink.
    async fn write_packet(&mut self, pkt: &PacketRecord) -> Result<()>;

    fn stats(&self) -> HandleStats;

    async fn close(&mut self) -> Result<()>;
}
