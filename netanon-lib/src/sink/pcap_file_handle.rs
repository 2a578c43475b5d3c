use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::time::Duration;

use async_trait::async_trait;
use pcap_file::pcapng::blocks::enhanced_packet::EnhancedPacketBlock;
use pcap_file::pcapng::{Block, PcapNgReader, PcapNgWriter};

use super::{CaptureHandle, HandleStats};
use crate::error::{AnonError, Result};
use crate::packet::PacketRecord;

enum Mode {
    Read(PcapNgReader<BufReader<File>>),
    Write(PcapNgWriter<BufWriter<File>>),
}

/// Plain pcap-ng file sink: either an input that replays a capture file, or an output
/// that appends enhanced packet blocks to a single file with no rotation.
pub struct PcapFileHandle {
    mode: Mode,
    stats: HandleStats,
}

impl PcapFileHandle {
    pub fn open_read(path: &str) -> Result<Self> {
        let file = File::open(path).map_err(AnonError::Io)?;
        let reader = PcapNgReader::new(BufReader::new(file))
            .map_err(|e| AnonError::CaptureInit(format!("{path}: {e}")))?;
        Ok(PcapFileHandle { mode: Mode::Read(reader), stats: HandleStats::default() })
    }

    pub fn open_write(path: &str) -> Result<Self> {
        let file = File::create(path).map_err(AnonError::Io)?;
        let writer = PcapNgWriter::new(BufWriter::new(file))
            .map_err(|e| AnonError::CaptureInit(format!("{path}: {e}")))?;
        Ok(PcapFileHandle { mode: Mode::Write(writer), stats: HandleStats::default() })
    }
}

#[async_trait]
impl CaptureHandle for PcapFileHandle {
    async fn read_packet(&mut self, pkt: &mut PacketRecord) -> Result<bool> {
        let Mode::Read(reader) = &mut self.mode else {
            return Err(AnonError::CaptureInit("handle not opened for reading".into()));
        };
        match reader.next_block() {
            Some(Ok(Block::EnhancedPacket(epb))) => {
                pkt.raw.clear();
                pkt.raw.extend_from_slice(&epb.data);
                pkt.info.capture_length = epb.data.len();
                pkt.info.original_length = epb.original_len as usize;
                pkt.info.timestamp = std::time::UNIX_EPOCH + epb.timestamp;
                self.stats.received += 1;
                Ok(true)
            }
            Some(Ok(_)) => Box::pin(self.read_packet(pkt)).await,
            Some(Err(e)) => Err(AnonError::CaptureInit(e.to_string())),
            None => Ok(false),
        }
    }

    async fn write_packet(&mut self, pkt: &PacketRecord) -> Result<()> {
        let Mode::Write(writer) = &mut self.mode else {
            return Err(AnonError::CaptureInit("handle not opened for writing".into()));
        };
        let epb = EnhancedPacketBlock {
            interface_id: 0,
            timestamp: pkt
                .info
                .timestamp
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or(Duration::ZERO),
            original_len: pkt.info.original_length as u32,
            data: Cow::Borrowed(&pkt.out),
        };
        writer
            .write_block(&Block::EnhancedPacket(epb))
            .map_err(|e| AnonError::CaptureInit(e.to_string()))?;
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
