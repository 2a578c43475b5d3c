use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::pcap_file_handle::PcapFileHandle;
use super::{CaptureHandle, HandleStats};
use crate::error::{AnonError, Result};
use crate::packet::PacketRecord;

const LANE_CAPACITY: usize = 32768;

enum LaneMsg {
    Packet { data: Vec<u8>, original_len: u32, timestamp: SystemTime },
    Swap,
    Stop,
}

/// In-progress lane files carry no suffix; that absence is the caller-visible marker
/// that the file is still being written. `finalize` appends `.pcap` once the lane closes
/// it.
fn lane_path(basename: &str, offset: Duration) -> PathBuf {
    let now: chrono::DateTime<chrono::Local> = (SystemTime::now() + offset).into();
    PathBuf::from(format!("{basename}_{}", now.format("%Y-%m-%d_%H:%M:%S")))
}

async fn run_lane(basename: String, rotate_period: Duration, offset: Duration, mut rx: mpsc::Receiver<LaneMsg>) {
    let mut path = lane_path(&basename, offset);
    let mut writer = PcapFileHandle::open_write(path.to_string_lossy().as_ref()).ok();

    while let Some(msg) = rx.recv().await {
        match msg {
            LaneMsg::Packet { data, original_len, timestamp } => {
                let Some(w) = writer.as_mut() else { continue };
                let mut pkt = PacketRecord::new();
                pkt.out = data;
                pkt.info.capture_length = original_len as usize;
                pkt.info.timestamp = timestamp;
                if let Err(e) = w.write_packet(&pkt).await {
                    tracing::warn!(error = %e, "rotating sink: write failed");
                }
            }
            LaneMsg::Swap => {
                writer = None;
                finalize(&path);
                path = lane_path(&basename, offset);
                writer = PcapFileHandle::open_write(path.to_string_lossy().as_ref()).ok();
            }
            LaneMsg::Stop => {
                writer = None;
                finalize(&path);
                return;
            }
        }
    }
}

fn finalize(in_progress_path: &PathBuf) {
    let final_path = PathBuf::from(format!("{}.pcap", in_progress_path.display()));
    if let Err(e) = std::fs::rename(in_progress_path, &final_path) {
        tracing::error!(error = %e, path = %in_progress_path.display(), "rotating sink: finalize rename failed");
    }
}

/// Dual-lane rotating pcap-ng writer. While lane A is the active destination for new
/// packets, lane B already has a file open and named for the *next* rotation period
/// (the "primed next-period lane"). At the rotation deadline the active lane is told to
/// drain its buffered packets, close and rename its file, then prepare a file for the
/// period after next; the roles of the two lanes then swap.
///
/// Each lane's buffer holds at most [`LANE_CAPACITY`] pending packets. A lane that falls
/// behind at capacity is a fatal error rather than silently dropping traffic.
pub struct RotatingPcapHandle {
    lanes: [mpsc::Sender<LaneMsg>; 2],
    current: usize,
    deadline: Instant,
    rotate_period: Duration,
    stats: HandleStats,
}

impl RotatingPcapHandle {
    pub fn new(basename: &str, rotate_period: Duration) -> Self {
        let (tx0, rx0) = mpsc::channel(LANE_CAPACITY);
        let (tx1, rx1) = mpsc::channel(LANE_CAPACITY);
        tokio::spawn(run_lane(basename.to_string(), rotate_period, Duration::ZERO, rx0));
        tokio::spawn(run_lane(basename.to_string(), rotate_period, rotate_period, rx1));
        RotatingPcapHandle {
            lanes: [tx0, tx1],
            current: 0,
            deadline: Instant::now() + rotate_period,
            rotate_period,
            stats: HandleStats::default(),
        }
    }
}

#[async_trait]
impl CaptureHandle for RotatingPcapHandle {
    async fn read_packet(&mut self, _pkt: &mut PacketRecord) -> Result<bool> {
        Ok(false)
    }

    async fn write_packet(&mut self, pkt: &PacketRecord) -> Result<()> {
        let now = Instant::now();
        if now >= self.deadline {
            self.lanes[self.current]
                .send(LaneMsg::Swap)
                .await
                .map_err(|_| AnonError::SinkFatal("rotating sink: lane task gone".into()))?;
            self.current = (self.current + 1) % 2;
            self.deadline = now + self.rotate_period;
        }

        let msg = LaneMsg::Packet {
            data: pkt.out.clone(),
            original_len: pkt.info.capture_length as u32,
            timestamp: pkt.info.timestamp,
        };
        self.lanes[self.current].try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                AnonError::SinkFatal("rotating sink: lane buffer overflow".into())
            }
            mpsc::error::TrySendError::Closed(_) => {
                AnonError::SinkFatal("rotating sink: lane task gone".into())
            }
        })?;
        self.stats.written += 1;
        Ok(())
    }

    fn stats(&self) -> HandleStats {
        self.stats
    }

    async fn close(&mut self) -> Result<()> {
        for lane in &self.lanes {
            let _ = lane.send(LaneMsg::Stop).await;
        }
        Ok(())
    }
}
