use std::path::Path;
use std::time::Duration;

use netanon_lib::sink::{CaptureHandle, RotatingPcapHandle};
use netanon_lib::PacketRecord;

// Mirrors rotating.rs's LANE_CAPACITY; not exported since only this test needs it.
const LANE_CAPACITY: usize = 32768;

fn finalized_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".pcap"))
        .count()
}

#[tokio::test]
async fn swaps_lane_and_finalizes_file_after_rotation_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let basename = dir.path().join("capture").to_string_lossy().to_string();
    let mut handle = RotatingPcapHandle::new(&basename, Duration::from_millis(20));

    let mut pkt = PacketRecord::new();
    pkt.out = vec![1, 2, 3];
    pkt.info.capture_length = 3;

    handle.write_packet(&pkt).await.unwrap();
    assert_eq!(finalized_files(dir.path()), 0);

    tokio::time::sleep(Duration::from_millis(30)).await;
    handle.write_packet(&pkt).await.unwrap();
    // give the lane task a moment to drain, rename and reopen
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(finalized_files(dir.path()), 1);

    handle.close().await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    // close() stops both lanes: the one mid-swap (now holding the second-period file)
    // and the other (still on its original file), finalizing one file apiece.
    assert_eq!(finalized_files(dir.path()), 3);
}

#[tokio::test]
async fn write_failures_surface_as_fatal_on_overflow() {
    let dir = tempfile::tempdir().unwrap();
    let basename = dir.path().join("capture").to_string_lossy().to_string();
    let mut handle = RotatingPcapHandle::new(&basename, Duration::from_secs(3600));

    let mut pkt = PacketRecord::new();
    pkt.out = vec![0u8; 4];
    pkt.info.capture_length = 4;

    for _ in 0..LANE_CAPACITY {
        handle.write_packet(&pkt).await.unwrap();
    }
    assert!(handle.write_packet(&pkt).await.is_err());
    handle.close().await.unwrap();
}
