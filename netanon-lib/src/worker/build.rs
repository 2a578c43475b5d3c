use std::time::Duration;

use crate::config::{InputInterfaceConfig, OutputInterfaceConfig};
use crate::error::{AnonError, Result};
use crate::sink::{AfPacketHandle, CaptureHandle, DatagramSocketHandle, DecapsulateHandle, LivePcapHandle, NullHandle, PcapFileHandle, RotatingPcapHandle};

/// Maps an `InputInterfaceConfig`'s `driver` field to a concrete capture backend.
pub async fn build_input(cfg: &InputInterfaceConfig) -> Result<Box<dyn CaptureHandle>> {
    let handle: Box<dyn CaptureHandle> = match cfg.driver.as_str() {
        "fileread" => Box::new(PcapFileHandle::open_read(&cfg.name)?),
        "pcapread" => Box::new(LivePcapHandle::open(&cfg.name, cfg.snap_len, cfg.filter.as_deref())?),
        "ringread" | "afpacketread" => {
            Box::new(AfPacketHandle::bind(&cfg.name, cfg.clustered, cfg.snap_len, cfg.filter.as_deref())?)
        }
        "socketread" => Box::new(DecapsulateHandle::bind(&cfg.name).await?),
        other => return Err(AnonError::UnknownDriver(other.to_string())),
    };
    Ok(handle)
}

/// Maps an `OutputInterfaceConfig`'s `driver` field to a concrete emit backend.
pub async fn build_output(cfg: &OutputInterfaceConfig) -> Result<Box<dyn CaptureHandle>> {
    let handle: Box<dyn CaptureHandle> = match cfg.driver.as_str() {
        "filewrite" => Box::new(PcapFileHandle::open_write(&cfg.name)?),
        "filebufferedwrite" => {
            Box::new(RotatingPcapHandle::new(&cfg.name, Duration::from_secs(cfg.rotate_seconds)))
        }
        "pcapwrite" => Box::new(LivePcapHandle::open(&cfg.name, cfg.snap_len, cfg.filter.as_deref())?),
        "ringwrite" | "afpacketwrite" => {
            Box::new(AfPacketHandle::bind(&cfg.name, false, cfg.snap_len, cfg.filter.as_deref())?)
        }
        "socketwrite" | "socketbufferedwrite" => Box::new(DatagramSocketHandle::connect(&cfg.name).await?),
        "drop" => Box::new(NullHandle::new()),
        other => return Err(AnonError::UnknownDriver(other.to_string())),
    };
    Ok(handle)
}
