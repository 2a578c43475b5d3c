mod record;

pub use record::{CaptureInfo, IpLayer, PacketRecord, TransportLayer};
