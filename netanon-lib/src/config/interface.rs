use serde::Deserialize;

fn default_snap_len() -> u32 {
    1600
}

fn default_cluster_n() -> u32 {
    1
}

fn default_rotate_seconds() -> u64 {
    3600
}

/// One configured capture input. Driver names match the twelve backend kinds in §6:
/// `pcapread`, `ringread`, `afpacketread`, `fileread`, `socketread`.
#[derive(Debug, Deserialize, Clone)]
pub struct InputInterfaceConfig {
    pub driver: String,
    /// Interface name, file path, or `host:port`, depending on `driver`.
    pub name: String,
    /// Path to a BPF filter file (plain-text libpcap filter expression). Optional.
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default = "default_snap_len")]
    pub snap_len: u32,
    #[serde(default)]
    pub clustered: bool,
    #[serde(default)]
    pub cluster_id: u32,
    /// Number of pipeline instances to spawn for this input when `clustered` and the
    /// driver is `ringread` (PF_RING-style fan-out).
    #[serde(default = "default_cluster_n")]
    pub cluster_n: u32,
    #[serde(default)]
    pub zero_copy: bool,
    #[serde(default)]
    pub fan_out: bool,
}

/// The single configured emit sink. Driver names: `pcapwrite`, `ringwrite`,
/// `afpacketwrite`, `filewrite`, `filebufferedwrite`, `socketwrite`,
/// `socketbufferedwrite`, or `drop`.
#[derive(Debug, Deserialize, Clone)]
pub struct OutputInterfaceConfig {
    pub driver: String,
    pub name: String,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default = "default_snap_len")]
    pub snap_len: u32,
    /// Rotation cycle length for `filebufferedwrite`. Ignored by other drivers.
    #[serde(default = "default_rotate_seconds")]
    pub rotate_seconds: u64,
}
