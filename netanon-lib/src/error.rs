use thiserror::Error;

/// Process-fatal errors: configuration problems, capture-handle setup failures, and
/// key material that could not be constructed. Per-packet errors never reach this type.
#[derive(Error, Debug)]
pub enum AnonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid address key: expected 32 bytes")]
    BadKey,

    #[error("key rotation failed: {0}")]
    KeyRotation(String),

    #[error("capture handle initialization failed: {0}")]
    CaptureInit(String),

    #[error("unknown capture backend driver: {0}")]
    UnknownDriver(String),

    /// A sink write failed in a way that cannot be recovered by skipping the packet:
    /// the backend itself is broken (a rotation lane died, a rename failed). Distinct
    /// from a single dropped write, which is logged and skipped.
    #[error("sink fatal error: {0}")]
    SinkFatal(String),
}

pub type Result<T> = std::result::Result<T, AnonError>;
