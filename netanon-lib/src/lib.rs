#![forbid(unsafe_code)]

pub mod config;
pub mod crypto;
pub mod decode;
pub mod error;
pub mod packet;
pub mod policy;
pub mod rewrite;
pub mod sink;
pub mod stats;
pub mod telemetry;
pub mod worker;

pub use config::{load_from_path, Config};
pub use crypto::{AddressKey, CryptoPanEngine, KeyRotator};
pub use error::{AnonError, Result};
pub use packet::PacketRecord;
pub use policy::PolicySet;
pub use worker::Supervisor;
