mod interface;
mod loader;
mod policy;
mod root;
mod telemetry;

pub use interface::{InputInterfaceConfig, OutputInterfaceConfig};
pub use loader::{load_from_path, parse_local_nets, DEFAULT_CONFIG_PATHS};
pub use policy::AnonymizationConfig;
pub use root::Config;
pub use telemetry::{LoggingConfig, TelemetryConfig};
