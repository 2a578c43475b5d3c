use serde::Deserialize;

use super::interface::{InputInterfaceConfig, OutputInterfaceConfig};
use super::policy::AnonymizationConfig;
use super::telemetry::{LoggingConfig, TelemetryConfig};

/// Root configuration document for the `netanon` binary.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub anonymization: AnonymizationConfig,
    /// At least one input interface is required.
    pub inputs: Vec<InputInterfaceConfig>,
    pub output: OutputInterfaceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
