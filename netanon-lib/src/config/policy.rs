use serde::Deserialize;

fn default_true() -> bool {
    true
}

fn default_loop_time_hour() -> u32 {
    2
}

/// Controls the address-policy module and the key-rotation schedule.
#[derive(Debug, Deserialize, Clone)]
pub struct AnonymizationConfig {
    /// Master switch. When false, `should_anonymize` never fires and packets pass
    /// through with their original addresses (still subject to the drop policy, since
    /// `LocalBlocks` membership is independent of this flag).
    #[serde(default = "default_true")]
    pub anonymize: bool,
    /// Whether `PrivateBlocks` participates in `should_anonymize`.
    #[serde(default = "default_true")]
    pub anonymize_private: bool,
    /// Operator-declared `LocalBlocks`, as CIDR strings (e.g. "10.0.0.0/8").
    #[serde(default)]
    pub local_nets: Vec<String>,
    /// Local wall-clock hour (0-23) at which the address key rotates.
    #[serde(default = "default_loop_time_hour")]
    pub loop_time_hour: u32,
}

impl Default for AnonymizationConfig {
    fn default() -> Self {
        AnonymizationConfig {
            anonymize: true,
            anonymize_private: true,
            local_nets: Vec::new(),
            loop_time_hour: default_loop_time_hour(),
        }
    }
}
