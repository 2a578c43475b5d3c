use std::fs;
use std::path::Path;

use ipnet::IpNet;

use crate::config::Config;
use crate::error::{AnonError, Result};

/// Default config path fallback order, matching the original's documented default
/// directory (`/opt/traffic-anonymization/config/`, here `/opt/netanon/config/`).
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["./config.toml", "/opt/netanon/config/config.toml"];

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| AnonError::Config(format!("failed to read config file: {e}")))?;
    let cfg: Config =
        toml::from_str(&txt).map_err(|e| AnonError::Config(format!("failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &Config) -> Result<()> {
    if cfg.inputs.is_empty() {
        return Err(AnonError::Config("at least one input interface is required".into()));
    }

    for net in &cfg.anonymization.local_nets {
        net.parse::<IpNet>()
            .map_err(|e| AnonError::Config(format!("invalid local_nets entry {net:?}: {e}")))?;
    }

    if !(0..24).contains(&cfg.anonymization.loop_time_hour) {
        return Err(AnonError::Config(format!(
            "loop_time_hour must be in 0..24, got {}",
            cfg.anonymization.loop_time_hour
        )));
    }

    for input in &cfg.inputs {
        check_driver(&input.driver)?;
        if let Some(filter) = &input.filter {
            if !Path::new(filter).exists() {
                return Err(AnonError::Config(format!("filter file not found: {filter}")));
            }
        }
    }
    check_driver(&cfg.output.driver)?;

    Ok(())
}

fn check_driver(driver: &str) -> Result<()> {
    const KNOWN: &[&str] = &[
        "pcapread",
        "pcapwrite",
        "ringread",
        "ringwrite",
        "afpacketread",
        "afpacketwrite",
        "fileread",
        "filewrite",
        "socketread",
        "socketwrite",
        "socketbufferedwrite",
        "filebufferedwrite",
        "drop",
    ];
    if KNOWN.contains(&driver) {
        Ok(())
    } else {
        Err(AnonError::Config(format!("unknown driver {driver:?}")))
    }
}

/// Shared by `policy::PolicySet::from_config` so the CIDR parse path is validated once.
pub fn parse_local_nets(nets: &[String]) -> Result<Vec<IpNet>> {
    nets.iter()
        .map(|s| s.parse::<IpNet>().map_err(|e| AnonError::Config(format!("{s}: {e}"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rejects_empty_inputs() {
        let toml = r#"
            [output]
            driver = "drop"
            name = "x"
        "#;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{toml}").unwrap();
        let err = load_from_path(f.path()).unwrap_err();
        assert!(matches!(err, AnonError::Config(_)));
    }

    #[test]
    fn rejects_unknown_driver() {
        let toml = r#"
            [[inputs]]
            driver = "not-a-real-driver"
            name = "x"

            [output]
            driver = "drop"
            name = "y"
        "#;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{toml}").unwrap();
        let err = load_from_path(f.path()).unwrap_err();
        assert!(matches!(err, AnonError::Config(_)));
    }

    #[test]
    fn loads_minimal_valid_config() {
        let toml = r#"
            [anonymization]
            local_nets = ["10.0.0.0/8"]

            [[inputs]]
            driver = "fileread"
            name = "capture.pcapng"

            [output]
            driver = "filewrite"
            name = "out.pcapng"
        "#;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{toml}").unwrap();
        let cfg = load_from_path(f.path()).unwrap();
        assert_eq!(cfg.inputs.len(), 1);
        assert_eq!(cfg.anonymization.local_nets, vec!["10.0.0.0/8".to_string()]);
    }
}
