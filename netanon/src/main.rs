#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::Parser;
use netanon_lib::config::{load_from_path, DEFAULT_CONFIG_PATHS};
use netanon_lib::telemetry::init_tracing;
use netanon_lib::worker::Supervisor;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inline network-traffic anonymizer")]
struct Cli {
    /// Path to configuration TOML file. Falls back to `./config.toml`, then
    /// `/opt/netanon/config/config.toml`.
    #[arg(short, long, value_name = "FILE")]
    conf: Option<PathBuf>,

    #[arg(short = 'd', long, conflicts_with_all = ["info", "warn", "error"])]
    debug: bool,
    #[arg(short, long, conflicts_with_all = ["debug", "warn", "error"])]
    info: bool,
    #[arg(short, long, conflicts_with_all = ["debug", "info", "error"])]
    warn: bool,
    #[arg(short, long, conflicts_with_all = ["debug", "info", "warn"])]
    error: bool,
}

impl Cli {
    fn level_override(&self) -> Option<&'static str> {
        if self.debug {
            Some("debug")
        } else if self.info {
            Some("info")
        } else if self.warn {
            Some("warn")
        } else if self.error {
            Some("error")
        } else {
            None
        }
    }

    fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.conf {
            return path.clone();
        }
        for candidate in DEFAULT_CONFIG_PATHS {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return path;
            }
        }
        PathBuf::from(DEFAULT_CONFIG_PATHS[0])
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let path = cli.config_path();

    let cfg = match load_from_path(&path) {
        Ok(cfg) => cfg,
        Err(err) => {
            init_tracing(cli.level_override().unwrap_or("info"), false);
            error!(%err, path = %path.display(), "failed to load configuration");
            std::process::exit(1);
        }
    };

    let level = cli.level_override().unwrap_or(cfg.logging.level.as_str());
    init_tracing(level, false);

    info!(path = %path.display(), inputs = cfg.inputs.len(), "configuration loaded");

    let supervisor = match Supervisor::build(&cfg).await {
        Ok(s) => s,
        Err(err) => {
            error!(%err, "failed to build worker supervisor");
            std::process::exit(1);
        }
    };

    if let Err(err) = supervisor.run(&cfg).await {
        error!(%err, "netanon exited with error");
        std::process::exit(1);
    }
}
