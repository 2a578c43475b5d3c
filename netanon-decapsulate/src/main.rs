#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::Parser;
use netanon_lib::config::{load_from_path, DEFAULT_CONFIG_PATHS};
use netanon_lib::decode::decode;
use netanon_lib::telemetry::init_tracing;
use netanon_lib::worker::{build_input, build_output};
use netanon_lib::PacketRecord;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

/// Strips the timestamp-tunnel wire format back into a plain capture: reads from a
/// `socketread` input and re-emits unmodified frames to a file/live output, with no
/// address rewriting. One input, one output, no `[anonymization]` table.
#[derive(Parser, Debug)]
#[command(author, version, about = "Undoes netanon's UDP tunnel encapsulation")]
struct Cli {
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

    let Some(input_cfg) = cfg.inputs.first() else {
        error!("decapsulate requires exactly one input interface");
        std::process::exit(1);
    };

    let mut input = match build_input(input_cfg).await {
        Ok(h) => h,
        Err(err) => {
            error!(%err, "failed to open input");
            std::process::exit(1);
        }
    };
    let mut output = match build_output(&cfg.output).await {
        Ok(h) => h,
        Err(err) => {
            error!(%err, "failed to open output");
            std::process::exit(1);
        }
    };

    info!(path = %path.display(), "decapsulate running");

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(err) => {
            error!(%err, "failed to install SIGTERM handler");
            std::process::exit(1);
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(err) => {
            error!(%err, "failed to install SIGINT handler");
            std::process::exit(1);
        }
    };

    let mut pkt = PacketRecord::new();
    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
            result = input.read_packet(&mut pkt) => {
                match result {
                    Ok(true) => {
                        if !decode(&mut pkt) {
                            continue;
                        }
                        pkt.out.clear();
                        pkt.out.extend_from_slice(&pkt.raw);
                        if let Err(err) = output.write_packet(&pkt).await {
                            error!(%err, "failed to write decapsulated packet");
                        }
                    }
                    Ok(false) => break,
                    Err(err) => {
                        error!(%err, "failed to read packet");
                        break;
                    }
                }
            }
        }
    }

    let _ = input.close().await;
    let _ = output.close().await;
}
