use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use super::build::{build_input, build_output};
use crate::config::{InputInterfaceConfig, OutputInterfaceConfig};
use crate::crypto::CryptoPanEngine;
use crate::decode::decode;
use crate::error::{AnonError, Result};
use crate::packet::PacketRecord;
use crate::policy::PolicySet;
use crate::rewrite::{rewrite, PacketOutcome};
use crate::sink::{CaptureHandle, HandleStats};
use crate::stats::Source;

/// One capture → decode → rewrite → emit chain. `cluster_n` instances of the same
/// configured input run as independent `Pipeline`s sharing the same `policy` and
/// `engine`.
pub struct Pipeline {
    label: String,
    input: Arc<Mutex<Box<dyn CaptureHandle>>>,
    output: Arc<Mutex<Box<dyn CaptureHandle>>>,
    policy: Arc<PolicySet>,
    engine: Arc<CryptoPanEngine>,
}

impl Pipeline {
    pub async fn build(
        label: String,
        input_cfg: &InputInterfaceConfig,
        output_cfg: &OutputInterfaceConfig,
        policy: Arc<PolicySet>,
        engine: Arc<CryptoPanEngine>,
    ) -> Result<Self> {
        let input = build_input(input_cfg).await?;
        let output = build_output(output_cfg).await?;
        Ok(Pipeline {
            label,
            input: Arc::new(Mutex::new(input)),
            output: Arc::new(Mutex::new(output)),
            policy,
            engine,
        })
    }

    pub fn stats_source(&self) -> Source {
        let input = Arc::clone(&self.input);
        let output = Arc::clone(&self.output);
        let label = self.label.clone();
        Source {
            label,
            poll: Box::new(move || {
                let in_stats = input.try_lock().map(|h| h.stats()).unwrap_or_default();
                let out_stats = output.try_lock().map(|h| h.stats()).unwrap_or_default();
                HandleStats {
                    received: in_stats.received,
                    dropped: in_stats.dropped,
                    written: out_stats.written,
                }
            }),
        }
    }

    /// Processes packets until `shutdown` fires, then closes the input side. The output
    /// side stays open until [`Pipeline::close_output`] runs, so any packet already
    /// in flight still gets written.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut pkt = PacketRecord::new();
        loop {
            tokio::select! {
                biased;

                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                result = async { self.input.lock().await.read_packet(&mut pkt).await } => {
                    match result {
                        Ok(true) => self.process(&mut pkt).await,
                        Ok(false) => break,
                        Err(e) => {
                            tracing::error!(error = %e, pipeline = %self.label, "pipeline read failed");
                            break;
                        }
                    }
                }
            }
        }

        if let Err(e) = self.input.lock().await.close().await {
            tracing::warn!(error = %e, pipeline = %self.label, "pipeline input close failed");
        }
    }

    async fn process(&self, pkt: &mut PacketRecord) {
        if !decode(pkt) {
            return;
        }
        match rewrite(pkt, &self.policy, &self.engine).await {
            PacketOutcome::Emit => {
                if let Err(e) = self.output.lock().await.write_packet(pkt).await {
                    if matches!(e, AnonError::SinkFatal(_)) {
                        tracing::error!(error = %e, pipeline = %self.label, "sink fatal, aborting");
                        std::process::exit(1);
                    }
                    tracing::warn!(error = %e, pipeline = %self.label, "pipeline write failed");
                }
            }
            PacketOutcome::Drop => {}
        }
    }

    pub async fn close_output(&mut self) {
        if let Err(e) = self.output.lock().await.close().await {
            tracing::warn!(error = %e, pipeline = %self.label, "pipeline output close failed");
        }
    }
}
