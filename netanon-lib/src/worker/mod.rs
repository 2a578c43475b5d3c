mod build;
mod pipeline;

pub use build::{build_input, build_output};
pub use pipeline::Pipeline;

use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

use crate::config::Config;
use crate::crypto::{AddressKey, CryptoPanEngine, KeyRotator};
use crate::error::{AnonError, Result};
use crate::policy::PolicySet;
use crate::stats::Sampler;

/// Owns every pipeline plus the shared key-rotation and stats-sampling tasks, and runs
/// them until a SIGINT/SIGTERM arrives. Shutdown closes resources in the same order the
/// original process used: each pipeline's input first, then the stats sampler, then
/// every pipeline's output.
pub struct Supervisor {
    pipelines: Vec<Pipeline>,
    engine: Arc<CryptoPanEngine>,
    sampler: Arc<Sampler>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Supervisor {
    pub async fn build(cfg: &Config) -> Result<Self> {
        let policy = Arc::new(PolicySet::from_config(&cfg.anonymization)?);
        let engine = Arc::new(CryptoPanEngine::new(AddressKey::create_random()));
        let sampler = Arc::new(Sampler::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut pipelines = Vec::new();
        for input in &cfg.inputs {
            let instances = if input.clustered && input.driver == "ringread" {
                input.cluster_n.max(1)
            } else {
                1
            };
            for i in 0..instances {
                let label = format!("{}_{i}", input.name);
                let pipeline = Pipeline::build(
                    label,
                    input,
                    &cfg.output,
                    Arc::clone(&policy),
                    Arc::clone(&engine),
                )
                .await?;
                sampler.register(pipeline.stats_source()).await;
                pipelines.push(pipeline);
            }
        }

        if pipelines.is_empty() {
            return Err(AnonError::Config("no pipelines configured".into()));
        }

        Ok(Supervisor { pipelines, engine, sampler, shutdown_tx, shutdown_rx })
    }

    pub async fn run(mut self, cfg: &Config) -> Result<()> {
        let rotator = tokio::spawn(KeyRotator::run(
            Arc::clone(&self.engine),
            cfg.anonymization.loop_time_hour,
            self.shutdown_rx.clone(),
        ));
        let sampler_task = tokio::spawn(Arc::clone(&self.sampler).run(
            Duration::from_secs(cfg.telemetry.stats_interval_seconds),
            self.shutdown_rx.clone(),
        ));

        let pipeline_handles: Vec<_> = self
            .pipelines
            .into_iter()
            .map(|mut p| {
                let rx = self.shutdown_rx.clone();
                tokio::spawn(async move {
                    p.run(rx).await;
                    p
                })
            })
            .collect();

        let mut sigterm = signal(SignalKind::terminate()).map_err(AnonError::Io)?;
        let mut sigint = signal(SignalKind::interrupt()).map_err(AnonError::Io)?;
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
        }

        let _ = self.shutdown_tx.send(true);

        let mut finished_pipelines = Vec::with_capacity(pipeline_handles.len());
        for handle in pipeline_handles {
            match handle.await {
                Ok(p) => finished_pipelines.push(p),
                Err(e) => tracing::error!(error = %e, "pipeline task panicked"),
            }
        }

        let _ = sampler_task.await;

        for mut p in finished_pipelines {
            p.close_output().await;
        }

        let _ = rotator.await;
        Ok(())
    }
}
