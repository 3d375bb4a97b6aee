//! Worker Binary
//!
//! Connects to Redis, recovers jobs orphaned by a previous process, then
//! runs the transcode and ping queue workers until interrupted.
//!
//! Environment Variables:
//! - REDIS_HOST / REDIS_PORT / REDIS_PASSWORD: broker location
//! - UPLOAD_DIR: directory holding uploaded source files
//! - PROCESSED_DIR: directory receiving HLS output
//! - COST_PER_MINUTE: billing rate per started minute
//! - FFMPEG_PATH / FFPROBE_PATH: tool overrides (PATH lookup otherwise)
//! - MAX_JOB_ATTEMPTS / BACKOFF_BASE_MS: transcode retry policy

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tremolo::adapters::redis::RedisPool;
use tremolo::application::billing::BillingService;
use tremolo::application::orchestrator::TranscodeOrchestrator;
use tremolo::application::registry::{QueuePolicy, QueueRegistry};
use tremolo::application::worker::JobHandler;
use tremolo::config::Config;
use tremolo::domain::jobs::{BackoffPolicy, JobOptions, PING_QUEUE, TRANSCODE_QUEUE};
use tremolo::media::ProcessRunner;

/// Answers liveness pings; useful for smoke-testing a deployment.
struct PingHandler;

#[async_trait::async_trait]
impl JobHandler for PingHandler {
    async fn handle(
        &self,
        payload: &serde_json::Value,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        info!(payload = %payload, "pong");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    info!(
        ffmpeg = %config.tools.ffmpeg.display(),
        ffprobe = %config.tools.ffprobe.display(),
        "tools resolved"
    );

    let pool = Arc::new(RedisPool::new(&config.redis_url())?);
    pool.wait_until_ready(30, Duration::from_secs(2)).await?;

    let mut registry = QueueRegistry::new(Arc::clone(&pool));
    registry
        .define(
            TRANSCODE_QUEUE,
            QueuePolicy {
                concurrency: 1,
                opts: JobOptions {
                    max_attempts: config.max_job_attempts,
                    backoff: BackoffPolicy {
                        base_delay_ms: config.backoff_base_ms,
                    },
                    retain_completed: 10,
                    retain_failed: 5,
                },
            },
        )
        .define(PING_QUEUE, QueuePolicy::default());

    let recovered = registry.recover_orphans().await?;
    if recovered > 0 {
        info!(recovered, "recovered orphaned jobs from a previous run");
    }

    let orchestrator = TranscodeOrchestrator::new(
        Arc::clone(&pool),
        BillingService::new(Arc::clone(&pool), config.cost_per_minute),
        Arc::new(ProcessRunner::new(config.tools.clone())),
        config.processed_dir.clone(),
    );
    registry.register_worker(TRANSCODE_QUEUE, Arc::new(orchestrator))?;
    registry.register_worker(PING_QUEUE, Arc::new(PingHandler))?;
    info!("workers started");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, pausing queues");
    if let Err(e) = registry.pause_all().await {
        error!(error = %e, "could not pause queues on shutdown");
    }

    Ok(())
}
