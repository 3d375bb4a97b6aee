//! Enqueue Binary
//!
//! Registers an uploaded video and dispatches a transcode job for it.
//!
//! Usage: enqueue <user_id> <title> <source_path> [thumbnail_path]

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use tremolo::adapters::redis::RedisPool;
use tremolo::application::registry::{QueuePolicy, QueueRegistry};
use tremolo::config::Config;
use tremolo::domain::jobs::{BackoffPolicy, JobOptions, TranscodeJob, TRANSCODE_QUEUE};
use tremolo::domain::video::Video;
use tremolo::ports::repository::VideoRepository;

fn usage() -> ! {
    eprintln!("usage: enqueue <user_id> <title> <source_path> [thumbnail_path]");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let user_id: i64 = match args.next().map(|v| v.parse()) {
        Some(Ok(id)) => id,
        _ => usage(),
    };
    let title = match args.next() {
        Some(title) => title,
        None => usage(),
    };
    let source_path = match args.next() {
        Some(path) => PathBuf::from(path),
        None => usage(),
    };
    let thumbnail_path = args.next().map(PathBuf::from);

    if !source_path.is_file() {
        eprintln!("source file not found: {}", source_path.display());
        std::process::exit(1);
    }

    let config = Config::from_env()?;
    let pool = Arc::new(RedisPool::new(&config.redis_url())?);
    pool.wait_until_ready(3, Duration::from_secs(1)).await?;

    let mut registry = QueueRegistry::new(Arc::clone(&pool));
    registry.define(
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
    );

    let video = Video::new(user_id, title, source_path.clone());
    pool.create(&video).await?;

    let job = TranscodeJob {
        video_id: video.id,
        source_path,
        thumbnail_path,
    };
    if let Err(e) = registry.enqueue(TRANSCODE_QUEUE, &job).await {
        error!(video = %video.id, error = %e, "could not enqueue transcode job");
        if let Err(store_err) = pool.mark_failed(video.id).await {
            warn!(video = %video.id, error = %store_err, "could not mark video failed");
        }
        std::process::exit(1);
    }

    println!("{}", video.id);
    Ok(())
}
