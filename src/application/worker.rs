//! Worker loop: leases jobs from a named queue and applies the retry
//! policy carried by each job.

use crate::ports::queue::{JobQueuePort, LeasedJob, QueueError};
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How long a single lease call blocks before re-checking the pause flag.
const LEASE_POLL: Duration = Duration::from_secs(5);
const PAUSE_POLL: Duration = Duration::from_secs(1);
const BROKER_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Processes one job payload. Handlers run under at-least-once delivery
/// and must tolerate re-execution.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, payload: &serde_json::Value)
        -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Dispatch loop for one worker task. Long-running handler work happens on
/// this task while leasing stays bounded, so a stuck queue never blocks an
/// in-flight job and vice versa.
pub async fn run_worker_loop<Q: JobQueuePort>(
    worker_id: usize,
    queue_name: String,
    queue: Arc<Q>,
    handler: Arc<dyn JobHandler>,
) {
    info!(worker_id, queue = %queue_name, "worker started");

    loop {
        match queue.is_paused(&queue_name).await {
            Ok(true) => {
                tokio::time::sleep(PAUSE_POLL).await;
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(worker_id, error = %e, "could not read pause flag");
                tokio::time::sleep(BROKER_ERROR_BACKOFF).await;
                continue;
            }
        }

        match queue.lease(&queue_name, LEASE_POLL).await {
            Ok(Some(leased)) => {
                if let Err(e) = settle(queue.as_ref(), handler.as_ref(), leased).await {
                    error!(worker_id, error = %e, "failed to settle job lease");
                }
            }
            Ok(None) => continue,
            Err(e) => {
                error!(worker_id, queue = %queue_name, error = %e, "error leasing job");
                tokio::time::sleep(BROKER_ERROR_BACKOFF).await;
            }
        }
    }
}

/// Run the handler and settle the lease: complete on success, otherwise
/// schedule an exponential-backoff retry until the job's attempts are
/// exhausted, then record it permanently failed.
pub(crate) async fn settle<Q: JobQueuePort + ?Sized>(
    queue: &Q,
    handler: &dyn JobHandler,
    mut leased: LeasedJob,
) -> Result<(), QueueError> {
    match handler.handle(&leased.job.payload).await {
        Ok(()) => {
            info!(job = %leased.job.id, queue = %leased.job.queue, "job completed");
            queue.complete(&leased).await
        }
        Err(e) => {
            leased.job.attempts_made += 1;
            let attempts = leased.job.attempts_made;
            if attempts < leased.job.opts.max_attempts {
                let delay = leased.job.opts.backoff.delay_for(attempts);
                warn!(
                    job = %leased.job.id,
                    queue = %leased.job.queue,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "job failed, retry scheduled"
                );
                queue.retry(&leased, delay).await
            } else {
                error!(
                    job = %leased.job.id,
                    queue = %leased.job.queue,
                    attempts,
                    error = %e,
                    "job failed permanently"
                );
                queue.fail(&leased, &e.to_string()).await
            }
        }
    }
}
