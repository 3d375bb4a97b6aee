//! Durable, named, at-least-once job queue port.

use crate::domain::jobs::{Job, QueueStats};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("broker unavailable: {0}")]
    Broker(String),

    #[error("unknown queue: {0}")]
    UnknownQueue(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A job leased to a worker.
///
/// The receipt identifies the broker's active-list entry; settling the
/// lease (complete, retry or fail) hands it back.
#[derive(Debug, Clone)]
pub struct LeasedJob {
    pub job: Job,
    pub receipt: String,
}

/// Broker contract for durable dispatch.
///
/// Delivery is at-least-once: a leased job whose worker dies stays on the
/// active list until `requeue_orphans` returns it to waiting. Handlers
/// must tolerate re-execution.
#[async_trait]
pub trait JobQueuePort: Send + Sync {
    /// Append a job to its queue's waiting list.
    async fn enqueue(&self, job: &Job) -> Result<(), QueueError>;

    /// Lease the next job, promoting due retries first. Blocks up to
    /// `timeout`; `None` on timeout.
    async fn lease(&self, queue: &str, timeout: Duration) -> Result<Option<LeasedJob>, QueueError>;

    /// Settle a lease as succeeded; the terminal record is retained
    /// bounded by the job's options.
    async fn complete(&self, leased: &LeasedJob) -> Result<(), QueueError>;

    /// Settle a lease as failed but retryable: schedule redelivery after
    /// `delay`. `leased.job.attempts_made` must already count the failure.
    async fn retry(&self, leased: &LeasedJob, delay: Duration) -> Result<(), QueueError>;

    /// Settle a lease as permanently failed, retaining the job and its
    /// final error bounded by the job's options.
    async fn fail(&self, leased: &LeasedJob, error: &str) -> Result<(), QueueError>;

    /// Move jobs abandoned on the active list back to waiting. Called on
    /// worker startup; returns how many were recovered.
    async fn requeue_orphans(&self, queue: &str) -> Result<u64, QueueError>;

    /// Stop dispatching; active jobs run to completion.
    async fn pause(&self, queue: &str) -> Result<(), QueueError>;

    async fn resume(&self, queue: &str) -> Result<(), QueueError>;

    async fn is_paused(&self, queue: &str) -> Result<bool, QueueError>;

    /// Forcibly remove all waiting, delayed and active jobs. Administrative
    /// reset; terminal records are kept.
    async fn drain(&self, queue: &str) -> Result<(), QueueError>;

    async fn stats(&self, queue: &str) -> Result<QueueStats, QueueError>;
}
