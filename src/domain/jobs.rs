//! Job envelopes and per-queue dispatch policy.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Queue carrying transcode work.
pub const TRANSCODE_QUEUE: &str = "transcode";
/// Trivial liveness queue, useful for smoke-testing a deployment.
pub const PING_QUEUE: &str = "ping";

/// Payload of a transcode job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeJob {
    pub video_id: Uuid,
    pub source_path: PathBuf,
    /// Caller-supplied thumbnail; skips extraction when present.
    pub thumbnail_path: Option<PathBuf>,
}

/// Lifecycle of a job inside its queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
}

/// Exponential backoff: `base * 2^(attempt - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    pub base_delay_ms: u64,
}

impl BackoffPolicy {
    pub fn new(base_delay: Duration) -> Self {
        Self {
            base_delay_ms: base_delay.as_millis() as u64,
        }
    }

    /// Delay before redelivery after the `attempt`-th failure (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(1 << exponent))
    }
}

/// Dispatch options carried by every job, stamped from the queue's
/// registration defaults at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
    /// Terminal jobs retained for inspection, oldest evicted first.
    pub retain_completed: u32,
    pub retain_failed: u32,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffPolicy { base_delay_ms: 2000 },
            retain_completed: 50,
            retain_failed: 50,
        }
    }
}

/// A unit of work dispatched through a named queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub queue: String,
    pub payload: serde_json::Value,
    /// Failed attempts so far; the job is abandoned once this reaches
    /// `opts.max_attempts`.
    pub attempts_made: u32,
    pub state: JobState,
    pub opts: JobOptions,
}

impl Job {
    pub fn new(queue: impl Into<String>, payload: serde_json::Value, opts: JobOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            queue: queue.into(),
            payload,
            attempts_made: 0,
            state: JobState::Waiting,
            opts,
        }
    }
}

/// A permanently failed job, retained with its final error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedJob {
    pub job: Job,
    pub error: String,
}

/// Per-queue counters surfaced to operators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}
