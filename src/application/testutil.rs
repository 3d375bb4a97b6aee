//! In-memory port implementations for application-layer tests.

use crate::domain::billing::BillingRecord;
use crate::domain::jobs::{FailedJob, Job, JobState, QueueStats};
use crate::domain::video::{Video, VideoStatus};
use crate::ports::queue::{JobQueuePort, LeasedJob, QueueError};
use crate::ports::repository::{
    BillingStore, ProcessingClaim, StoreError, TranscodeOutcome, VideoRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

#[derive(Default)]
struct QueueState {
    waiting: HashMap<String, VecDeque<Job>>,
    active: Vec<Job>,
    // Retries become immediately leasable; the scheduled delay is recorded
    // so tests can assert the backoff sequence.
    delayed: HashMap<String, VecDeque<Job>>,
    retry_delays_ms: Vec<u64>,
    completed: Vec<Job>,
    failed: Vec<FailedJob>,
    paused: HashSet<String>,
}

/// Broker double with the same lease/settle surface as the Redis adapter.
#[derive(Default)]
pub(crate) struct MemoryQueue {
    state: Mutex<QueueState>,
}

impl MemoryQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn retry_delays(&self) -> Vec<u64> {
        self.state.lock().unwrap().retry_delays_ms.clone()
    }

    pub(crate) fn completed_jobs(&self) -> Vec<Job> {
        self.state.lock().unwrap().completed.clone()
    }

    pub(crate) fn failed_jobs(&self) -> Vec<FailedJob> {
        self.state.lock().unwrap().failed.clone()
    }
}

#[async_trait]
impl JobQueuePort for MemoryQueue {
    async fn enqueue(&self, job: &Job) -> Result<(), QueueError> {
        let mut state = self.state.lock().unwrap();
        state
            .waiting
            .entry(job.queue.clone())
            .or_default()
            .push_back(job.clone());
        Ok(())
    }

    async fn lease(
        &self,
        queue: &str,
        _timeout: Duration,
    ) -> Result<Option<LeasedJob>, QueueError> {
        let mut state = self.state.lock().unwrap();
        let promoted = state
            .delayed
            .get_mut(queue)
            .and_then(|due| due.pop_front());
        if let Some(job) = promoted {
            state
                .waiting
                .entry(queue.to_string())
                .or_default()
                .push_back(job);
        }
        let job = state.waiting.get_mut(queue).and_then(|q| q.pop_front());
        match job {
            Some(job) => {
                state.active.push(job.clone());
                let receipt = job.id.to_string();
                Ok(Some(LeasedJob { job, receipt }))
            }
            None => Ok(None),
        }
    }

    async fn complete(&self, leased: &LeasedJob) -> Result<(), QueueError> {
        let mut state = self.state.lock().unwrap();
        state.active.retain(|j| j.id != leased.job.id);
        let mut job = leased.job.clone();
        job.state = JobState::Completed;
        state.completed.push(job);
        Ok(())
    }

    async fn retry(&self, leased: &LeasedJob, delay: Duration) -> Result<(), QueueError> {
        let mut state = self.state.lock().unwrap();
        state.active.retain(|j| j.id != leased.job.id);
        state.retry_delays_ms.push(delay.as_millis() as u64);
        let mut job = leased.job.clone();
        job.state = JobState::Waiting;
        state
            .delayed
            .entry(job.queue.clone())
            .or_default()
            .push_back(job);
        Ok(())
    }

    async fn fail(&self, leased: &LeasedJob, error: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock().unwrap();
        state.active.retain(|j| j.id != leased.job.id);
        let mut job = leased.job.clone();
        job.state = JobState::Failed;
        state.failed.push(FailedJob {
            job,
            error: error.to_string(),
        });
        Ok(())
    }

    async fn requeue_orphans(&self, queue: &str) -> Result<u64, QueueError> {
        let mut state = self.state.lock().unwrap();
        let orphans: Vec<Job> = state
            .active
            .iter()
            .filter(|j| j.queue == queue)
            .cloned()
            .collect();
        state.active.retain(|j| j.queue != queue);
        let count = orphans.len() as u64;
        let waiting = state.waiting.entry(queue.to_string()).or_default();
        for job in orphans {
            waiting.push_back(job);
        }
        Ok(count)
    }

    async fn pause(&self, queue: &str) -> Result<(), QueueError> {
        self.state.lock().unwrap().paused.insert(queue.to_string());
        Ok(())
    }

    async fn resume(&self, queue: &str) -> Result<(), QueueError> {
        self.state.lock().unwrap().paused.remove(queue);
        Ok(())
    }

    async fn is_paused(&self, queue: &str) -> Result<bool, QueueError> {
        Ok(self.state.lock().unwrap().paused.contains(queue))
    }

    async fn drain(&self, queue: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock().unwrap();
        state.waiting.remove(queue);
        state.delayed.remove(queue);
        state.active.retain(|j| j.queue != queue);
        Ok(())
    }

    async fn stats(&self, queue: &str) -> Result<QueueStats, QueueError> {
        let state = self.state.lock().unwrap();
        let waiting = state.waiting.get(queue).map_or(0, |q| q.len() as u64)
            + state.delayed.get(queue).map_or(0, |q| q.len() as u64);
        Ok(QueueStats {
            waiting,
            active: state.active.iter().filter(|j| j.queue == queue).count() as u64,
            completed: state.completed.iter().filter(|j| j.queue == queue).count() as u64,
            failed: state.failed.iter().filter(|f| f.job.queue == queue).count() as u64,
        })
    }
}

/// Video store double mirroring the Redis adapter's conditional
/// transitions.
#[derive(Default)]
pub(crate) struct MemoryRepo {
    videos: Mutex<HashMap<Uuid, Video>>,
}

impl MemoryRepo {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VideoRepository for MemoryRepo {
    async fn create(&self, video: &Video) -> Result<(), StoreError> {
        self.videos
            .lock()
            .unwrap()
            .insert(video.id, video.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Video>, StoreError> {
        Ok(self.videos.lock().unwrap().get(&id).cloned())
    }

    async fn begin_processing(&self, id: Uuid) -> Result<ProcessingClaim, StoreError> {
        let mut videos = self.videos.lock().unwrap();
        let video = videos.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if video.status == VideoStatus::Completed {
            return Ok(ProcessingClaim::AlreadyCompleted);
        }
        video.status = VideoStatus::Processing;
        video.updated_at = Utc::now();
        Ok(ProcessingClaim::Claimed)
    }

    async fn complete(&self, id: Uuid, outcome: &TranscodeOutcome) -> Result<bool, StoreError> {
        let mut videos = self.videos.lock().unwrap();
        let video = videos.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if video.status != VideoStatus::Processing {
            return Ok(false);
        }
        video.status = VideoStatus::Completed;
        video.hls_path = Some(outcome.hls_path.clone());
        video.thumbnail_path = outcome.thumbnail_path.clone();
        video.duration = Some(outcome.duration_seconds);
        video.original_resolution = Some(outcome.original_resolution.clone());
        video.available_resolutions = outcome.available_resolutions.clone();
        video.file_path = None;
        video.updated_at = Utc::now();
        Ok(true)
    }

    async fn mark_failed(&self, id: Uuid) -> Result<(), StoreError> {
        let mut videos = self.videos.lock().unwrap();
        if let Some(video) = videos.get_mut(&id) {
            if matches!(
                video.status,
                VideoStatus::Uploading | VideoStatus::Processing
            ) {
                video.status = VideoStatus::Failed;
                video.updated_at = Utc::now();
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MemoryBilling {
    records: Mutex<Vec<BillingRecord>>,
}

impl MemoryBilling {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn records(&self) -> Vec<BillingRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillingStore for MemoryBilling {
    async fn append(&self, record: &BillingRecord) -> Result<(), StoreError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn user_total(&self, user_id: i64) -> Result<Decimal, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.amount)
            .sum())
    }
}
