//! Persistence ports for video rows and billing records.

use crate::domain::billing::BillingRecord;
use crate::domain::video::Video;
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("video {0} not found")]
    NotFound(Uuid),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outcome of attempting to claim a video for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingClaim {
    /// The video is now `processing`; this delivery owns the work.
    Claimed,
    /// A previous delivery already finished; skip reprocessing.
    AlreadyCompleted,
}

/// Everything a successful transcode writes back to the video row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeOutcome {
    pub hls_path: String,
    pub thumbnail_path: Option<String>,
    /// Display duration, whole seconds (probed value rounded up).
    pub duration_seconds: u64,
    pub original_resolution: String,
    pub available_resolutions: Vec<String>,
}

#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn create(&self, video: &Video) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Video>, StoreError>;

    /// Atomically claim the video for processing.
    ///
    /// Conditional check-and-claim rather than read-then-act: a video
    /// already `completed` is reported as such so a redelivered job can
    /// skip (and never double-bill).
    async fn begin_processing(&self, id: Uuid) -> Result<ProcessingClaim, StoreError>;

    /// Conditionally transition `processing -> completed`, persisting the
    /// outcome and clearing the source path. Returns `false` when the
    /// video was not `processing` (another delivery won the race) - the
    /// caller must then skip billing.
    async fn complete(&self, id: Uuid, outcome: &TranscodeOutcome) -> Result<bool, StoreError>;

    async fn mark_failed(&self, id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Append one immutable charge. No deduplication here; the orchestrator
    /// gates invocation on the completion claim.
    async fn append(&self, record: &BillingRecord) -> Result<(), StoreError>;

    /// Sum of all charges for a user; zero when there are none.
    async fn user_total(&self, user_id: i64) -> Result<Decimal, StoreError>;
}
