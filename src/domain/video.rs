//! Video records and rendition selection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Lifecycle of an uploaded video.
///
/// Transitions are one-directional: `Uploading -> Processing -> Completed`,
/// with `Failed` reachable from either non-terminal state (a failed dispatch
/// fails an `Uploading` video directly). A redelivered job may re-enter
/// `Processing` from `Failed`, but `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Uploading,
    Processing,
    Completed,
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploading => "uploading",
            VideoStatus::Processing => "processing",
            VideoStatus::Completed => "completed",
            VideoStatus::Failed => "failed",
        }
    }

    /// Whether the state machine admits `self -> next`.
    pub fn can_transition_to(&self, next: VideoStatus) -> bool {
        use VideoStatus::*;
        matches!(
            (self, next),
            (Uploading, Processing)
                | (Uploading, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Failed, Processing)
        )
    }
}

impl std::fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One uploaded media asset and its derived processing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Source file on disk; cleared once transcoding succeeds.
    pub file_path: Option<PathBuf>,
    /// Public path of the master manifest, e.g. `/processed/{id}/master.m3u8`.
    pub hls_path: Option<String>,
    pub thumbnail_path: Option<String>,
    /// Whole seconds, set only after a successful probe.
    pub duration: Option<u64>,
    /// e.g. "1920x1080"
    pub original_resolution: Option<String>,
    pub available_resolutions: Vec<String>,
    pub is_public: bool,
    pub status: VideoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// A freshly uploaded video, before any processing.
    pub fn new(user_id: i64, title: impl Into<String>, file_path: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: title.into(),
            description: None,
            file_path: Some(file_path),
            hls_path: None,
            thumbnail_path: None,
            duration: None,
            original_resolution: None,
            available_resolutions: Vec::new(),
            is_public: false,
            status: VideoStatus::Uploading,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One encode target: resolution plus bitrate envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendition {
    pub width: u32,
    pub height: u32,
    /// e.g. "360p" - used for playlist and segment file names.
    pub label: String,
    pub bitrate_kbps: u32,
    pub max_bitrate_kbps: u32,
}

impl Rendition {
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

const TARGET_WIDTH: u32 = 640;
const TARGET_HEIGHT: u32 = 360;
const TARGET_BITRATE_KBPS: u32 = 800;
const TARGET_MAX_BITRATE_KBPS: u32 = 1200;

/// Decide the output renditions for a source of the given dimensions.
///
/// A single 640x360 tier today. Sources smaller than the target in either
/// dimension are encoded at their own size instead - never upscaled. Returns
/// a stable, deterministic list so callers can grow with additional tiers.
pub fn select_renditions(source_width: u32, source_height: u32) -> Vec<Rendition> {
    if source_width < TARGET_WIDTH || source_height < TARGET_HEIGHT {
        return vec![Rendition {
            width: source_width,
            height: source_height,
            label: format!("{}p", source_height),
            bitrate_kbps: TARGET_BITRATE_KBPS,
            max_bitrate_kbps: TARGET_MAX_BITRATE_KBPS,
        }];
    }

    vec![Rendition {
        width: TARGET_WIDTH,
        height: TARGET_HEIGHT,
        label: "360p".to_string(),
        bitrate_kbps: TARGET_BITRATE_KBPS,
        max_bitrate_kbps: TARGET_MAX_BITRATE_KBPS,
    }]
}
