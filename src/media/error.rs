//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("transcoder binary not found: {0}")]
    ToolMissing(String),

    #[error("source file not found: {0} (a previous delivery may have already processed it)")]
    SourceMissing(PathBuf),

    #[error("ffprobe failed on {path}: {message}")]
    Probe {
        path: PathBuf,
        message: String,
        stderr: Option<String>,
    },

    #[error("no video stream found in {0}")]
    NoVideoStream(PathBuf),

    #[error("thumbnail extraction failed: {message}")]
    Thumbnail {
        message: String,
        stderr: Option<String>,
    },

    #[error("encode of rendition {label} failed: {message}")]
    Encode {
        label: String,
        message: String,
        stderr: Option<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed probe output: {0}")]
    MalformedProbeOutput(#[from] serde_json::Error),
}
