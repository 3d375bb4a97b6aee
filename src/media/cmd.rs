//! Subprocess seam for the external transcoder.
//!
//! Commands are built as argument vectors and executed through the
//! [`TranscodeRunner`] trait so tests can substitute the binaries.

use super::error::{MediaError, MediaResult};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

/// Validated locations of the ffmpeg and ffprobe binaries.
///
/// Resolved exactly once at startup; a missing tool fails startup loudly
/// instead of degrading at job time.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl ToolPaths {
    /// Resolve configured overrides, falling back to a PATH lookup.
    pub fn resolve(ffmpeg: Option<&str>, ffprobe: Option<&str>) -> MediaResult<Self> {
        Ok(Self {
            ffmpeg: resolve_tool(ffmpeg, "ffmpeg")?,
            ffprobe: resolve_tool(ffprobe, "ffprobe")?,
        })
    }
}

fn resolve_tool(configured: Option<&str>, name: &str) -> MediaResult<PathBuf> {
    match configured {
        Some(value) => {
            let path = Path::new(value);
            if path.is_absolute() {
                if path.is_file() {
                    Ok(path.to_path_buf())
                } else {
                    Err(MediaError::ToolMissing(value.to_string()))
                }
            } else {
                which::which(value).map_err(|_| MediaError::ToolMissing(value.to_string()))
            }
        }
        None => which::which(name).map_err(|_| MediaError::ToolMissing(name.to_string())),
    }
}

/// Executes the external inspection and transcoding tools.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscodeRunner: Send + Sync {
    async fn run_ffprobe(&self, args: Vec<String>) -> io::Result<Output>;
    async fn run_ffmpeg(&self, args: Vec<String>) -> io::Result<Output>;
}

/// Real runner invoking the resolved binaries as subprocesses.
pub struct ProcessRunner {
    tools: ToolPaths,
}

impl ProcessRunner {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl TranscodeRunner for ProcessRunner {
    async fn run_ffprobe(&self, args: Vec<String>) -> io::Result<Output> {
        Command::new(&self.tools.ffprobe).args(&args).output().await
    }

    async fn run_ffmpeg(&self, args: Vec<String>) -> io::Result<Output> {
        Command::new(&self.tools.ffmpeg).args(&args).output().await
    }
}
