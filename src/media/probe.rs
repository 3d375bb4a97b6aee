//! Source inspection via ffprobe.

use super::cmd::TranscodeRunner;
use super::error::{MediaError, MediaResult};
use serde::Deserialize;
use std::path::Path;

/// Measured properties of a source video.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    /// Exact duration with sub-second precision. Billing depends on this
    /// not being truncated.
    pub duration_seconds: f64,
}

impl SourceInfo {
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
}

pub fn probe_args(path: &Path) -> Vec<String> {
    vec![
        "-v".into(),
        "quiet".into(),
        "-print_format".into(),
        "json".into(),
        "-show_format".into(),
        "-show_streams".into(),
        path.to_string_lossy().into_owned(),
    ]
}

/// Parse ffprobe's JSON output into a [`SourceInfo`].
pub fn parse_probe_output(path: &Path, json: &str) -> MediaResult<SourceInfo> {
    let probe: FfprobeOutput = serde_json::from_str(json)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::NoVideoStream(path.to_path_buf()))?;

    let (width, height) = match (video_stream.width, video_stream.height) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            return Err(MediaError::Probe {
                path: path.to_path_buf(),
                message: "video stream reports no dimensions".to_string(),
                stderr: None,
            })
        }
    };

    let duration_seconds = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| MediaError::Probe {
            path: path.to_path_buf(),
            message: "container reports no parsable duration".to_string(),
            stderr: None,
        })?;

    Ok(SourceInfo {
        width,
        height,
        duration_seconds,
    })
}

/// Probe a source file for its dimensions and exact duration.
pub async fn probe(runner: &dyn TranscodeRunner, path: &Path) -> MediaResult<SourceInfo> {
    let output = runner.run_ffprobe(probe_args(path)).await?;

    if !output.status.success() {
        return Err(MediaError::Probe {
            path: path.to_path_buf(),
            message: format!("ffprobe exited with {}", output.status),
            stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
        });
    }

    parse_probe_output(path, &String::from_utf8_lossy(&output.stdout))
}
