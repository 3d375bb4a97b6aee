//! Single-frame thumbnail extraction.

use super::cmd::TranscodeRunner;
use super::error::{MediaError, MediaResult};
use rand::Rng;
use std::path::{Path, PathBuf};

pub const THUMBNAIL_FILE_NAME: &str = "thumbnail.jpg";
/// Output frame size, regardless of source aspect ratio.
pub const THUMBNAIL_FRAME_SIZE: &str = "1280x720";

const WINDOW_START: f64 = 0.15;
const WINDOW_END: f64 = 0.25;

/// Seek point for the capture, in whole seconds.
///
/// `draw` is a uniform sample from `[0, 1)`. The point lands in
/// `[15%, 25%)` of the duration: past the often-blank opening frame,
/// well before any credits.
pub fn capture_point(duration_seconds: f64, draw: f64) -> u64 {
    let min = duration_seconds * WINDOW_START;
    let max = duration_seconds * WINDOW_END;
    (min + draw * (max - min)).floor() as u64
}

pub fn thumbnail_args(source: &Path, seek_seconds: u64, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-ss".into(),
        seek_seconds.to_string(),
        "-i".into(),
        source.to_string_lossy().into_owned(),
        "-frames:v".into(),
        "1".into(),
        "-s".into(),
        THUMBNAIL_FRAME_SIZE.into(),
        "-f".into(),
        "mjpeg".into(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Extract one JPEG frame into `out_dir/thumbnail.jpg`.
pub async fn extract(
    runner: &dyn TranscodeRunner,
    source: &Path,
    out_dir: &Path,
    duration_seconds: f64,
) -> MediaResult<PathBuf> {
    let seek = capture_point(duration_seconds, rand::thread_rng().gen::<f64>());
    let output_path = out_dir.join(THUMBNAIL_FILE_NAME);

    let output = runner
        .run_ffmpeg(thumbnail_args(source, seek, &output_path))
        .await?;

    if !output.status.success() {
        return Err(MediaError::Thumbnail {
            message: format!("ffmpeg exited with {} at seek {}s", output.status, seek),
            stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
        });
    }

    tracing::debug!(seek_seconds = seek, "thumbnail extracted");
    Ok(output_path)
}
