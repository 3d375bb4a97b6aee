//! HLS rendition encoding.

use super::cmd::TranscodeRunner;
use super::error::{MediaError, MediaResult};
use crate::domain::video::Rendition;
use std::path::Path;

/// Segment length in seconds. `-hls_list_size 0` keeps every segment in
/// the playlist (complete VOD-style manifest, not a sliding window).
const SEGMENT_SECONDS: u32 = 6;

pub fn encode_args(source: &Path, out_dir: &Path, rendition: &Rendition) -> Vec<String> {
    let playlist = out_dir.join(format!("{}.m3u8", rendition.label));
    let segments = out_dir.join(format!("{}_%03d.ts", rendition.label));

    vec![
        "-y".into(),
        "-i".into(),
        source.to_string_lossy().into_owned(),
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        "fast".into(),
        "-crf".into(),
        "23".into(),
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        "128k".into(),
        "-s".into(),
        rendition.resolution(),
        "-b:v".into(),
        format!("{}k", rendition.bitrate_kbps),
        "-maxrate".into(),
        format!("{}k", rendition.max_bitrate_kbps),
        "-hls_time".into(),
        SEGMENT_SECONDS.to_string(),
        "-hls_list_size".into(),
        "0".into(),
        "-hls_segment_filename".into(),
        segments.to_string_lossy().into_owned(),
        "-f".into(),
        "hls".into(),
        playlist.to_string_lossy().into_owned(),
    ]
}

/// Encode one rendition into `out_dir` as `{label}.m3u8` plus numbered
/// `{label}_NNN.ts` segments. Renditions of a job run concurrently; a
/// failed run leaves partial output on disk to be overwritten on retry.
pub async fn encode_rendition(
    runner: &dyn TranscodeRunner,
    source: &Path,
    out_dir: &Path,
    rendition: &Rendition,
) -> MediaResult<()> {
    let output = runner
        .run_ffmpeg(encode_args(source, out_dir, rendition))
        .await?;

    if !output.status.success() {
        return Err(MediaError::Encode {
            label: rendition.label.clone(),
            message: format!("ffmpeg exited with {}", output.status),
            stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
        });
    }

    tracing::debug!(label = %rendition.label, "rendition encoded");
    Ok(())
}
