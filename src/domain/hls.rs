//! HLS master playlist generation.

use crate::domain::video::Rendition;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

pub const MASTER_PLAYLIST_NAME: &str = "master.m3u8";

/// One `EXT-X-STREAM-INF` entry of the master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantStream {
    /// Peak bandwidth in bits per second.
    pub bandwidth: u64,
    /// e.g. "640x360"
    pub resolution: String,
    /// Rendition playlist file, relative to the master.
    pub uri: String,
}

/// Top-level manifest referencing each rendition playlist.
#[derive(Debug, Clone)]
pub struct MasterPlaylist {
    pub version: u8,
    pub variants: Vec<VariantStream>,
}

impl MasterPlaylist {
    pub fn new() -> Self {
        Self {
            version: 3,
            variants: Vec::new(),
        }
    }

    /// Build the manifest for a selector's renditions, preserving their order.
    pub fn for_renditions(renditions: &[Rendition]) -> Self {
        let mut playlist = Self::new();
        for rendition in renditions {
            playlist.variants.push(VariantStream {
                bandwidth: rendition.bitrate_kbps as u64 * 1000,
                resolution: rendition.resolution(),
                uri: format!("{}.m3u8", rendition.label),
            });
        }
        playlist
    }

    /// Deterministic text form: identical input yields identical bytes.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("#EXTM3U\n");
        out.push_str(&format!("#EXT-X-VERSION:{}\n\n", self.version));
        for variant in &self.variants {
            out.push_str(&format!(
                "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}\n",
                variant.bandwidth, variant.resolution
            ));
            out.push_str(&variant.uri);
            out.push('\n');
        }
        out
    }

    /// Write `master.m3u8` into `out_dir` and return its path.
    pub async fn write_to(&self, out_dir: &Path) -> Result<PathBuf, std::io::Error> {
        let path = out_dir.join(MASTER_PLAYLIST_NAME);
        let mut file = File::create(&path).await?;
        file.write_all(self.render().as_bytes()).await?;
        file.flush().await?;
        Ok(path)
    }
}

impl Default for MasterPlaylist {
    fn default() -> Self {
        Self::new()
    }
}
