//! External transcoder invocation: ffprobe probing, thumbnail extraction
//! and HLS rendition encoding, all through argument-vector subprocess calls.

pub mod cmd;
pub mod encode;
pub mod error;
pub mod probe;
pub mod thumbnail;

pub use cmd::{ProcessRunner, ToolPaths, TranscodeRunner};
#[cfg(test)]
pub use cmd::MockTranscodeRunner;
pub use encode::encode_rendition;
pub use error::{MediaError, MediaResult};
pub use probe::{probe, SourceInfo};
