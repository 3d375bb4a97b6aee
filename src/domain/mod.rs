//! Domain layer - Pure business logic.

pub mod billing;
pub mod hls;
pub mod jobs;
pub mod video;
