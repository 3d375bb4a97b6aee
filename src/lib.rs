//! Tremolo - Durable Video Transcoding Pipeline
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (video, jobs, hls, billing)
//! - ports/: Trait definitions (queue broker, stores)
//! - adapters/: Concrete implementations (Redis)
//! - media/: External transcoder invocation (ffmpeg/ffprobe)
//! - application/: Worker loop, queue registry, transcode orchestrator
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod media;
pub mod ports;

pub use config::Config;
