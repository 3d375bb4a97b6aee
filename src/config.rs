//! Process configuration, loaded from the environment.

use crate::media::{MediaError, ToolPaths};
use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },

    #[error(transparent)]
    Tools(#[from] MediaError),
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Redis host name or address
    pub redis_host: String,
    /// Redis port
    pub redis_port: u16,
    /// Optional Redis password
    pub redis_password: Option<String>,
    /// Directory holding uploaded source files
    pub upload_dir: PathBuf,
    /// Directory receiving HLS output, one subdirectory per video
    pub processed_dir: PathBuf,
    /// Billing rate per started minute of processed video
    pub cost_per_minute: Decimal,
    /// Resolved ffmpeg/ffprobe locations
    pub tools: ToolPaths,
    /// Deliveries per transcode job before it fails permanently
    pub max_job_attempts: u32,
    /// First retry delay; later retries double it
    pub backoff_base_ms: u64,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// development defaults. Tool resolution fails fast on a missing binary.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let redis_port = parse_var("REDIS_PORT", 6379)?;
        let cost_per_minute = match env::var("COST_PER_MINUTE") {
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "COST_PER_MINUTE",
                value,
            })?,
            Err(_) => Decimal::new(50, 2),
        };

        let ffmpeg = env::var("FFMPEG_PATH").ok();
        let ffprobe = env::var("FFPROBE_PATH").ok();
        let tools = ToolPaths::resolve(ffmpeg.as_deref(), ffprobe.as_deref())?;

        Ok(Self {
            redis_host: env::var("REDIS_HOST").unwrap_or_else(|_| String::from("127.0.0.1")),
            redis_port,
            redis_password: env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| String::from("./uploads"))
                .into(),
            processed_dir: env::var("PROCESSED_DIR")
                .unwrap_or_else(|_| String::from("./processed"))
                .into(),
            cost_per_minute,
            tools,
            max_job_attempts: parse_var("MAX_JOB_ATTEMPTS", 3)?,
            backoff_base_ms: parse_var("BACKOFF_BASE_MS", 2000)?,
        })
    }

    pub fn redis_url(&self) -> String {
        match &self.redis_password {
            Some(password) => format!(
                "redis://:{}@{}:{}/",
                password, self.redis_host, self.redis_port
            ),
            None => format!("redis://{}:{}/", self.redis_host, self.redis_port),
        }
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}
