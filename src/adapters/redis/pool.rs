//! Redis connection pool.

use crate::ports::queue::QueueError;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use std::time::Duration;
use tracing::{info, warn};

/// Redis-backed adapter for queue, repository and billing operations.
#[derive(Clone)]
pub struct RedisPool {
    pub(super) pool: Pool,
}

impl RedisPool {
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| QueueError::Broker(e.to_string()))?;
        Ok(Self { pool })
    }

    pub(super) async fn conn(&self) -> Result<Connection, QueueError> {
        self.pool
            .get()
            .await
            .map_err(|e| QueueError::Broker(e.to_string()))
    }

    pub async fn ping(&self) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        deadpool_redis::redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| QueueError::Broker(e.to_string()))?;
        Ok(())
    }

    /// Block worker startup until the broker answers, with bounded
    /// retries; fails fast once they are exhausted.
    pub async fn wait_until_ready(
        &self,
        max_retries: u32,
        delay: Duration,
    ) -> Result<(), QueueError> {
        for attempt in 1..=max_retries {
            match self.ping().await {
                Ok(()) => {
                    info!("connected to Redis");
                    return Ok(());
                }
                Err(e) if attempt < max_retries => {
                    warn!(attempt, max_retries, error = %e, "waiting for Redis");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
        Err(QueueError::Broker("no connection attempts made".to_string()))
    }
}
