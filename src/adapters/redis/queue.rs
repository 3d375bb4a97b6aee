//! Redis JobQueuePort implementation.
//!
//! Per named queue: a waiting list, an active list holding leased entries,
//! a delayed zset scored by redelivery time, and bounded completed/failed
//! lists. Leasing is an atomic `BLMOVE` so a crashed worker leaves its job
//! on the active list for `requeue_orphans` to recover.

use super::pool::RedisPool;
use super::{active_key, completed_key, delayed_key, failed_key, paused_key, waiting_key};
use crate::domain::jobs::{FailedJob, Job, JobState, QueueStats};
use crate::ports::queue::{JobQueuePort, LeasedJob, QueueError};
use async_trait::async_trait;
use chrono::Utc;
use deadpool_redis::redis::{AsyncCommands, Direction};
use std::time::Duration;

/// Due retries promoted per lease call.
const PROMOTE_BATCH: isize = 16;

fn broker(e: deadpool_redis::redis::RedisError) -> QueueError {
    QueueError::Broker(e.to_string())
}

impl RedisPool {
    /// Move retries whose backoff has elapsed back onto the waiting list.
    async fn promote_due(&self, queue: &str) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        let now = Utc::now().timestamp_millis();
        let due: Vec<String> = conn
            .zrangebyscore_limit(delayed_key(queue), "-inf", now, 0, PROMOTE_BATCH)
            .await
            .map_err(broker)?;

        for raw in due {
            // ZREM decides the winner when several workers promote at once.
            let removed: i64 = conn.zrem(delayed_key(queue), &raw).await.map_err(broker)?;
            if removed == 1 {
                conn.lpush::<_, _, ()>(waiting_key(queue), raw)
                    .await
                    .map_err(broker)?;
            }
        }
        Ok(())
    }

    async fn drop_lease(&self, leased: &LeasedJob) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        conn.lrem::<_, _, i64>(active_key(&leased.job.queue), 1, &leased.receipt)
            .await
            .map_err(broker)?;
        Ok(())
    }
}

#[async_trait]
impl JobQueuePort for RedisPool {
    async fn enqueue(&self, job: &Job) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        let json = serde_json::to_string(job)?;
        conn.lpush::<_, _, ()>(waiting_key(&job.queue), json)
            .await
            .map_err(broker)?;
        Ok(())
    }

    async fn lease(&self, queue: &str, timeout: Duration) -> Result<Option<LeasedJob>, QueueError> {
        self.promote_due(queue).await?;

        let mut conn = self.conn().await?;
        // BLMOVE 0 would block forever; keep the poll bounded.
        let timeout_secs = (timeout.as_secs_f64()).max(0.1);
        let raw: Option<String> = conn
            .blmove(
                waiting_key(queue),
                active_key(queue),
                Direction::Right,
                Direction::Left,
                timeout_secs,
            )
            .await
            .map_err(broker)?;

        match raw {
            Some(raw) => {
                let job: Job = serde_json::from_str(&raw)?;
                Ok(Some(LeasedJob { job, receipt: raw }))
            }
            None => Ok(None),
        }
    }

    async fn complete(&self, leased: &LeasedJob) -> Result<(), QueueError> {
        self.drop_lease(leased).await?;

        let retain = leased.job.opts.retain_completed as isize;
        if retain > 0 {
            let mut conn = self.conn().await?;
            let mut done = leased.job.clone();
            done.state = JobState::Completed;
            let json = serde_json::to_string(&done)?;
            let key = completed_key(&leased.job.queue);
            conn.lpush::<_, _, ()>(&key, json).await.map_err(broker)?;
            conn.ltrim::<_, ()>(&key, 0, retain - 1).await.map_err(broker)?;
        }
        Ok(())
    }

    async fn retry(&self, leased: &LeasedJob, delay: Duration) -> Result<(), QueueError> {
        self.drop_lease(leased).await?;

        let mut conn = self.conn().await?;
        let mut job = leased.job.clone();
        job.state = JobState::Waiting;
        let json = serde_json::to_string(&job)?;
        let due = Utc::now().timestamp_millis() + delay.as_millis() as i64;
        conn.zadd::<_, _, _, ()>(delayed_key(&leased.job.queue), json, due)
            .await
            .map_err(broker)?;
        Ok(())
    }

    async fn fail(&self, leased: &LeasedJob, error: &str) -> Result<(), QueueError> {
        self.drop_lease(leased).await?;

        let retain = leased.job.opts.retain_failed as isize;
        if retain > 0 {
            let mut conn = self.conn().await?;
            let mut job = leased.job.clone();
            job.state = JobState::Failed;
            let record = FailedJob {
                job,
                error: error.to_string(),
            };
            let json = serde_json::to_string(&record)?;
            let key = failed_key(&leased.job.queue);
            conn.lpush::<_, _, ()>(&key, json).await.map_err(broker)?;
            conn.ltrim::<_, ()>(&key, 0, retain - 1).await.map_err(broker)?;
        }
        Ok(())
    }

    async fn requeue_orphans(&self, queue: &str) -> Result<u64, QueueError> {
        let mut conn = self.conn().await?;
        let mut recovered = 0u64;
        loop {
            let moved: Option<String> = conn
                .lmove(
                    active_key(queue),
                    waiting_key(queue),
                    Direction::Right,
                    Direction::Left,
                )
                .await
                .map_err(broker)?;
            if moved.is_none() {
                break;
            }
            recovered += 1;
        }
        Ok(recovered)
    }

    async fn pause(&self, queue: &str) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        conn.set::<_, _, ()>(paused_key(queue), 1i64)
            .await
            .map_err(broker)?;
        Ok(())
    }

    async fn resume(&self, queue: &str) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(paused_key(queue)).await.map_err(broker)?;
        Ok(())
    }

    async fn is_paused(&self, queue: &str) -> Result<bool, QueueError> {
        let mut conn = self.conn().await?;
        conn.exists(paused_key(queue)).await.map_err(broker)
    }

    async fn drain(&self, queue: &str) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(&[waiting_key(queue), delayed_key(queue), active_key(queue)])
            .await
            .map_err(broker)?;
        Ok(())
    }

    async fn stats(&self, queue: &str) -> Result<QueueStats, QueueError> {
        let mut conn = self.conn().await?;
        let waiting: u64 = conn.llen(waiting_key(queue)).await.map_err(broker)?;
        let delayed: u64 = conn.zcard(delayed_key(queue)).await.map_err(broker)?;
        let active: u64 = conn.llen(active_key(queue)).await.map_err(broker)?;
        let completed: u64 = conn.llen(completed_key(queue)).await.map_err(broker)?;
        let failed: u64 = conn.llen(failed_key(queue)).await.map_err(broker)?;
        Ok(QueueStats {
            waiting: waiting + delayed,
            active,
            completed,
            failed,
        })
    }
}
