//! Redis VideoRepository implementation.
//!
//! The status key is the source of truth for lifecycle transitions and is
//! mutated only through conditional scripts, so concurrent deliveries of
//! the same job cannot both claim a transition. The JSON row is rewritten
//! by whichever delivery holds the claim.

use super::pool::RedisPool;
use super::{video_key, video_status_key};
use crate::domain::video::{Video, VideoStatus};
use crate::ports::repository::{ProcessingClaim, StoreError, TranscodeOutcome, VideoRepository};
use async_trait::async_trait;
use chrono::Utc;
use deadpool_redis::redis::{AsyncCommands, Script};
use uuid::Uuid;

const CLAIM_SCRIPT: &str = r#"
local status = redis.call('GET', KEYS[1])
if not status then return 'missing' end
if status == 'completed' then return 'completed' end
redis.call('SET', KEYS[1], 'processing')
return 'claimed'
"#;

const COMPLETE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == 'processing' then
  redis.call('SET', KEYS[1], 'completed')
  return 1
end
return 0
"#;

const FAIL_SCRIPT: &str = r#"
local status = redis.call('GET', KEYS[1])
if status == 'uploading' or status == 'processing' then
  redis.call('SET', KEYS[1], 'failed')
  return 1
end
return 0
"#;

fn unavailable(e: deadpool_redis::redis::RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

impl RedisPool {
    async fn load_video(&self, id: Uuid) -> Result<Option<Video>, StoreError> {
        let mut conn = self
            .conn()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let json: Option<String> = conn.get(video_key(id)).await.map_err(unavailable)?;
        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn store_video(&self, video: &Video) -> Result<(), StoreError> {
        let mut conn = self
            .conn()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let json = serde_json::to_string(video)?;
        conn.set::<_, _, ()>(video_key(video.id), json)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn run_status_script<T: deadpool_redis::redis::FromRedisValue>(
        &self,
        script: &str,
        id: Uuid,
    ) -> Result<T, StoreError> {
        let mut conn = self
            .conn()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Script::new(script)
            .key(video_status_key(id))
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)
    }
}

#[async_trait]
impl VideoRepository for RedisPool {
    async fn create(&self, video: &Video) -> Result<(), StoreError> {
        self.store_video(video).await?;
        let mut conn = self
            .conn()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        conn.set::<_, _, ()>(video_status_key(video.id), video.status.as_str())
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Video>, StoreError> {
        self.load_video(id).await
    }

    async fn begin_processing(&self, id: Uuid) -> Result<ProcessingClaim, StoreError> {
        let verdict: String = self.run_status_script(CLAIM_SCRIPT, id).await?;
        match verdict.as_str() {
            "missing" => Err(StoreError::NotFound(id)),
            "completed" => Ok(ProcessingClaim::AlreadyCompleted),
            _ => {
                if let Some(mut video) = self.load_video(id).await? {
                    video.status = VideoStatus::Processing;
                    video.updated_at = Utc::now();
                    self.store_video(&video).await?;
                }
                Ok(ProcessingClaim::Claimed)
            }
        }
    }

    async fn complete(&self, id: Uuid, outcome: &TranscodeOutcome) -> Result<bool, StoreError> {
        let claimed: i64 = self.run_status_script(COMPLETE_SCRIPT, id).await?;
        if claimed != 1 {
            return Ok(false);
        }

        let mut video = self.load_video(id).await?.ok_or(StoreError::NotFound(id))?;
        video.status = VideoStatus::Completed;
        video.hls_path = Some(outcome.hls_path.clone());
        video.thumbnail_path = outcome.thumbnail_path.clone();
        video.duration = Some(outcome.duration_seconds);
        video.original_resolution = Some(outcome.original_resolution.clone());
        video.available_resolutions = outcome.available_resolutions.clone();
        video.file_path = None;
        video.updated_at = Utc::now();
        self.store_video(&video).await?;
        Ok(true)
    }

    async fn mark_failed(&self, id: Uuid) -> Result<(), StoreError> {
        let changed: i64 = self.run_status_script(FAIL_SCRIPT, id).await?;
        if changed == 1 {
            if let Some(mut video) = self.load_video(id).await? {
                video.status = VideoStatus::Failed;
                video.updated_at = Utc::now();
                self.store_video(&video).await?;
            }
        }
        Ok(())
    }
}
