//! Redis BillingStore implementation.

use super::billing_key;
use super::pool::RedisPool;
use crate::domain::billing::BillingRecord;
use crate::ports::repository::{BillingStore, StoreError};
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use rust_decimal::Decimal;

fn unavailable(e: deadpool_redis::redis::RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait]
impl BillingStore for RedisPool {
    async fn append(&self, record: &BillingRecord) -> Result<(), StoreError> {
        let mut conn = self
            .conn()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let json = serde_json::to_string(record)?;
        conn.rpush::<_, _, ()>(billing_key(record.user_id), json)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn user_total(&self, user_id: i64) -> Result<Decimal, StoreError> {
        let mut conn = self
            .conn()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let entries: Vec<String> = conn
            .lrange(billing_key(user_id), 0, -1)
            .await
            .map_err(unavailable)?;

        let mut total = Decimal::ZERO;
        for entry in entries {
            let record: BillingRecord = serde_json::from_str(&entry)?;
            total += record.amount;
        }
        Ok(total)
    }
}
