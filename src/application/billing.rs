//! Usage-based billing over an append-only charge ledger.

use crate::domain::billing::{BillingRecord, UserTotal};
use crate::ports::repository::{BillingStore, StoreError};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const CURRENCY: &str = "USD";

pub struct BillingService<B> {
    store: Arc<B>,
    cost_per_minute: Decimal,
}

impl<B: BillingStore> BillingService<B> {
    pub fn new(store: Arc<B>, cost_per_minute: Decimal) -> Self {
        Self {
            store,
            cost_per_minute,
        }
    }

    /// Record one charge for a processed video. Callers gate this on the
    /// completion claim so a redelivered job never charges twice.
    pub async fn charge(
        &self,
        user_id: i64,
        video_id: Uuid,
        exact_seconds: f64,
    ) -> Result<BillingRecord, StoreError> {
        let record = BillingRecord::new(user_id, video_id, exact_seconds, self.cost_per_minute);
        self.store.append(&record).await?;
        info!(
            user_id,
            video = %video_id,
            seconds = exact_seconds,
            amount = %record.amount,
            "usage charged"
        );
        Ok(record)
    }

    pub async fn user_total(&self, user_id: i64) -> Result<UserTotal, StoreError> {
        let total = self.store.user_total(user_id).await?;
        Ok(UserTotal {
            total,
            currency: CURRENCY.to_string(),
        })
    }
}
