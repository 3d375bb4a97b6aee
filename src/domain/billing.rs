//! Usage billing: rounded-up per-minute charges.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Billed minutes for a measured duration: always rounded up.
///
/// Any fractional second over a whole minute buys the next minute
/// (600.001s is 11 minutes), while exact multiples are not padded
/// (120s is exactly 2 minutes).
pub fn rounded_minutes(seconds: f64) -> u64 {
    if seconds <= 0.0 {
        return 0;
    }
    (seconds / 60.0).ceil() as u64
}

/// Amount owed for a measured duration at the given per-minute rate.
pub fn charge_amount(seconds: f64, cost_per_minute: Decimal) -> Decimal {
    Decimal::from(rounded_minutes(seconds)) * cost_per_minute
}

/// One immutable, append-only charge tied to a single video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRecord {
    pub user_id: i64,
    pub video_id: Uuid,
    /// Exact probed duration, sub-second precision preserved.
    pub seconds_processed: Decimal,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl BillingRecord {
    pub fn new(user_id: i64, video_id: Uuid, exact_seconds: f64, cost_per_minute: Decimal) -> Self {
        Self {
            user_id,
            video_id,
            seconds_processed: Decimal::from_f64_retain(exact_seconds).unwrap_or_default(),
            amount: charge_amount(exact_seconds, cost_per_minute),
            created_at: Utc::now(),
        }
    }
}

/// Aggregate owed by one user; zero when they have no records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTotal {
    pub total: Decimal,
    pub currency: String,
}
