use crate::domain::portfolio::sample::PortfolioSample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One rendered chart point.
///
/// Historical points sit on bucket boundaries and hold the last value
/// known as of that slot's close; the live point carries the raw
/// timestamp of the newest sample and `is_live = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketPoint {
    pub timestamp: DateTime<Utc>,
    pub portfolio_value: f64,
    #[serde(rename = "totalPnL")]
    pub total_pnl: f64,
    pub active_bots: u32,
    pub bot_count: u32,
    pub is_live: bool,
}

impl BucketPoint {
    /// Builds the live point for a freshly ingested sample
    pub fn live(sample: &PortfolioSample) -> Self {
        Self {
            timestamp: sample.timestamp,
            portfolio_value: sample.portfolio_value,
            total_pnl: sample.total_pnl,
            active_bots: sample.active_bots,
            bot_count: sample.bot_count,
            is_live: true,
        }
    }

    /// Freezes this point into history at the given bucket boundary
    pub fn frozen_at(&self, bucket_start: DateTime<Utc>) -> Self {
        Self {
            timestamp: bucket_start,
            is_live: false,
            ..self.clone()
        }
    }

    /// Builds a historical point directly from a bulk-loaded sample
    pub fn historical(sample: &PortfolioSample, bucket_start: DateTime<Utc>) -> Self {
        Self {
            timestamp: bucket_start,
            portfolio_value: sample.portfolio_value,
            total_pnl: sample.total_pnl,
            active_bots: sample.active_bots,
            bot_count: sample.bot_count,
            is_live: false,
        }
    }
}
