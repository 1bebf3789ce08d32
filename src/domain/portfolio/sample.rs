use crate::domain::errors::AggregationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation of portfolio state pushed by the upstream bot manager.
///
/// Immutable once received; every horizon derives its own bucket points
/// from the same sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSample {
    pub timestamp: DateTime<Utc>,
    pub portfolio_value: f64,
    #[serde(rename = "totalPnL")]
    pub total_pnl: f64,
    pub active_bots: u32,
    pub bot_count: u32,
}

impl PortfolioSample {
    /// Validates the sample at the ingestion boundary.
    ///
    /// A sample that fails validation must never reach `SeriesState`;
    /// callers drop it and report the error, leaving all horizons untouched.
    pub fn validate(&self) -> Result<(), AggregationError> {
        if !self.portfolio_value.is_finite() {
            return Err(AggregationError::MalformedSample {
                reason: format!("non-finite portfolio_value: {}", self.portfolio_value),
            });
        }
        if !self.total_pnl.is_finite() {
            return Err(AggregationError::MalformedSample {
                reason: format!("non-finite total_pnl: {}", self.total_pnl),
            });
        }
        if self.active_bots > self.bot_count {
            return Err(AggregationError::MalformedSample {
                reason: format!(
                    "active_bots {} exceeds bot_count {}",
                    self.active_bots, self.bot_count
                ),
            });
        }
        Ok(())
    }
}
