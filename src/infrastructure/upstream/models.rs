use crate::domain::errors::AggregationError;
use crate::domain::portfolio::PortfolioSample;
use chrono::DateTime;
use serde::Deserialize;

/// One raw point as the bot-management API serialises it.
///
/// Every field is optional on the wire; conversion rejects points with
/// missing or invalid fields instead of guessing defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHistoryPoint {
    pub timestamp: Option<i64>,
    pub portfolio_value: Option<f64>,
    // Upstream spells this "totalPnL", which camelCase renaming misses
    #[serde(rename = "totalPnL")]
    pub total_pnl: Option<f64>,
    pub active_bots: Option<u32>,
    pub bot_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<RawHistoryPoint>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TryFrom<RawHistoryPoint> for PortfolioSample {
    type Error = AggregationError;

    fn try_from(raw: RawHistoryPoint) -> Result<Self, Self::Error> {
        let timestamp_ms = raw.timestamp.ok_or_else(|| AggregationError::MalformedSample {
            reason: "missing timestamp".to_string(),
        })?;
        let timestamp = DateTime::from_timestamp_millis(timestamp_ms).ok_or_else(|| {
            AggregationError::MalformedSample {
                reason: format!("timestamp out of range: {timestamp_ms}"),
            }
        })?;

        let sample = PortfolioSample {
            timestamp,
            portfolio_value: raw.portfolio_value.ok_or_else(|| {
                AggregationError::MalformedSample {
                    reason: "missing portfolioValue".to_string(),
                }
            })?,
            total_pnl: raw.total_pnl.unwrap_or(0.0),
            active_bots: raw.active_bots.unwrap_or(0),
            bot_count: raw.bot_count.unwrap_or(0),
        };
        sample.validate()?;
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_point_converts() {
        let raw = RawHistoryPoint {
            timestamp: Some(1_704_067_200_000),
            portfolio_value: Some(25_000.0),
            total_pnl: Some(120.0),
            active_bots: Some(2),
            bot_count: Some(4),
        };

        let sample = PortfolioSample::try_from(raw).unwrap();
        assert_eq!(sample.timestamp.timestamp(), 1_704_067_200);
        assert_eq!(sample.portfolio_value, 25_000.0);
    }

    #[test]
    fn test_missing_timestamp_rejected() {
        let raw = RawHistoryPoint {
            timestamp: None,
            portfolio_value: Some(25_000.0),
            total_pnl: None,
            active_bots: None,
            bot_count: None,
        };

        assert!(matches!(
            PortfolioSample::try_from(raw),
            Err(AggregationError::MalformedSample { .. })
        ));
    }

    #[test]
    fn test_missing_value_rejected_but_pnl_defaults() {
        let raw = RawHistoryPoint {
            timestamp: Some(1_704_067_200_000),
            portfolio_value: None,
            total_pnl: None,
            active_bots: None,
            bot_count: None,
        };
        assert!(PortfolioSample::try_from(raw).is_err());

        let raw = RawHistoryPoint {
            timestamp: Some(1_704_067_200_000),
            portfolio_value: Some(9_500.0),
            total_pnl: None,
            active_bots: None,
            bot_count: None,
        };
        let sample = PortfolioSample::try_from(raw).unwrap();
        assert_eq!(sample.total_pnl, 0.0);
    }

    #[test]
    fn test_history_response_shape() {
        let json = r#"{
            "success": true,
            "data": [
                {"timestamp": 1704067200000, "portfolioValue": 25000.0,
                 "totalPnL": 12.5, "activeBots": 1, "botCount": 2}
            ]
        }"#;

        let parsed: HistoryResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].total_pnl, Some(12.5));
    }
}
