use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four fixed chart time ranges the dashboard renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDay,
    #[serde(rename = "30d")]
    ThirtyDay,
}

impl Horizon {
    /// Width of one historical bucket, in minutes
    pub fn bucket_minutes(&self) -> i64 {
        match self {
            Horizon::OneHour => 5,
            Horizon::OneDay => 30,
            Horizon::SevenDay => 60,
            Horizon::ThirtyDay => 720,
        }
    }

    /// Total retained duration, in minutes
    pub fn window_minutes(&self) -> i64 {
        match self {
            Horizon::OneHour => 60,
            Horizon::OneDay => 24 * 60,
            Horizon::SevenDay => 7 * 24 * 60,
            Horizon::ThirtyDay => 30 * 24 * 60,
        }
    }

    /// Capacity for historical buckets; one extra slot is always
    /// reserved for the live point, so the full series holds at most
    /// `max_historical_points() + 1` entries.
    pub fn max_historical_points(&self) -> usize {
        match self {
            Horizon::OneHour => 11,
            Horizon::OneDay => 47,
            Horizon::SevenDay => 167,
            Horizon::ThirtyDay => 59,
        }
    }

    pub fn bucket_width(&self) -> Duration {
        Duration::minutes(self.bucket_minutes())
    }

    pub fn window_width(&self) -> Duration {
        Duration::minutes(self.window_minutes())
    }

    /// Converts to the range string the upstream API and dashboard use
    pub fn as_range_str(&self) -> &'static str {
        match self {
            Horizon::OneHour => "1h",
            Horizon::OneDay => "24h",
            Horizon::SevenDay => "7d",
            Horizon::ThirtyDay => "30d",
        }
    }

    /// Returns all horizons in ascending range order
    pub fn all() -> [Horizon; 4] {
        [
            Horizon::OneHour,
            Horizon::OneDay,
            Horizon::SevenDay,
            Horizon::ThirtyDay,
        ]
    }

    /// Returns the aligned start of the bucket containing the given instant
    ///
    /// Alignment is done on epoch milliseconds, so bucket boundaries are
    /// multiples of `bucket_width()` from the Unix epoch (midnight-UTC
    /// aligned for the 720-minute buckets).
    pub fn bucket_start(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let width_ms = self.bucket_width().num_milliseconds();
        let ts_ms = at.timestamp_millis();
        let aligned = ts_ms - ts_ms.rem_euclid(width_ms);
        DateTime::from_timestamp_millis(aligned).unwrap_or(at)
    }

    /// Checks whether the given instant falls exactly on a bucket boundary
    pub fn is_bucket_start(&self, at: DateTime<Utc>) -> bool {
        at.timestamp_millis()
            .rem_euclid(self.bucket_width().num_milliseconds())
            == 0
    }
}

impl FromStr for Horizon {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "1h" | "1hour" | "onehour" => Ok(Horizon::OneHour),
            "24h" | "1d" | "oneday" => Ok(Horizon::OneDay),
            "7d" | "sevenday" | "1w" => Ok(Horizon::SevenDay),
            "30d" | "thirtyday" | "1mo" => Ok(Horizon::ThirtyDay),
            _ => Err(anyhow!(
                "Invalid horizon: '{}'. Valid options: 1h, 24h, 7d, 30d",
                s
            )),
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_range_str())
    }
}
