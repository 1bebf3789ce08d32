use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while aggregating the live portfolio stream.
///
/// None of these are fatal: a malformed sample is dropped before any
/// series is touched, a stale sample is skipped for the affected horizon
/// only, and a failed bootstrap leaves the horizon in its prior (or
/// empty) state until the transport retries.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("Malformed sample: {reason}")]
    MalformedSample { reason: String },

    #[error("Stale sample for {horizon}: {timestamp} precedes acceptance floor {floor}")]
    StaleSample {
        horizon: String,
        timestamp: DateTime<Utc>,
        floor: DateTime<Utc>,
    },

    #[error("Bootstrap failed for {horizon}: {reason}")]
    BootstrapFailure { horizon: String, reason: String },
}
