use crate::domain::errors::AggregationError;
use crate::domain::portfolio::bucket_point::BucketPoint;
use crate::domain::portfolio::horizon::Horizon;
use crate::domain::portfolio::sample::PortfolioSample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Lifecycle of one horizon's series.
///
/// The phase is tracked explicitly rather than inferred from the bucket
/// vector, so the first-sample and bootstrap-before-first-sample edge
/// cases stay unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesPhase {
    /// No data at all (fresh connection or after reset)
    Empty,
    /// Bootstrap delivered historical buckets; no live sample yet
    HistoryOnly,
    /// First live sample arrived before (or without) any history
    LiveOnly,
    /// Steady state: historical buckets plus a live point
    LiveWithHistory,
}

/// Inclusive time span covered by a series snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesMetadata {
    pub total_points: usize,
    pub time_range: Option<TimeRange>,
    pub bucket_width_secs: i64,
}

/// Read snapshot of one horizon's series, as consumed by the dashboard.
///
/// `success = false` means the horizon's last bootstrap failed and the
/// data (possibly empty) is whatever survived from before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorizonSeries {
    pub success: bool,
    pub horizon: Horizon,
    pub data: Vec<BucketPoint>,
    pub metadata: SeriesMetadata,
}

/// Mutable aggregation state for one horizon.
///
/// Owns an ordered run of bucket-aligned historical points plus at most
/// one live point. The concatenation `historical ++ [live]` is always
/// non-decreasing in timestamp, historical timestamps are unique and
/// bucket-aligned, and the historical length never exceeds
/// `horizon.max_historical_points()`.
#[derive(Debug, Clone)]
pub struct SeriesState {
    horizon: Horizon,
    historical: Vec<BucketPoint>,
    live: Option<BucketPoint>,
    phase: SeriesPhase,
    /// `now` of the most recent successful bootstrap; samples strictly
    /// older than this instant are stale replays and must be ignored
    bootstrap_cutoff: Option<DateTime<Utc>>,
    bootstrap_failed: bool,
}

impl SeriesState {
    pub fn new(horizon: Horizon) -> Self {
        Self {
            horizon,
            historical: Vec::new(),
            live: None,
            phase: SeriesPhase::Empty,
            bootstrap_cutoff: None,
            bootstrap_failed: false,
        }
    }

    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    pub fn phase(&self) -> SeriesPhase {
        self.phase
    }

    pub fn historical(&self) -> &[BucketPoint] {
        &self.historical
    }

    pub fn live(&self) -> Option<&BucketPoint> {
        self.live.as_ref()
    }

    /// Applies one live sample to this horizon.
    ///
    /// The caller is expected to have validated the sample already; this
    /// method only performs the staleness check. On a boundary crossing
    /// the previous live point is frozen into history at the most recent
    /// closed bucket boundary, so each historical bucket holds the state
    /// that was current throughout its interval and the chart never jumps
    /// when a bucket closes.
    pub fn ingest(&mut self, sample: &PortfolioSample) -> Result<(), AggregationError> {
        if let Some(floor) = self.acceptance_floor() {
            if sample.timestamp < floor {
                return Err(AggregationError::StaleSample {
                    horizon: self.horizon.to_string(),
                    timestamp: sample.timestamp,
                    floor,
                });
            }
        }

        let current_bucket_start = self.horizon.bucket_start(sample.timestamp);
        let last_closed = current_bucket_start - self.horizon.bucket_width();

        // Freeze the previous live point into the slot that just closed,
        // but only when this sample actually crossed into a newer bucket.
        // At most one bucket is appended per sample, so skipped boundaries
        // leave gaps rather than back-filled duplicates.
        let slot_unfilled = match self.historical.last() {
            None => true,
            Some(last) => last.timestamp < last_closed,
        };
        if slot_unfilled {
            if let Some(prev_live) = &self.live {
                let prev_bucket = self.horizon.bucket_start(prev_live.timestamp);
                if prev_bucket < current_bucket_start {
                    self.historical.push(prev_live.frozen_at(last_closed));
                }
            }
        }

        // Defensive; construction keeps this ordered already
        self.historical.sort_by_key(|p| p.timestamp);

        let window_floor = sample.timestamp - self.horizon.window_width();
        let before = self.historical.len();
        self.historical.retain(|p| p.timestamp >= window_floor);
        let dropped = before - self.historical.len();
        if dropped > 0 {
            debug!(
                horizon = %self.horizon,
                dropped,
                "dropped historical buckets outside retention window"
            );
        }

        while self.historical.len() > self.horizon.max_historical_points() {
            self.historical.remove(0);
        }

        self.live = Some(BucketPoint::live(sample));
        self.phase = if self.historical.is_empty() {
            SeriesPhase::LiveOnly
        } else {
            SeriesPhase::LiveWithHistory
        };
        self.bootstrap_failed = false;
        Ok(())
    }

    /// Rebuilds the historical buckets from a bulk-loaded series.
    ///
    /// The bucket containing `now` is never populated from bulk history;
    /// that slot belongs to the live point. Within each remaining bucket
    /// the point with the latest raw timestamp wins. The live point is
    /// left unset until the first live sample arrives.
    pub fn bootstrap(&mut self, raw_history: &[PortfolioSample], now: DateTime<Utc>) {
        let window_floor = now - self.horizon.window_width();
        let live_bucket = self.horizon.bucket_start(now);

        // Last-wins per aligned bucket, keyed by bucket start
        let mut grouped: BTreeMap<i64, (DateTime<Utc>, BucketPoint)> = BTreeMap::new();
        for point in raw_history {
            if point.timestamp < window_floor || point.timestamp > now {
                continue;
            }
            let bucket_start = self.horizon.bucket_start(point.timestamp);
            if bucket_start == live_bucket {
                continue;
            }
            let candidate = (point.timestamp, BucketPoint::historical(point, bucket_start));
            match grouped.get(&bucket_start.timestamp_millis()) {
                Some((raw_ts, _)) if *raw_ts >= point.timestamp => {}
                _ => {
                    grouped.insert(bucket_start.timestamp_millis(), candidate);
                }
            }
        }

        let mut buckets: Vec<BucketPoint> = grouped.into_values().map(|(_, p)| p).collect();
        while buckets.len() > self.horizon.max_historical_points() {
            buckets.remove(0);
        }

        self.historical = buckets;
        self.live = None;
        self.phase = if self.historical.is_empty() {
            SeriesPhase::Empty
        } else {
            SeriesPhase::HistoryOnly
        };
        self.bootstrap_cutoff = Some(now);
        self.bootstrap_failed = false;
    }

    /// Marks this horizon's last bootstrap as failed, keeping whatever
    /// data was present before. Surfaced as `success = false` until the
    /// next successful bootstrap or live sample.
    pub fn mark_bootstrap_failed(&mut self) {
        self.bootstrap_failed = true;
    }

    /// Discards everything; used on reconnect and horizon switch
    pub fn reset(&mut self) {
        self.historical.clear();
        self.live = None;
        self.phase = SeriesPhase::Empty;
        self.bootstrap_cutoff = None;
        self.bootstrap_failed = false;
    }

    /// Produces the read snapshot handed to the presentation layer
    pub fn snapshot(&self) -> HorizonSeries {
        let mut data = self.historical.clone();
        if let Some(live) = &self.live {
            data.push(live.clone());
        }

        let time_range = match (data.first(), data.last()) {
            (Some(first), Some(last)) => Some(TimeRange {
                start: first.timestamp,
                end: last.timestamp,
            }),
            _ => None,
        };

        HorizonSeries {
            success: !self.bootstrap_failed,
            horizon: self.horizon,
            metadata: SeriesMetadata {
                total_points: data.len(),
                time_range,
                bucket_width_secs: self.horizon.bucket_width().num_seconds(),
            },
            data,
        }
    }

    /// Oldest sample timestamp this series still accepts: the newest
    /// instant it has seen so far (live point, last historical bucket,
    /// or bootstrap cutoff). Anything strictly older is a replay or
    /// out-of-order delivery and would corrupt the ordering invariant,
    /// so it is dropped. Equal timestamps pass, which is what lets an
    /// identical sample re-ingest as a live-point update.
    fn acceptance_floor(&self) -> Option<DateTime<Utc>> {
        [
            self.live.as_ref().map(|p| p.timestamp),
            self.historical.last().map(|p| p.timestamp),
            self.bootstrap_cutoff,
        ]
        .into_iter()
        .flatten()
        .max()
    }
}
