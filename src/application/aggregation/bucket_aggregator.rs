use crate::domain::errors::AggregationError;
use crate::domain::portfolio::{Horizon, HorizonSeries, PortfolioSample, SeriesState};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Converts the irregular live sample stream into bounded, time-ordered
/// chart series for every horizon.
///
/// One `SeriesState` per horizon, driven uniformly off the horizon table;
/// no per-horizon branching. The aggregator owns all series exclusively
/// and hands out read snapshots only.
pub struct BucketAggregator {
    series: HashMap<Horizon, SeriesState>,
}

impl BucketAggregator {
    pub fn new() -> Self {
        Self {
            series: Horizon::all()
                .into_iter()
                .map(|h| (h, SeriesState::new(h)))
                .collect(),
        }
    }

    /// Processes one live sample across all four horizons.
    ///
    /// A malformed sample is rejected before any series is touched. A
    /// stale sample is skipped for the affected horizon only; the other
    /// horizons still update. Returns how many horizons accepted the
    /// sample.
    pub fn ingest(&mut self, sample: &PortfolioSample) -> Result<usize, AggregationError> {
        sample.validate()?;

        let mut accepted = 0;
        for horizon in Horizon::all() {
            let state = self
                .series
                .get_mut(&horizon)
                .expect("series exist for every horizon by construction");
            match state.ingest(sample) {
                Ok(()) => accepted += 1,
                Err(AggregationError::StaleSample {
                    timestamp, floor, ..
                }) => {
                    debug!(%horizon, %timestamp, %floor, "skipping stale sample");
                }
                Err(other) => {
                    // ingest only raises StaleSample today; anything else
                    // still must not abort the remaining horizons
                    warn!(%horizon, error = %other, "sample rejected");
                }
            }
        }
        Ok(accepted)
    }

    /// Seeds one horizon from a bulk-loaded history. Idempotent for the
    /// same input and `now`.
    pub fn bootstrap(
        &mut self,
        horizon: Horizon,
        raw_history: &[PortfolioSample],
        now: DateTime<Utc>,
    ) {
        let state = self
            .series
            .get_mut(&horizon)
            .expect("series exist for every horizon by construction");
        state.bootstrap(raw_history, now);
        debug!(
            %horizon,
            loaded = state.historical().len(),
            raw = raw_history.len(),
            "bootstrapped horizon"
        );
    }

    /// Records a failed bulk load; the horizon keeps its prior (or empty)
    /// data and reports `success = false` until the next recovery.
    pub fn mark_bootstrap_failed(&mut self, horizon: Horizon) {
        if let Some(state) = self.series.get_mut(&horizon) {
            state.mark_bootstrap_failed();
        }
    }

    /// Discards one horizon's state (horizon switch); others are untouched
    pub fn reset(&mut self, horizon: Horizon) {
        if let Some(state) = self.series.get_mut(&horizon) {
            state.reset();
        }
    }

    /// Discards everything (reconnect)
    pub fn reset_all(&mut self) {
        for state in self.series.values_mut() {
            state.reset();
        }
    }

    /// Read snapshot for one horizon
    pub fn series(&self, horizon: Horizon) -> HorizonSeries {
        self.series
            .get(&horizon)
            .expect("series exist for every horizon by construction")
            .snapshot()
    }

    /// Read snapshots for all horizons, in ascending range order
    pub fn all_series(&self) -> Vec<HorizonSeries> {
        Horizon::all()
            .into_iter()
            .map(|h| self.series(h))
            .collect()
    }

    /// Direct state access for one horizon (tests and diagnostics)
    pub fn state(&self, horizon: Horizon) -> &SeriesState {
        self.series
            .get(&horizon)
            .expect("series exist for every horizon by construction")
    }
}

impl Default for BucketAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::SeriesPhase;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_704_067_200 + secs, 0).unwrap()
    }

    fn sample(secs: i64, value: f64) -> PortfolioSample {
        PortfolioSample {
            timestamp: at(secs),
            portfolio_value: value,
            total_pnl: value - 10_000.0,
            active_bots: 1,
            bot_count: 3,
        }
    }

    #[test]
    fn test_ingest_updates_all_horizons() {
        let mut agg = BucketAggregator::new();
        let accepted = agg.ingest(&sample(0, 10_000.0)).unwrap();

        assert_eq!(accepted, 4);
        for horizon in Horizon::all() {
            assert_eq!(agg.state(horizon).phase(), SeriesPhase::LiveOnly);
        }
    }

    #[test]
    fn test_malformed_sample_touches_nothing() {
        let mut agg = BucketAggregator::new();
        agg.ingest(&sample(0, 10_000.0)).unwrap();

        let mut bad = sample(60, 10_100.0);
        bad.portfolio_value = f64::NAN;
        let err = agg.ingest(&bad).unwrap_err();
        assert!(matches!(err, AggregationError::MalformedSample { .. }));

        // Live points everywhere still carry the first sample
        for horizon in Horizon::all() {
            let live = agg.state(horizon).live().unwrap();
            assert_eq!(live.timestamp, at(0));
        }
    }

    #[test]
    fn test_stale_sample_skips_horizon_without_aborting_others() {
        let mut agg = BucketAggregator::new();
        // Bootstrap only 1h, with a cutoff two hours in
        agg.bootstrap(Horizon::OneHour, &[], at(7200));

        // Old enough to be stale for 1h, fresh enough for the rest
        let accepted = agg.ingest(&sample(3000, 10_000.0)).unwrap();
        assert_eq!(accepted, 3);
        assert!(agg.state(Horizon::OneHour).live().is_none());
        assert!(agg.state(Horizon::OneDay).live().is_some());
    }

    #[test]
    fn test_reset_is_horizon_local() {
        let mut agg = BucketAggregator::new();
        agg.ingest(&sample(0, 10_000.0)).unwrap();
        agg.ingest(&sample(301, 10_100.0)).unwrap();

        agg.reset(Horizon::OneHour);
        assert_eq!(agg.state(Horizon::OneHour).phase(), SeriesPhase::Empty);
        assert_eq!(
            agg.state(Horizon::OneDay).phase(),
            SeriesPhase::LiveOnly,
            "24h series must be unaffected by a 1h reset"
        );
    }

    #[test]
    fn test_one_bucket_per_boundary_not_per_sample() {
        let mut agg = BucketAggregator::new();
        // 30 samples one minute apart; 24h horizon uses 30-minute buckets
        for i in 0..30 {
            agg.ingest(&sample(i * 60, 10_000.0 + i as f64)).unwrap();
        }

        // All 30 samples fall inside the first 30-minute bucket: nothing
        // frozen for 24h until minute 30 arrives
        assert!(agg.state(Horizon::OneDay).historical().is_empty());

        agg.ingest(&sample(30 * 60, 10_030.0)).unwrap();
        assert_eq!(agg.state(Horizon::OneDay).historical().len(), 1);
        // Frozen bucket carries the minute-29 live values at the 0s slot
        let frozen = &agg.state(Horizon::OneDay).historical()[0];
        assert_eq!(frozen.timestamp, at(0));
        assert_eq!(frozen.portfolio_value, 10_029.0);
    }

    #[test]
    fn test_series_snapshot_is_a_copy() {
        let mut agg = BucketAggregator::new();
        agg.ingest(&sample(0, 10_000.0)).unwrap();

        let mut snap = agg.series(Horizon::OneHour);
        snap.data.clear();

        // Mutating the snapshot must not reach the owned state
        assert!(agg.state(Horizon::OneHour).live().is_some());
        assert_eq!(agg.series(Horizon::OneHour).metadata.total_points, 1);
    }

    #[test]
    fn test_retention_over_long_run() {
        let mut agg = BucketAggregator::new();
        // Three simulated days, one sample every 10 minutes
        let total = 3 * 24 * 6;
        for i in 0..total {
            agg.ingest(&sample(i * 600, 10_000.0)).unwrap();
        }

        let last = at((total - 1) * 600);
        for horizon in Horizon::all() {
            let floor = last - horizon.window_width();
            let state = agg.state(horizon);
            assert!(state.historical().len() <= horizon.max_historical_points());
            assert!(
                state.historical().iter().all(|p| p.timestamp >= floor),
                "{horizon}: bucket older than window floor {floor}"
            );
        }
    }
}
