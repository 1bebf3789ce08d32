//! Portstream - headless portfolio chart stream
//!
//! Drives the bucket aggregation engine off a live feed and logs a
//! per-horizon series summary at a fixed interval. The dashboard itself
//! subscribes to the same hub; this binary is what runs next to it in
//! development and on the server.
//!
//! # Usage
//! ```sh
//! FEED_MODE=mock cargo run
//! ```
//!
//! # Environment Variables
//! - `FEED_MODE` - 'mock' or 'upstream' (default: mock)
//! - `UPSTREAM_BASE_URL` - bot-management API base URL (upstream mode)
//! - `UPSTREAM_API_TOKEN` - optional bearer token for the upstream API
//! - `SUMMARY_INTERVAL_SECS` - seconds between logged summaries (default: 30)

use anyhow::Result;
use portstream::application::hub::{SeriesHub, SeriesListener};
use portstream::application::service::ChartStreamService;
use portstream::config::{Config, FeedMode};
use portstream::domain::portfolio::HorizonSeries;
use portstream::domain::ports::{LiveSampleSource, SnapshotLoader};
use portstream::infrastructure::UpstreamHistoryClient;
use portstream::infrastructure::mock::{MockSampleSource, MockSnapshotLoader};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

/// Keeps the latest snapshot per horizon and logs it on a timer
struct SummaryListener {
    latest: Arc<RwLock<Vec<HorizonSeries>>>,
}

impl SeriesListener for SummaryListener {
    fn on_series(&self, series: &HorizonSeries) {
        let latest = Arc::clone(&self.latest);
        let series = series.clone();
        tokio::spawn(async move {
            let mut guard = latest.write().await;
            guard.retain(|s| s.horizon != series.horizon);
            guard.push(series);
        });
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Portstream {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!("Configuration loaded: FeedMode={:?}", config.feed_mode);

    let (source, loader): (Arc<dyn LiveSampleSource>, Arc<dyn SnapshotLoader>) =
        match config.feed_mode {
            FeedMode::Mock => (
                Arc::new(MockSampleSource::new(Duration::from_millis(
                    config.mock_sample_interval_ms,
                ))),
                Arc::new(MockSnapshotLoader::with_synthetic_history()),
            ),
            FeedMode::Upstream => (
                // The SSE transport adapter plugs in here; the mock feed
                // stands in until the dashboard gateway exposes it
                Arc::new(MockSampleSource::new(Duration::from_millis(
                    config.mock_sample_interval_ms,
                ))),
                Arc::new(UpstreamHistoryClient::new(
                    config.upstream_base_url.clone(),
                    config.upstream_api_token.clone(),
                )),
            ),
        };

    let service = ChartStreamService::new(source, loader);
    let hub: SeriesHub = service.hub();

    let latest = Arc::new(RwLock::new(Vec::new()));
    hub.subscribe(Arc::new(SummaryListener {
        latest: Arc::clone(&latest),
    }))
    .await;

    let summary_interval = Duration::from_secs(config.summary_interval_secs);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(summary_interval).await;
            let snapshots = latest.read().await;
            for series in snapshots.iter() {
                info!(
                    horizon = %series.horizon,
                    points = series.metadata.total_points,
                    success = series.success,
                    "series summary"
                );
            }
        }
    });

    let service_handle = tokio::spawn(service.run(None));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping");
    service_handle.abort();
    Ok(())
}
