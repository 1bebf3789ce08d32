use crate::application::aggregation::BucketAggregator;
use crate::application::hub::SeriesHub;
use crate::domain::errors::AggregationError;
use crate::domain::portfolio::{Horizon, HorizonSeries, PortfolioSample};
use crate::domain::ports::{FeedEvent, LiveSampleSource, SnapshotLoader};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tracing::{info, warn};

/// Commands the presentation layer can send into the stream loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartCommand {
    /// Discard and rebuild one horizon's series (range switch in the UI)
    RefreshHorizon(Horizon),
}

/// Drives the aggregation engine off the live feed.
///
/// Single event loop: every feed event and command is handled to
/// completion before the next one, so each four-horizon update is one
/// synchronous step and no snapshot can observe a half-applied sample.
pub struct ChartStreamService {
    source: Arc<dyn LiveSampleSource>,
    loader: Arc<dyn SnapshotLoader>,
    aggregator: BucketAggregator,
    hub: SeriesHub,
}

impl ChartStreamService {
    pub fn new(source: Arc<dyn LiveSampleSource>, loader: Arc<dyn SnapshotLoader>) -> Self {
        Self {
            source,
            loader,
            aggregator: BucketAggregator::new(),
            hub: SeriesHub::new(),
        }
    }

    /// Handle to the dispatch hub for subscribing chart consumers
    pub fn hub(&self) -> SeriesHub {
        self.hub.clone()
    }

    /// Current read snapshot for one horizon
    pub fn series(&self, horizon: Horizon) -> HorizonSeries {
        self.aggregator.series(horizon)
    }

    /// Runs until the feed closes. `commands` is optional; pass one to
    /// let the presentation layer request horizon refreshes.
    pub async fn run(mut self, mut commands: Option<Receiver<ChartCommand>>) -> Result<()> {
        let mut feed = self.source.subscribe().await?;
        info!("chart stream service started");

        loop {
            tokio::select! {
                event = feed.recv() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => break,
                    }
                }
                cmd = recv_opt(&mut commands) => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        // Command channel closed; stop polling it
                        None => commands = None,
                    }
                }
            }
        }

        info!("feed closed, chart stream service stopping");
        Ok(())
    }

    pub async fn handle_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Connected => {
                info!("feed connected, bootstrapping all horizons");
                self.bootstrap_all().await;
            }
            FeedEvent::Sample(sample) => self.handle_sample(&sample).await,
            FeedEvent::Disconnected => {
                info!("feed disconnected, discarding series state");
                self.aggregator.reset_all();
            }
        }
    }

    pub async fn handle_command(&mut self, cmd: ChartCommand) {
        match cmd {
            ChartCommand::RefreshHorizon(horizon) => {
                self.aggregator.reset(horizon);
                self.bootstrap_horizon(horizon).await;
            }
        }
    }

    async fn handle_sample(&mut self, sample: &PortfolioSample) {
        match self.aggregator.ingest(sample) {
            Ok(0) => {
                // Stale for every horizon (e.g. replay across a reconnect)
            }
            Ok(_) => {
                for horizon in Horizon::all() {
                    self.hub.publish(&self.aggregator.series(horizon)).await;
                }
            }
            Err(err @ AggregationError::MalformedSample { .. }) => {
                warn!(error = %err, "dropping malformed sample");
            }
            Err(err) => {
                warn!(error = %err, "sample rejected");
            }
        }
    }

    /// Bootstraps every horizon; one horizon's failure never blocks the
    /// others, it just leaves that series flagged unsuccessful until the
    /// transport's reconnect policy gets a clean fetch through.
    async fn bootstrap_all(&mut self) {
        for horizon in Horizon::all() {
            self.bootstrap_horizon(horizon).await;
        }
    }

    async fn bootstrap_horizon(&mut self, horizon: Horizon) {
        match self.loader.fetch_history(horizon).await {
            Ok(history) => {
                self.aggregator.bootstrap(horizon, &history, Utc::now());
            }
            Err(err) => {
                let err = AggregationError::BootstrapFailure {
                    horizon: horizon.to_string(),
                    reason: err.to_string(),
                };
                warn!(error = %err, "bootstrap failed, keeping prior state");
                self.aggregator.mark_bootstrap_failed(horizon);
            }
        }
        self.hub.publish(&self.aggregator.series(horizon)).await;
    }
}

/// `select!`-friendly receive on an optional command channel that never
/// resolves when no channel was supplied
async fn recv_opt(rx: &mut Option<Receiver<ChartCommand>>) -> Option<ChartCommand> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
