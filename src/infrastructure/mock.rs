use crate::domain::portfolio::{Horizon, PortfolioSample};
use crate::domain::ports::{FeedEvent, LiveSampleSource, SnapshotLoader};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{
    RwLock,
    mpsc::{self, Receiver, Sender},
};
use tracing::info;

/// In-process stand-in for the SSE feed: emits `Connected` followed by a
/// random-walk portfolio stream. With simulation disabled it emits only
/// `Connected` and waits for scripted `publish` calls, which is what the
/// integration tests use.
#[derive(Clone)]
pub struct MockSampleSource {
    subscribers: Arc<RwLock<Vec<Sender<FeedEvent>>>>,
    simulation_enabled: bool,
    sample_interval: Duration,
}

impl MockSampleSource {
    pub fn new(sample_interval: Duration) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            simulation_enabled: true,
            sample_interval,
        }
    }

    /// Scripted variant: no background stream, events come from `publish`
    pub fn new_no_sim() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            simulation_enabled: false,
            sample_interval: Duration::from_secs(1),
        }
    }

    pub async fn publish(&self, event: FeedEvent) {
        let mut subs = self.subscribers.write().await;

        // retain only active subscribers
        let mut active_subs = Vec::new();
        for tx in subs.iter() {
            if tx.send(event.clone()).await.is_ok() {
                active_subs.push(tx.clone());
            }
        }
        *subs = active_subs;
    }

    fn spawn_simulation(&self, tx: Sender<FeedEvent>) {
        let interval = self.sample_interval;
        tokio::spawn(async move {
            let mut value = 25_000.0_f64;
            let mut pnl = 0.0_f64;
            let bot_count = 5u32;

            if tx.send(FeedEvent::Connected).await.is_err() {
                return;
            }
            info!("mock feed connected, emitting samples every {:?}", interval);

            loop {
                let (drift, active) = {
                    let mut rng = rand::rng();
                    (
                        rng.random_range(-40.0..45.0),
                        rng.random_range(0..=bot_count),
                    )
                };
                value = (value + drift).max(0.0);
                pnl += drift;

                let sample = PortfolioSample {
                    timestamp: Utc::now(),
                    portfolio_value: value,
                    total_pnl: pnl,
                    active_bots: active,
                    bot_count,
                };
                if tx.send(FeedEvent::Sample(sample)).await.is_err() {
                    // subscriber gone
                    return;
                }
                tokio::time::sleep(interval).await;
            }
        });
    }
}

#[async_trait]
impl LiveSampleSource for MockSampleSource {
    async fn subscribe(&self) -> Result<Receiver<FeedEvent>> {
        let (tx, rx) = mpsc::channel(100);
        self.subscribers.write().await.push(tx.clone());

        if self.simulation_enabled {
            self.spawn_simulation(tx);
        }
        Ok(rx)
    }
}

/// `SnapshotLoader` over canned in-memory history, with a switchable
/// failure mode for exercising bootstrap error paths.
pub struct MockSnapshotLoader {
    history: RwLock<Vec<PortfolioSample>>,
    failing: RwLock<bool>,
}

impl MockSnapshotLoader {
    pub fn new(history: Vec<PortfolioSample>) -> Self {
        Self {
            history: RwLock::new(history),
            failing: RwLock::new(false),
        }
    }

    /// Synthesises a gently rising history covering the widest window,
    /// one point per 10 minutes, ending just before `Utc::now()`
    pub fn with_synthetic_history() -> Self {
        let now = Utc::now();
        let step = ChronoDuration::minutes(10);
        let points = Horizon::ThirtyDay.window_minutes() / 10;

        let history = (0..points)
            .map(|i| {
                let back = points - i;
                PortfolioSample {
                    timestamp: now - step * back as i32,
                    portfolio_value: 20_000.0 + i as f64 * 1.5,
                    total_pnl: i as f64 * 1.5,
                    active_bots: 3,
                    bot_count: 5,
                }
            })
            .collect();
        Self::new(history)
    }

    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }
}

#[async_trait]
impl SnapshotLoader for MockSnapshotLoader {
    async fn fetch_history(&self, horizon: Horizon) -> Result<Vec<PortfolioSample>> {
        if *self.failing.read().await {
            anyhow::bail!("mock loader set to fail");
        }

        // Return only what the horizon's window could use; the caller's
        // bootstrap re-filters anyway
        let floor = Utc::now() - horizon.window_width();
        let history = self.history.read().await;
        Ok(history
            .iter()
            .filter(|s| s.timestamp >= floor)
            .cloned()
            .collect())
    }
}
