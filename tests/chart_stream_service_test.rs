use chrono::{Duration as ChronoDuration, Utc};
use portstream::application::hub::SeriesListener;
use portstream::application::service::{ChartCommand, ChartStreamService};
use portstream::domain::portfolio::{Horizon, HorizonSeries, PortfolioSample};
use portstream::domain::ports::{FeedEvent, LiveSampleSource};
use portstream::infrastructure::mock::{MockSampleSource, MockSnapshotLoader};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

struct CollectingListener {
    snapshots: Arc<Mutex<Vec<HorizonSeries>>>,
}

impl SeriesListener for CollectingListener {
    fn on_series(&self, series: &HorizonSeries) {
        self.snapshots.lock().unwrap().push(series.clone());
    }
}

fn recent_sample(seconds_ago: i64, value: f64) -> PortfolioSample {
    PortfolioSample {
        timestamp: Utc::now() - ChronoDuration::seconds(seconds_ago),
        portfolio_value: value,
        total_pnl: value - 25_000.0,
        active_bots: 2,
        bot_count: 3,
    }
}

fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn connect_bootstrap_then_live_updates() -> anyhow::Result<()> {
    init_test_logging();

    // History: one point per minute over the last 2 hours
    let history: Vec<_> = (1..=120)
        .map(|i| recent_sample(i * 60, 25_000.0 - i as f64))
        .collect();
    let source = Arc::new(MockSampleSource::new_no_sim());
    let loader = Arc::new(MockSnapshotLoader::new(history));

    let mut service = ChartStreamService::new(source, loader);
    let snapshots = Arc::new(Mutex::new(Vec::new()));
    service
        .hub()
        .subscribe(Arc::new(CollectingListener {
            snapshots: Arc::clone(&snapshots),
        }))
        .await;

    service.handle_event(FeedEvent::Connected).await;

    // Bootstrap published one snapshot per horizon
    assert_eq!(snapshots.lock().unwrap().len(), 4);
    let one_hour = service.series(Horizon::OneHour);
    assert!(one_hour.success);
    assert!(!one_hour.data.is_empty());
    assert!(one_hour.data.iter().all(|p| !p.is_live));

    // A live sample lands on every horizon and republishes all four
    service
        .handle_event(FeedEvent::Sample(recent_sample(0, 25_500.0)))
        .await;
    assert_eq!(snapshots.lock().unwrap().len(), 8);

    let one_hour = service.series(Horizon::OneHour);
    let last = one_hour.data.last().unwrap();
    assert!(last.is_live);
    assert_eq!(last.portfolio_value, 25_500.0);
    Ok(())
}

#[tokio::test]
async fn bootstrap_failure_isolates_and_flags_series() -> anyhow::Result<()> {
    init_test_logging();

    let source = Arc::new(MockSampleSource::new_no_sim());
    let loader = Arc::new(MockSnapshotLoader::new(vec![recent_sample(600, 25_000.0)]));

    let mut service = ChartStreamService::new(source, Arc::clone(&loader) as _);

    loader.set_failing(true).await;
    service.handle_event(FeedEvent::Connected).await;

    // Every horizon degraded to "no data" with the failure flag, no panic
    for horizon in Horizon::all() {
        let series = service.series(horizon);
        assert!(!series.success);
        assert!(series.data.is_empty());
    }

    // Live ingestion still works while bootstraps are failing
    service
        .handle_event(FeedEvent::Sample(recent_sample(0, 25_100.0)))
        .await;
    let series = service.series(Horizon::OneHour);
    assert!(series.success);
    assert_eq!(series.metadata.total_points, 1);

    // Recovery: a refresh command rebuilds from the now-healthy loader
    loader.set_failing(false).await;
    service
        .handle_command(ChartCommand::RefreshHorizon(Horizon::OneHour))
        .await;
    let series = service.series(Horizon::OneHour);
    assert!(series.success);
    assert!(!series.data.is_empty());
    Ok(())
}

#[tokio::test]
async fn disconnect_resets_and_reconnect_rebootstraps() -> anyhow::Result<()> {
    init_test_logging();

    let history: Vec<_> = (1..=60)
        .map(|i| recent_sample(i * 60, 25_000.0))
        .collect();
    let source = Arc::new(MockSampleSource::new_no_sim());
    let loader = Arc::new(MockSnapshotLoader::new(history));

    let mut service = ChartStreamService::new(source, loader);

    service.handle_event(FeedEvent::Connected).await;
    service
        .handle_event(FeedEvent::Sample(recent_sample(0, 25_200.0)))
        .await;
    assert!(service.series(Horizon::OneHour).data.last().unwrap().is_live);

    service.handle_event(FeedEvent::Disconnected).await;
    for horizon in Horizon::all() {
        assert_eq!(service.series(horizon).metadata.total_points, 0);
    }

    service.handle_event(FeedEvent::Connected).await;
    let series = service.series(Horizon::OneHour);
    assert!(series.success);
    assert!(!series.data.is_empty(), "reconnect must replay bootstrap");
    Ok(())
}

#[tokio::test]
async fn run_loop_consumes_scripted_feed() -> anyhow::Result<()> {
    init_test_logging();

    let source = Arc::new(MockSampleSource::new_no_sim());
    let loader = Arc::new(MockSnapshotLoader::new(Vec::new()));

    let service = ChartStreamService::new(
        Arc::clone(&source) as Arc<dyn LiveSampleSource>,
        loader,
    );
    let hub = service.hub();

    let snapshots = Arc::new(Mutex::new(Vec::new()));
    hub.subscribe(Arc::new(CollectingListener {
        snapshots: Arc::clone(&snapshots),
    }))
    .await;

    let handle = tokio::spawn(service.run(None));
    // Let the run loop subscribe before publishing
    sleep(Duration::from_millis(50)).await;

    source.publish(FeedEvent::Connected).await;
    source
        .publish(FeedEvent::Sample(recent_sample(0, 25_050.0)))
        .await;
    sleep(Duration::from_millis(100)).await;

    handle.abort();

    let collected = snapshots.lock().unwrap();
    assert_eq!(collected.len(), 8, "4 bootstrap + 4 live snapshots");
    assert!(collected.iter().take(4).all(|s| s.data.is_empty()));
    assert!(
        collected
            .iter()
            .skip(4)
            .all(|s| s.data.last().unwrap().is_live)
    );
    Ok(())
}
