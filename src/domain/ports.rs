use crate::domain::portfolio::{Horizon, PortfolioSample};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;

/// One event on the live feed, as delivered by the transport layer.
///
/// The transport (SSE, WebSocket, poll) is a collaborator; by the time
/// events reach this seam they are already decoded and ordered.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Transport (re)established; historical state must be rebuilt
    Connected,
    /// One portfolio observation pushed by the upstream service
    Sample(PortfolioSample),
    /// Transport lost; a `Connected` will follow once it recovers
    Disconnected,
}

// Need async_trait for async functions in traits
#[async_trait]
pub trait LiveSampleSource: Send + Sync {
    async fn subscribe(&self) -> Result<Receiver<FeedEvent>>;
}

#[async_trait]
pub trait SnapshotLoader: Send + Sync {
    /// Fetches the bulk historical series for one horizon
    async fn fetch_history(&self, horizon: Horizon) -> Result<Vec<PortfolioSample>>;
}
