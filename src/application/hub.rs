use crate::domain::portfolio::HorizonSeries;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Receives a fresh series snapshot whenever a horizon changes
pub trait SeriesListener: Send + Sync {
    fn on_series(&self, series: &HorizonSeries);
}

/// Dispatch hub between the aggregation loop and the presentation layer.
///
/// Listeners are registered in an explicit table keyed by subscription
/// id; there is no ambient registry. Published snapshots are owned
/// clones, so a listener can never reach back into aggregator state.
pub struct SeriesHub {
    listeners: Arc<RwLock<HashMap<Uuid, Arc<dyn SeriesListener>>>>,
}

impl SeriesHub {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers a listener; the returned id is the unsubscribe handle
    pub async fn subscribe(&self, listener: Arc<dyn SeriesListener>) -> Uuid {
        let id = Uuid::new_v4();
        self.listeners.write().await.insert(id, listener);
        id
    }

    /// Removes a listener; returns false if the id was unknown
    pub async fn unsubscribe(&self, id: Uuid) -> bool {
        self.listeners.write().await.remove(&id).is_some()
    }

    /// Publishes one horizon's snapshot to all listeners
    pub async fn publish(&self, series: &HorizonSeries) {
        let listeners = self.listeners.read().await;
        for listener in listeners.values() {
            listener.on_series(series);
        }
    }

    /// Get count of subscribers (for testing)
    pub async fn subscriber_count(&self) -> usize {
        self.listeners.read().await.len()
    }
}

impl Default for SeriesHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SeriesHub {
    fn clone(&self) -> Self {
        Self {
            listeners: Arc::clone(&self.listeners),
        }
    }
}
