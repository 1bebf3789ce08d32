// Bot-management API adapter
pub mod history_client;
pub mod models;

pub use history_client::UpstreamHistoryClient;
