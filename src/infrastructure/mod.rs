pub mod mock;
pub mod upstream;

pub use upstream::UpstreamHistoryClient;
