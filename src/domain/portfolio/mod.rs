pub mod bucket_point;
pub mod horizon;
pub mod sample;
pub mod series;

pub use bucket_point::BucketPoint;
pub use horizon::Horizon;
pub use sample::PortfolioSample;
pub use series::{HorizonSeries, SeriesMetadata, SeriesPhase, SeriesState, TimeRange};
