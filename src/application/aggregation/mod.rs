// Stream-to-chart bucketing engine
pub mod bucket_aggregator;

pub use bucket_aggregator::BucketAggregator;
