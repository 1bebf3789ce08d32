// Stream bucketing engine
pub mod aggregation;

// Subscriber dispatch between the stream loop and chart consumers
pub mod hub;

// Feed-driven orchestration
pub mod service;
