//! Configuration module for Portstream.
//!
//! Everything is environment-driven. The horizon table itself (bucket
//! widths, retention windows, capacities) is fixed in the domain and is
//! deliberately not configurable here.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use url::Url;

/// Where the live feed and history come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// In-process random-walk feed; no network
    Mock,
    /// Real bot-management API
    Upstream,
}

impl FromStr for FeedMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(FeedMode::Mock),
            "upstream" => Ok(FeedMode::Upstream),
            _ => anyhow::bail!("Invalid FEED_MODE: {}. Must be 'mock' or 'upstream'", s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub feed_mode: FeedMode,
    /// Base URL of the bot-management API (upstream mode only)
    pub upstream_base_url: Url,
    /// Bearer token for the upstream API, if it requires one
    pub upstream_api_token: Option<String>,
    /// Emission interval of the mock feed, in milliseconds
    pub mock_sample_interval_ms: u64,
    /// How often the binary logs a series summary, in seconds
    pub summary_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let feed_mode_str = env::var("FEED_MODE").unwrap_or_else(|_| "mock".to_string());
        let feed_mode = FeedMode::from_str(&feed_mode_str)?;

        let upstream_base_url = env::var("UPSTREAM_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5000/api/".to_string());
        let upstream_base_url = Url::parse(&upstream_base_url)
            .with_context(|| format!("Invalid UPSTREAM_BASE_URL: {upstream_base_url}"))?;

        let upstream_api_token = env::var("UPSTREAM_API_TOKEN").ok().filter(|t| !t.is_empty());

        let mock_sample_interval_ms = env::var("MOCK_SAMPLE_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse::<u64>()
            .context("MOCK_SAMPLE_INTERVAL_MS must be an integer")?;

        let summary_interval_secs = env::var("SUMMARY_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .context("SUMMARY_INTERVAL_SECS must be an integer")?;

        Ok(Self {
            feed_mode,
            upstream_base_url,
            upstream_api_token,
            mock_sample_interval_ms,
            summary_interval_secs,
        })
    }
}
