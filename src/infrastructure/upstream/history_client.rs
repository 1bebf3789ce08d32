use crate::domain::portfolio::{Horizon, PortfolioSample};
use crate::domain::ports::SnapshotLoader;
use crate::infrastructure::upstream::models::HistoryResponse;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// HTTP `SnapshotLoader` against the bot-management API's
/// `/portfolio/history` endpoint.
pub struct UpstreamHistoryClient {
    client: ClientWithMiddleware,
    base_url: Url,
    api_token: Option<String>,
}

impl UpstreamHistoryClient {
    pub fn new(base_url: Url, api_token: Option<String>) -> Self {
        Self {
            client: build_retrying_client(),
            base_url,
            api_token,
        }
    }
}

/// Transient upstream failures (5xx, timeouts) retry with exponential
/// backoff before a bootstrap is declared failed; the reconnect policy
/// of the transport layer handles anything beyond that.
fn build_retrying_client() -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

    let client = Client::builder()
        .pool_max_idle_per_host(5)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new());

    ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}

#[async_trait]
impl SnapshotLoader for UpstreamHistoryClient {
    async fn fetch_history(&self, horizon: Horizon) -> Result<Vec<PortfolioSample>> {
        let mut url = self
            .base_url
            .join("portfolio/history")
            .context("Invalid upstream base URL")?;
        url.query_pairs_mut()
            .append_pair("range", horizon.as_range_str());

        let mut request = self.client.get(url.as_str());
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("Failed to fetch portfolio history")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("History fetch for {horizon} failed ({status}): {body}");
        }

        let payload: HistoryResponse = response
            .json()
            .await
            .context("Failed to parse portfolio history response")?;

        if !payload.success {
            anyhow::bail!(
                "Upstream rejected history request for {horizon}: {}",
                payload.error.unwrap_or_else(|| "no error detail".to_string())
            );
        }

        let raw_count = payload.data.len();
        let samples: Vec<PortfolioSample> = payload
            .data
            .into_iter()
            .filter_map(|raw| match PortfolioSample::try_from(raw) {
                Ok(sample) => Some(sample),
                Err(err) => {
                    warn!(%horizon, error = %err, "skipping malformed history point");
                    None
                }
            })
            .collect();

        info!(
            %horizon,
            kept = samples.len(),
            raw = raw_count,
            "fetched portfolio history"
        );
        Ok(samples)
    }
}
