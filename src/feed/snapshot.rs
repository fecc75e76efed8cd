//! REST order book snapshots

use std::time::Duration;
use tracing::info;

use crate::error::Result;
use crate::parser::DepthMessage;

/// Fetches initial order book snapshots from the REST API
#[derive(Debug, Clone)]
pub struct SnapshotClient {
    client: reqwest::Client,
    rest_endpoint: String,
    limit: usize,
    timeout: Duration,
}

impl SnapshotClient {
    pub fn new(rest_endpoint: &str, limit: usize, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            rest_endpoint: rest_endpoint.trim_end_matches('/').to_string(),
            limit,
            timeout,
        }
    }

    pub fn depth_url(&self, symbol: &str) -> String {
        format!(
            "{}/depth?symbol={}&limit={}",
            self.rest_endpoint, symbol, self.limit
        )
    }

    /// Fetch the current book for a symbol
    pub async fn fetch(&self, symbol: &str) -> Result<DepthMessage> {
        let url = self.depth_url(symbol);
        info!(symbol = %symbol, url = %url, "Fetching order book snapshot");

        let snapshot = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json::<DepthMessage>()
            .await?;

        Ok(snapshot)
    }
}
