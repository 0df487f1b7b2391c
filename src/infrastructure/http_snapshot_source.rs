// HTTP snapshot source against the database server's stats endpoint
use crate::application::snapshot_source::{FetchError, SnapshotSource};
use crate::domain::metrics::ClusterSnapshot;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSnapshotSource {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn stats_url(&self, server: Option<&str>) -> String {
        match server {
            Some(name) => format!(
                "{}/distributed/stats/{}",
                self.base_url,
                urlencoding::encode(name)
            ),
            None => format!("{}/distributed/stats", self.base_url),
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self, server: Option<&str>) -> Result<ClusterSnapshot, FetchError> {
        let url = self.stats_url(server);
        tracing::debug!("Fetching metrics from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
