// Snapshot source trait for metrics retrieval
use crate::domain::metrics::ClusterSnapshot;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed metrics document: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the metrics document for the whole cluster, or for one member
    /// when `server` is given.
    async fn fetch(&self, server: Option<&str>) -> Result<ClusterSnapshot, FetchError>;
}
