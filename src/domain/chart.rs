// Chart-facing models handed to the rendering widget
use serde::Serialize;
use std::time::Duration;

/// Label of the column carrying the x axis (epoch milliseconds).
pub const X_COLUMN: &str = "x";

/// Column-oriented view of one series, as consumed by c3-style `load`/`flow`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartColumn {
    pub label: String,
    pub values: Vec<f64>,
}

impl ChartColumn {
    pub fn new(label: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }
}

/// Incremental update: append the given values, drop `drop_count` points
/// from the head and animate over `duration`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowUpdate {
    pub columns: Vec<ChartColumn>,
    pub drop_count: usize,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Gauge summary of the cluster shown alongside the charts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterOverview {
    pub servers: usize,
    pub online_members: usize,
    pub databases: usize,
    pub online_databases: usize,
    pub cpu: f64,
    pub ram_percent: f64,
    pub used_ram: f64,
    pub max_ram: f64,
    pub disk_percent: f64,
    pub disk_cache_percent: f64,
    pub connections: f64,
    pub latency: f64,
}

/// One frame of a view's feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    /// Full dataset, sent once when the chart is created.
    Load { view: String, columns: Vec<ChartColumn> },
    Flow(FlowUpdate),
    Overview(ClusterOverview),
    Error { message: String },
}
