// Metric readings as published by the database server
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One reading of one tracked metric, aggregated over every matching key.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl MetricSample {
    pub fn new(name: String, timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            name,
            timestamp,
            value,
        }
    }
}

/// Per-second rate derived from two consecutive samples of the same metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatePoint {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub rate: f64,
}

impl RatePoint {
    pub fn new(name: String, timestamp: DateTime<Utc>, rate: f64) -> Self {
        Self {
            name,
            timestamp,
            rate,
        }
    }
}

/// Flat view of absolute metric values at one instant, keyed by dotted name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterSnapshot {
    pub taken_at: DateTime<Utc>,
    pub values: BTreeMap<String, f64>,
}

impl CounterSnapshot {
    pub fn new(taken_at: DateTime<Utc>) -> Self {
        Self {
            taken_at,
            values: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    fn accumulate(&mut self, name: &str, value: f64) {
        *self.values.entry(name.to_string()).or_insert(0.0) += value;
    }
}

/// A single meter or gauge value. The server sends bare numbers for most
/// counters, but some entries carry an object (`count` for meters, `last`
/// for sampled statistics) or a numeric string. Anything else reads as zero.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Counted { count: f64 },
    Sampled { last: f64 },
    Text(String),
    Other(serde_json::Value),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        let value = match self {
            MetricValue::Number(v) => *v,
            MetricValue::Counted { count } => *count,
            MetricValue::Sampled { last } => *last,
            MetricValue::Text(s) => s.trim().parse().unwrap_or(0.0),
            MetricValue::Other(_) => 0.0,
        };
        if value.is_finite() { value } else { 0.0 }
    }
}

/// Metrics of one cluster member.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerStats {
    #[serde(default)]
    pub meters: HashMap<String, MetricValue>,
    #[serde(default)]
    pub gauges: HashMap<String, MetricValue>,
    #[serde(default)]
    pub histograms: HashMap<String, serde_json::Value>,
}

impl ServerStats {
    /// Gauge value by exact name, zero when absent.
    pub fn gauge(&self, name: &str) -> f64 {
        self.gauges.get(name).map(MetricValue::as_f64).unwrap_or(0.0)
    }

    /// `average` of a histogram, zero when the histogram or the field is absent.
    pub fn histogram_average(&self, name: &str) -> f64 {
        self.histograms
            .get(name)
            .and_then(|h| h.get("average"))
            .and_then(serde_json::Value::as_f64)
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ClusterMember {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub databases: Vec<String>,
}

/// The metrics document returned by the server's stats endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub cluster_stats: BTreeMap<String, ServerStats>,
    #[serde(default)]
    pub members: Vec<ClusterMember>,
    /// Database name -> member name -> status (`ONLINE`, `SYNCHRONIZING`, ...).
    #[serde(default)]
    pub databases_status: BTreeMap<String, HashMap<String, serde_json::Value>>,
}

impl ClusterSnapshot {
    /// Flatten meters and gauges into a [`CounterSnapshot`].
    ///
    /// With a server name only that member contributes; an unknown member
    /// yields an empty snapshot. Without one, equal keys are summed across
    /// every member so the cluster behaves like a single large server.
    pub fn counters(&self, server: Option<&str>, taken_at: DateTime<Utc>) -> CounterSnapshot {
        let mut snapshot = CounterSnapshot::new(taken_at);
        let members = self
            .cluster_stats
            .iter()
            .filter(|(name, _)| server.is_none_or(|s| s == name.as_str()));

        for (_, stats) in members {
            for (key, value) in stats.meters.iter().chain(stats.gauges.iter()) {
                snapshot.accumulate(key, value.as_f64());
            }
        }

        snapshot
    }
}
