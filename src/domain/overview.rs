// Cluster overview - gauge summary across members
use super::chart::ClusterOverview;
use super::metrics::{ClusterSnapshot, ServerStats};
use std::collections::BTreeSet;

const CPU: &str = "process.runtime.cpu";
const MAX_MEMORY: &str = "process.runtime.maxMemory";
const TOTAL_MEMORY: &str = "process.runtime.totalMemory";
const AVAILABLE_MEMORY: &str = "process.runtime.availableMemory";
const DISK_CACHE_TOTAL: &str = "process.runtime.diskCacheTotal";
const DISK_CACHE_USED: &str = "process.runtime.diskCacheUsed";
const DISK_TOTAL: &str = "system.disk./.totalSpace";
const DISK_USABLE: &str = "system.disk./.usableSpace";
const CONNECTIONS: &str = "server.connections.actives";
const LATENCY: &str = "distributed.node.latency";
const ONLINE: &str = "ONLINE";

/// Summarize the gauges of every member (or of `server` only).
///
/// CPU and node latency are averaged over members; memory, disk and
/// connection gauges are summed before the percentages are taken.
pub fn summarize(snapshot: &ClusterSnapshot, server: Option<&str>) -> ClusterOverview {
    let members: Vec<&ServerStats> = snapshot
        .cluster_stats
        .iter()
        .filter(|(name, _)| server.is_none_or(|s| s == name.as_str()))
        .map(|(_, stats)| stats)
        .collect();

    if members.is_empty() {
        return ClusterOverview::default();
    }

    let listed: Vec<_> = snapshot
        .members
        .iter()
        .filter(|m| server.is_none_or(|s| s == m.name))
        .collect();
    let online_members = listed
        .iter()
        .filter(|m| m.status.as_deref() == Some(ONLINE))
        .count();
    let databases = listed
        .iter()
        .flat_map(|m| m.databases.iter())
        .collect::<BTreeSet<_>>()
        .len();
    let online_databases = snapshot
        .databases_status
        .values()
        .filter(|statuses| {
            statuses.iter().any(|(member, status)| {
                server.is_none_or(|s| s == member.as_str()) && status.as_str() == Some(ONLINE)
            })
        })
        .count();

    let sum = |name: &str| members.iter().map(|m| m.gauge(name)).sum::<f64>();

    let max_ram = sum(MAX_MEMORY);
    let used_ram = sum(TOTAL_MEMORY) - sum(AVAILABLE_MEMORY);
    let disk_total = sum(DISK_TOTAL);
    let disk_usable = sum(DISK_USABLE);
    let latency: f64 = members.iter().map(|m| m.histogram_average(LATENCY)).sum();

    ClusterOverview {
        servers: members.len(),
        online_members,
        databases,
        online_databases,
        cpu: sum(CPU) / members.len() as f64,
        ram_percent: percent(used_ram, max_ram).floor(),
        used_ram,
        max_ram,
        disk_percent: if disk_total > 0.0 {
            (100.0 - percent(disk_usable, disk_total)).floor()
        } else {
            0.0
        },
        disk_cache_percent: percent(sum(DISK_CACHE_USED), sum(DISK_CACHE_TOTAL)).floor(),
        connections: sum(CONNECTIONS),
        latency: latency / members.len() as f64,
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part * 100.0 / whole } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ClusterSnapshot {
        serde_json::from_str(
            r#"{"clusterStats": {
                "a": {"gauges": {
                    "process.runtime.cpu": 10.0,
                    "process.runtime.maxMemory": 1000,
                    "process.runtime.totalMemory": 600,
                    "process.runtime.availableMemory": 100,
                    "process.runtime.diskCacheTotal": 200,
                    "process.runtime.diskCacheUsed": 50,
                    "system.disk./.totalSpace": 400,
                    "system.disk./.usableSpace": 100,
                    "server.connections.actives": 3
                }, "histograms": {
                    "distributed.node.latency": {"entries": 10, "average": 4.0}
                }},
                "b": {"gauges": {
                    "process.runtime.cpu": 30.0,
                    "process.runtime.maxMemory": 1000,
                    "process.runtime.totalMemory": 400,
                    "process.runtime.availableMemory": 200,
                    "process.runtime.diskCacheTotal": 200,
                    "process.runtime.diskCacheUsed": 150,
                    "system.disk./.totalSpace": 400,
                    "system.disk./.usableSpace": 300,
                    "server.connections.actives": 2
                }, "histograms": {
                    "distributed.node.latency": {"entries": 10, "average": 8.0}
                }}
            },
            "members": [
                {"name": "a", "status": "ONLINE", "databases": ["sales", "hr"]},
                {"name": "b", "status": "STARTING", "databases": ["sales"]}
            ],
            "databasesStatus": {
                "sales": {"a": "ONLINE", "b": "SYNCHRONIZING"},
                "hr": {"a": "OFFLINE", "b": "ONLINE"}
            }}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_cluster_summary() {
        let overview = summarize(&snapshot(), None);
        assert_eq!(overview.servers, 2);
        assert_eq!(overview.online_members, 1);
        assert_eq!(overview.databases, 2);
        assert_eq!(overview.cpu, 20.0);
        assert_eq!(overview.used_ram, 700.0);
        assert_eq!(overview.ram_percent, 35.0);
        assert_eq!(overview.disk_percent, 50.0);
        assert_eq!(overview.disk_cache_percent, 50.0);
        assert_eq!(overview.connections, 5.0);
        assert_eq!(overview.latency, 6.0);
        assert_eq!(overview.online_databases, 2);
    }

    #[test]
    fn test_single_server_summary() {
        let overview = summarize(&snapshot(), Some("a"));
        assert_eq!(overview.servers, 1);
        assert_eq!(overview.online_members, 1);
        assert_eq!(overview.databases, 2);
        assert_eq!(overview.cpu, 10.0);
        assert_eq!(overview.disk_percent, 75.0);
        assert_eq!(overview.latency, 4.0);
        assert_eq!(overview.online_databases, 1);
    }

    #[test]
    fn test_missing_gauges_read_as_zero() {
        let snapshot: ClusterSnapshot =
            serde_json::from_str(r#"{"clusterStats": {"a": {}}}"#).unwrap();
        let overview = summarize(&snapshot, None);
        assert_eq!(overview.servers, 1);
        assert_eq!(overview.ram_percent, 0.0);
        assert_eq!(overview.disk_percent, 0.0);
        assert_eq!(overview.latency, 0.0);
        assert_eq!(overview.online_databases, 0);
        assert_eq!(summarize(&ClusterSnapshot::default(), None), ClusterOverview::default());
    }
}
