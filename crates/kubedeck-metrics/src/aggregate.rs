//! Per-node utilization aggregation.
//!
//! One aggregation pass combines three feeds fetched in the same refresh
//! cycle: node records (capacity, readiness, addresses), node usages from the
//! metrics endpoint, and the pod list. The pass is stateless; callers keep
//! their own node-name-to-panel mapping across refreshes.

use std::collections::HashMap;

use tracing::warn;

use kubedeck_types::{
    NodeCapacity, NodeRecord, NodeSnapshot, NodeStatus, NodeUsage, PodPhase, PodRecord,
};

use crate::quantity;

/// Result of one aggregation pass.
#[derive(Clone, Debug, Default)]
pub struct Aggregation {
    /// One snapshot per node present in both the usage and capacity feeds.
    pub snapshots: Vec<NodeSnapshot>,

    /// Node names from the usage feed that had no capacity entry. These
    /// produce no snapshot; callers should surface them instead of letting
    /// panels vanish without a trace.
    pub unmatched: Vec<String>,
}

/// Parses node capacities into an index keyed by node name.
///
/// A node whose capacity quantities do not parse is skipped with a warning;
/// one bad node never aborts the batch.
pub fn index_capacity(nodes: &[NodeRecord]) -> HashMap<String, NodeCapacity> {
    let mut index = HashMap::new();

    for node in nodes {
        let cpu_milli = match quantity::cpu_capacity_milli(&node.capacity_cpu) {
            Ok(value) => value,
            Err(err) => {
                warn!("skipping capacity of node {}: {}", node.name, err);
                continue;
            }
        };
        let mem_mi = match quantity::memory_mi(&node.capacity_memory) {
            Ok(value) => value,
            Err(err) => {
                warn!("skipping capacity of node {}: {}", node.name, err);
                continue;
            }
        };

        index.insert(
            node.name.clone(),
            NodeCapacity {
                node_name: node.name.clone(),
                cpu_milli,
                mem_mi,
            },
        );
    }

    index
}

/// Combines capacity, usage and pod feeds into per-node snapshots.
pub fn aggregate(nodes: &[NodeRecord], usages: &[NodeUsage], pods: &[PodRecord]) -> Aggregation {
    let capacity = index_capacity(nodes);
    let records: HashMap<&str, &NodeRecord> =
        nodes.iter().map(|node| (node.name.as_str(), node)).collect();
    let phases = index_pod_phases(pods);

    let mut aggregation = Aggregation::default();

    for usage in usages {
        let Some(cap) = capacity.get(&usage.node_name) else {
            warn!(
                "usage reported for node {} with no capacity entry",
                usage.node_name
            );
            aggregation.unmatched.push(usage.node_name.clone());
            continue;
        };

        let cpu_nano = match quantity::cpu_usage_nano(&usage.cpu) {
            Ok(value) => value,
            Err(err) => {
                warn!("skipping usage of node {}: {}", usage.node_name, err);
                continue;
            }
        };
        let mem_mi = match quantity::memory_mi(&usage.memory) {
            Ok(value) => value,
            Err(err) => {
                warn!("skipping usage of node {}: {}", usage.node_name, err);
                continue;
            }
        };

        let (running, succeeded) = phases
            .get(usage.node_name.as_str())
            .copied()
            .unwrap_or((0, 0));

        // The usage feed only carries names also present in `nodes` once
        // capacity matched, so the record lookup is a formality.
        let Some(record) = records.get(usage.node_name.as_str()) else {
            aggregation.unmatched.push(usage.node_name.clone());
            continue;
        };

        aggregation.snapshots.push(NodeSnapshot {
            node_name: usage.node_name.clone(),
            cpu_pct: percentage(cpu_nano, cap.cpu_milli * 1_000_000),
            mem_pct: percentage(mem_mi, cap.mem_mi),
            running_pods: running,
            succeeded_pods: succeeded,
            status: if record.ready {
                NodeStatus::Ready
            } else {
                NodeStatus::NotReady
            },
            internal_ip: record.internal_ip.clone(),
            kubelet_version: record.kubelet_version.clone(),
            created_at: record.created_at.clone(),
        });
    }

    aggregation
}

/// Counts running and succeeded pods per node. Pods without a scheduled node
/// are excluded from every grouping.
fn index_pod_phases(pods: &[PodRecord]) -> HashMap<&str, (usize, usize)> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

    for pod in pods {
        let Some(node_name) = pod.node_name.as_deref() else {
            continue;
        };
        let entry = counts.entry(node_name).or_default();
        match pod.phase {
            PodPhase::Running => entry.0 += 1,
            PodPhase::Succeeded => entry.1 += 1,
            _ => {}
        }
    }

    counts
}

/// Rounded utilization percentage, clamped to 0..=100; zero or negative
/// capacity yields 0 instead of a division fault.
fn percentage(used: i64, total: i64) -> u8 {
    if total <= 0 {
        return 0;
    }

    (used as f64 / total as f64 * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, cpu: &str, memory: &str) -> NodeRecord {
        NodeRecord {
            name: name.to_string(),
            internal_ip: "10.0.0.4".to_string(),
            kubelet_version: "v1.29.1".to_string(),
            created_at: "01/03/2025 09:30".to_string(),
            ready: true,
            capacity_cpu: cpu.to_string(),
            capacity_memory: memory.to_string(),
        }
    }

    fn usage(name: &str, cpu: &str, memory: &str) -> NodeUsage {
        NodeUsage {
            node_name: name.to_string(),
            cpu: cpu.to_string(),
            memory: memory.to_string(),
        }
    }

    fn pod(name: &str, node: Option<&str>, phase: PodPhase) -> PodRecord {
        let mut pod = PodRecord::new(name.to_string(), "default".to_string());
        pod.node_name = node.map(String::from);
        pod.phase = phase;
        pod
    }

    #[test]
    fn test_percentage_rounding_and_zero_capacity() {
        assert_eq!(percentage(2_000_000_000, 4_000 * 1_000_000), 50);
        assert_eq!(percentage(1, 0), 0);
        assert_eq!(percentage(5_000_000_000, 4_000 * 1_000_000), 100);
    }

    #[test]
    fn test_aggregate_end_to_end() {
        let nodes = vec![node("worker-1", "4", "8194300Ki")];
        let usages = vec![usage("worker-1", "2000m", "2048Mi")];
        let pods = vec![
            pod("web-1", Some("worker-1"), PodPhase::Running),
            pod("web-2", Some("worker-1"), PodPhase::Running),
            pod("job-1", Some("worker-1"), PodPhase::Succeeded),
            pod("pending-1", Some("worker-1"), PodPhase::Pending),
            pod("unscheduled", None, PodPhase::Running),
        ];

        let aggregation = aggregate(&nodes, &usages, &pods);
        assert!(aggregation.unmatched.is_empty());
        assert_eq!(aggregation.snapshots.len(), 1);

        let snapshot = &aggregation.snapshots[0];
        assert_eq!(snapshot.cpu_pct, 50);
        assert_eq!(snapshot.mem_pct, 26);
        assert_eq!(snapshot.running_pods, 2);
        assert_eq!(snapshot.succeeded_pods, 1);
        assert_eq!(snapshot.status, NodeStatus::Ready);
    }

    #[test]
    fn test_usage_without_capacity_is_surfaced() {
        let nodes = vec![node("worker-1", "4", "8194300Ki")];
        let usages = vec![
            usage("worker-1", "500m", "1024Mi"),
            usage("ghost", "500m", "1024Mi"),
        ];

        let aggregation = aggregate(&nodes, &usages, &[]);
        assert_eq!(aggregation.snapshots.len(), 1);
        assert_eq!(aggregation.unmatched, vec!["ghost".to_string()]);
    }

    #[test]
    fn test_malformed_usage_skips_node_only() {
        let nodes = vec![
            node("worker-1", "4", "8194300Ki"),
            node("worker-2", "2", "4194304Ki"),
        ];
        let usages = vec![
            usage("worker-1", "garbage", "2048Mi"),
            usage("worker-2", "1000m", "1024Mi"),
        ];

        let aggregation = aggregate(&nodes, &usages, &[]);
        assert_eq!(aggregation.snapshots.len(), 1);
        assert_eq!(aggregation.snapshots[0].node_name, "worker-2");
        assert_eq!(aggregation.snapshots[0].cpu_pct, 50);
        assert_eq!(aggregation.snapshots[0].mem_pct, 25);
    }

    #[test]
    fn test_malformed_capacity_drops_node_into_unmatched() {
        let nodes = vec![node("worker-1", "not-a-quantity", "8194300Ki")];
        let usages = vec![usage("worker-1", "500m", "1024Mi")];

        let aggregation = aggregate(&nodes, &usages, &[]);
        assert!(aggregation.snapshots.is_empty());
        assert_eq!(aggregation.unmatched, vec!["worker-1".to_string()]);
    }

    #[test]
    fn test_not_ready_node() {
        let mut bad = node("worker-1", "4", "8194300Ki");
        bad.ready = false;

        let aggregation = aggregate(&[bad], &[usage("worker-1", "0", "0")], &[]);
        assert_eq!(aggregation.snapshots[0].status, NodeStatus::NotReady);
    }
}
