//! Shared types for kubedeck
//!
//! This crate contains the read models produced by the cluster catalog and
//! consumed by the metrics aggregator and the CLI renderers. All records are
//! owned by the fetch that produced them and replaced wholesale on each
//! refresh; nothing here performs I/O.

use serde::Serialize;

/// Placeholder for a missing string field (internal IP, kubelet version).
pub const UNKNOWN: &str = "Unknown";

/// Placeholder for a missing timestamp.
pub const NOT_AVAILABLE: &str = "N/A";

// ============================================================================
// Resource Kinds
// ============================================================================

/// The resource collections the catalog knows how to address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceKind {
    Namespace,
    Pod,
    Deployment,
    Service,
    Ingress,
    Node,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Namespace => "namespace",
            Self::Pod => "pod",
            Self::Deployment => "deployment",
            Self::Service => "service",
            Self::Ingress => "ingress",
            Self::Node => "node",
        }
    }

    /// Whether resources of this kind live inside a namespace.
    pub fn is_namespaced(&self) -> bool {
        !matches!(self, Self::Namespace | Self::Node)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Namespaces
// ============================================================================

/// Namespace information
#[derive(Clone, Debug, Serialize)]
pub struct NamespaceRecord {
    pub name: String,
    pub phase: String,
    pub created_at: String,
}

impl NamespaceRecord {
    pub fn new(name: String, phase: String, created_at: String) -> Self {
        Self {
            name,
            phase,
            created_at,
        }
    }
}

// ============================================================================
// Pods
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl From<&str> for PodPhase {
    fn from(s: &str) -> Self {
        match s {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

impl PodPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }
}

/// Declared ports of one container, keyed by its image.
#[derive(Clone, Debug, Serialize)]
pub struct ContainerPorts {
    pub image: String,
    pub ports: Vec<i32>,
}

/// Pod information
#[derive(Clone, Debug, Serialize)]
pub struct PodRecord {
    pub name: String,
    pub namespace: String,
    pub phase: PodPhase,
    pub node_name: Option<String>,
    pub container_images: Vec<String>,
    pub container_ports: Vec<ContainerPorts>,
    pub created_at: String,
}

impl PodRecord {
    pub fn new(name: String, namespace: String) -> Self {
        Self {
            name,
            namespace,
            phase: PodPhase::Unknown,
            node_name: None,
            container_images: Vec::new(),
            container_ports: Vec::new(),
            created_at: NOT_AVAILABLE.to_string(),
        }
    }
}

// ============================================================================
// Deployments
// ============================================================================

/// Deployment information
#[derive(Clone, Debug, Serialize)]
pub struct DeploymentRecord {
    pub name: String,
    pub namespace: String,
    pub replicas: i32,
    pub ready_replicas: i32,
    /// The `Available` condition, when the server reported one.
    pub available: Option<bool>,
    pub container_images: Vec<String>,
    /// Container ports declared by the pod template, in declaration order.
    pub ports: Vec<i32>,
    pub created_at: String,
}

impl DeploymentRecord {
    pub fn new(name: String, namespace: String) -> Self {
        Self {
            name,
            namespace,
            replicas: 0,
            ready_replicas: 0,
            available: None,
            container_images: Vec::new(),
            ports: Vec::new(),
            created_at: NOT_AVAILABLE.to_string(),
        }
    }

    /// Format replica status as "ready/total"
    pub fn replica_status(&self) -> String {
        format!("{}/{}", self.ready_replicas, self.replicas)
    }
}

// ============================================================================
// Services and Ingresses
// ============================================================================

/// Service information
#[derive(Clone, Debug, Serialize)]
pub struct ServiceRecord {
    pub name: String,
    pub namespace: String,
    /// Value of the `app` selector label, when the service has one.
    pub app_selector: Option<String>,
    pub ports: Vec<i32>,
    pub created_at: String,
}

/// One host rule of an ingress with its path routings.
#[derive(Clone, Debug, Serialize)]
pub struct IngressRuleRecord {
    pub host: String,
    pub paths: Vec<IngressPathRecord>,
}

/// A single path routing inside an ingress rule.
#[derive(Clone, Debug, Serialize)]
pub struct IngressPathRecord {
    pub service_name: String,
    pub service_port: i32,
}

/// Ingress information
#[derive(Clone, Debug, Serialize)]
pub struct IngressRecord {
    pub name: String,
    pub namespace: String,
    pub created_at: String,
    pub rules: Vec<IngressRuleRecord>,
}

impl IngressRecord {
    /// The service behind the first routed path, used by teardown.
    pub fn backend_service(&self) -> Option<&IngressPathRecord> {
        self.rules.iter().flat_map(|rule| rule.paths.iter()).next()
    }
}

// ============================================================================
// Nodes and Metrics
// ============================================================================

/// Node information with its declared capacity quantities left unparsed.
#[derive(Clone, Debug, Serialize)]
pub struct NodeRecord {
    pub name: String,
    pub internal_ip: String,
    pub kubelet_version: String,
    pub created_at: String,
    pub ready: bool,
    /// Raw capacity quantity, e.g. "4".
    pub capacity_cpu: String,
    /// Raw capacity quantity, e.g. "8194300Ki".
    pub capacity_memory: String,
}

/// Parsed node capacity, static per refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NodeCapacity {
    pub node_name: String,
    pub cpu_milli: i64,
    pub mem_mi: i64,
}

/// Instantaneous node usage as reported by the metrics endpoint, with the
/// quantity strings left unparsed.
#[derive(Clone, Debug, Serialize)]
pub struct NodeUsage {
    pub node_name: String,
    /// Raw usage quantity, e.g. "2000m" or "500n".
    pub cpu: String,
    /// Raw usage quantity, e.g. "2048Mi".
    pub memory: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NodeStatus {
    Ready,
    NotReady,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::NotReady => "NotReady",
        }
    }
}

/// Derived per-node utilization snapshot, recomputed on every refresh tick
/// and never persisted.
#[derive(Clone, Debug, Serialize)]
pub struct NodeSnapshot {
    pub node_name: String,
    pub cpu_pct: u8,
    pub mem_pct: u8,
    pub running_pods: usize,
    pub succeeded_pods: usize,
    pub status: NodeStatus,
    pub internal_ip: String,
    pub kubelet_version: String,
    pub created_at: String,
}

// ============================================================================
// Credentials
// ============================================================================

/// A saved login profile with its token already decrypted for reuse.
#[derive(Clone, Debug, Serialize)]
pub struct Credential {
    pub name: String,
    pub host: String,
    pub token: String,
}

impl Credential {
    pub fn new(name: String, host: String, token: String) -> Self {
        Self { name, host, token }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_phase_from_str() {
        assert_eq!(PodPhase::from("Running"), PodPhase::Running);
        assert_eq!(PodPhase::from("Succeeded"), PodPhase::Succeeded);
        assert_eq!(PodPhase::from("CrashLoopBackOff"), PodPhase::Unknown);
    }

    #[test]
    fn test_replica_status() {
        let mut deployment = DeploymentRecord::new("web".to_string(), "default".to_string());
        deployment.replicas = 3;
        deployment.ready_replicas = 2;
        assert_eq!(deployment.replica_status(), "2/3");
    }

    #[test]
    fn test_backend_service_takes_first_path() {
        let ingress = IngressRecord {
            name: "web-ingress-80".to_string(),
            namespace: "default".to_string(),
            created_at: NOT_AVAILABLE.to_string(),
            rules: vec![IngressRuleRecord {
                host: "example.com".to_string(),
                paths: vec![
                    IngressPathRecord {
                        service_name: "web-svc-80".to_string(),
                        service_port: 80,
                    },
                    IngressPathRecord {
                        service_name: "other".to_string(),
                        service_port: 8080,
                    },
                ],
            }],
        };

        let backend = ingress.backend_service().unwrap();
        assert_eq!(backend.service_name, "web-svc-80");
        assert_eq!(backend.service_port, 80);
    }

    #[test]
    fn test_kind_scoping() {
        assert!(ResourceKind::Pod.is_namespaced());
        assert!(!ResourceKind::Node.is_namespaced());
        assert!(!ResourceKind::Namespace.is_namespaced());
    }
}
