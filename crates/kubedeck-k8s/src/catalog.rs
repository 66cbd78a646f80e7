//! Typed access to the cluster's resource collections.

use std::collections::BTreeMap;

use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, Namespace, Node, Pod, PodSpec, PodTemplateSpec, Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, Time};
use kube::api::{ApiResource, DeleteParams, DynamicObject, ListParams, PostParams};
use kube::core::GroupVersionKind;
use kube::{Api, ResourceExt};
use tracing::warn;

use kubedeck_types::{
    ContainerPorts, DeploymentRecord, IngressPathRecord, IngressRecord, IngressRuleRecord,
    NOT_AVAILABLE, NamespaceRecord, NodeRecord, NodeUsage, PodPhase, PodRecord, ServiceRecord,
    UNKNOWN,
};

use crate::error::ApiError;
use crate::session::Session;

/// Typed read/write access to the cluster's resource collections.
///
/// Every call goes through the session's authenticated client. Nothing is
/// cached locally; each list rebuilds its records from scratch.
pub struct ResourceCatalog<'a> {
    session: &'a Session,
}

impl<'a> ResourceCatalog<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    fn scoped<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: kube::Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        match namespace {
            Some(ns) => Api::namespaced(self.session.client(), ns),
            None => Api::all(self.session.client()),
        }
    }

    /// Fetch all namespaces from the cluster.
    pub async fn list_namespaces(&self) -> Result<Vec<NamespaceRecord>, ApiError> {
        let api: Api<Namespace> = Api::all(self.session.client());
        let list = api.list(&ListParams::default()).await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(namespace_to_record)
            .collect())
    }

    pub async fn create_namespace(&self, name: &str) -> Result<(), ApiError> {
        let api: Api<Namespace> = Api::all(self.session.client());
        let manifest = Namespace {
            metadata: named(name),
            ..Default::default()
        };
        api.create(&PostParams::default(), &manifest).await?;

        Ok(())
    }

    pub async fn delete_namespace(&self, name: &str) -> Result<(), ApiError> {
        let api: Api<Namespace> = Api::all(self.session.client());
        api.delete(name, &DeleteParams::default()).await?;

        Ok(())
    }

    /// Fetch pods, cluster-wide or from one namespace.
    pub async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<PodRecord>, ApiError> {
        let api: Api<Pod> = self.scoped(namespace);
        let list = api.list(&ListParams::default()).await?;

        Ok(list.items.into_iter().filter_map(pod_to_record).collect())
    }

    pub async fn create_pod(
        &self,
        namespace: &str,
        name: &str,
        image: &str,
        port: Option<i32>,
    ) -> Result<(), ApiError> {
        let api: Api<Pod> = Api::namespaced(self.session.client(), namespace);
        api.create(&PostParams::default(), &pod_manifest(name, image, port))
            .await?;

        Ok(())
    }

    pub async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), ApiError> {
        let api: Api<Pod> = Api::namespaced(self.session.client(), namespace);
        api.delete(name, &DeleteParams::default()).await?;

        Ok(())
    }

    /// Fetch deployments, cluster-wide or from one namespace.
    pub async fn list_deployments(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<DeploymentRecord>, ApiError> {
        let api: Api<Deployment> = self.scoped(namespace);
        let list = api.list(&ListParams::default()).await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(deployment_to_record)
            .collect())
    }

    pub async fn create_deployment(
        &self,
        namespace: &str,
        name: &str,
        replicas: i32,
        containers: &[(String, i32)],
    ) -> Result<(), ApiError> {
        let api: Api<Deployment> = Api::namespaced(self.session.client(), namespace);
        api.create(
            &PostParams::default(),
            &deployment_manifest(name, replicas, containers),
        )
        .await?;

        Ok(())
    }

    pub async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<(), ApiError> {
        let api: Api<Deployment> = Api::namespaced(self.session.client(), namespace);
        api.delete(name, &DeleteParams::default()).await?;

        Ok(())
    }

    /// Fetch services, cluster-wide or from one namespace.
    pub async fn list_services(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<ServiceRecord>, ApiError> {
        let api: Api<Service> = self.scoped(namespace);
        let list = api.list(&ListParams::default()).await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(service_to_record)
            .collect())
    }

    pub(crate) async fn create_service(
        &self,
        namespace: &str,
        manifest: &Service,
    ) -> Result<(), ApiError> {
        let api: Api<Service> = Api::namespaced(self.session.client(), namespace);
        api.create(&PostParams::default(), manifest).await?;

        Ok(())
    }

    pub async fn delete_service(&self, namespace: &str, name: &str) -> Result<(), ApiError> {
        let api: Api<Service> = Api::namespaced(self.session.client(), namespace);
        api.delete(name, &DeleteParams::default()).await?;

        Ok(())
    }

    /// Fetch ingresses, cluster-wide or from one namespace.
    pub async fn list_ingresses(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<IngressRecord>, ApiError> {
        let api: Api<Ingress> = self.scoped(namespace);
        let list = api.list(&ListParams::default()).await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(ingress_to_record)
            .collect())
    }

    pub(crate) async fn create_ingress(
        &self,
        namespace: &str,
        manifest: &Ingress,
    ) -> Result<(), ApiError> {
        let api: Api<Ingress> = Api::namespaced(self.session.client(), namespace);
        api.create(&PostParams::default(), manifest).await?;

        Ok(())
    }

    pub async fn delete_ingress(&self, namespace: &str, name: &str) -> Result<(), ApiError> {
        let api: Api<Ingress> = Api::namespaced(self.session.client(), namespace);
        api.delete(name, &DeleteParams::default()).await?;

        Ok(())
    }

    /// Fetch all nodes with their capacity quantities and readiness.
    pub async fn list_nodes(&self) -> Result<Vec<NodeRecord>, ApiError> {
        let api: Api<Node> = Api::all(self.session.client());
        let list = api.list(&ListParams::default()).await?;

        Ok(list.items.into_iter().filter_map(node_to_record).collect())
    }

    /// Read instantaneous node usage from the metrics API. The collection is
    /// served by the metrics addon rather than a core API group, so it is
    /// reached through a dynamic object type.
    pub async fn list_node_usages(&self) -> Result<Vec<NodeUsage>, ApiError> {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "NodeMetrics");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "nodes");
        let api: Api<DynamicObject> = Api::all_with(self.session.client(), &resource);
        let list = api.list(&ListParams::default()).await?;

        let mut usages = Vec::new();
        for item in list.items {
            let name = item.name_any();
            let Some(cpu) = item.data["usage"]["cpu"].as_str() else {
                warn!("node metrics for {name} carry no cpu usage, skipping");
                continue;
            };
            let Some(memory) = item.data["usage"]["memory"].as_str() else {
                warn!("node metrics for {name} carry no memory usage, skipping");
                continue;
            };
            usages.push(NodeUsage {
                cpu: cpu.to_string(),
                memory: memory.to_string(),
                node_name: name,
            });
        }

        Ok(usages)
    }
}

fn named(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

/// Timestamps render as "dd/mm/yyyy hh:mm"; a missing one as "N/A".
fn format_timestamp(time: Option<&Time>) -> String {
    time.map(|t| t.0.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn namespace_to_record(namespace: Namespace) -> Option<NamespaceRecord> {
    let created_at = format_timestamp(namespace.metadata.creation_timestamp.as_ref());
    let Some(name) = namespace.metadata.name else {
        warn!("namespace without a name in list response, skipping");
        return None;
    };
    let phase = namespace
        .status
        .and_then(|status| status.phase)
        .unwrap_or_else(|| UNKNOWN.to_string());

    Some(NamespaceRecord::new(name, phase, created_at))
}

fn pod_to_record(pod: Pod) -> Option<PodRecord> {
    let Some(name) = pod.metadata.name.clone() else {
        warn!("pod without a name in list response, skipping");
        return None;
    };
    let namespace = pod.metadata.namespace.clone().unwrap_or_default();

    let mut record = PodRecord::new(name, namespace);
    record.created_at = format_timestamp(pod.metadata.creation_timestamp.as_ref());

    if let Some(spec) = pod.spec {
        record.node_name = spec.node_name;
        for container in &spec.containers {
            let image = container
                .image
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string());
            let ports = container
                .ports
                .as_ref()
                .map(|ports| ports.iter().map(|p| p.container_port).collect())
                .unwrap_or_default();
            record.container_images.push(image.clone());
            record.container_ports.push(ContainerPorts { image, ports });
        }
    }

    if let Some(status) = pod.status {
        record.phase = status
            .phase
            .as_deref()
            .map(PodPhase::from)
            .unwrap_or(PodPhase::Unknown);
    }

    Some(record)
}

fn deployment_to_record(deployment: Deployment) -> Option<DeploymentRecord> {
    let Some(name) = deployment.metadata.name.clone() else {
        warn!("deployment without a name in list response, skipping");
        return None;
    };
    let namespace = deployment.metadata.namespace.clone().unwrap_or_default();

    let mut record = DeploymentRecord::new(name, namespace);
    record.created_at = format_timestamp(deployment.metadata.creation_timestamp.as_ref());

    if let Some(spec) = deployment.spec {
        record.replicas = spec.replicas.unwrap_or(0);

        if let Some(pod_spec) = spec.template.spec {
            for container in &pod_spec.containers {
                record.container_images.push(
                    container
                        .image
                        .clone()
                        .unwrap_or_else(|| UNKNOWN.to_string()),
                );
                if let Some(ports) = &container.ports {
                    record.ports.extend(ports.iter().map(|p| p.container_port));
                }
            }
        }
    }

    if let Some(status) = deployment.status {
        record.ready_replicas = status.ready_replicas.unwrap_or(0);
        record.available = status.conditions.and_then(|conditions| {
            conditions
                .into_iter()
                .find(|c| c.type_ == "Available")
                .map(|c| c.status == "True")
        });
    }

    Some(record)
}

fn service_to_record(service: Service) -> Option<ServiceRecord> {
    let Some(name) = service.metadata.name.clone() else {
        warn!("service without a name in list response, skipping");
        return None;
    };
    let namespace = service.metadata.namespace.clone().unwrap_or_default();
    let created_at = format_timestamp(service.metadata.creation_timestamp.as_ref());

    let (app_selector, ports) = service
        .spec
        .map(|spec| {
            let app = spec
                .selector
                .as_ref()
                .and_then(|labels| labels.get("app").cloned());
            let ports = spec
                .ports
                .map(|ports| ports.iter().map(|p| p.port).collect())
                .unwrap_or_default();
            (app, ports)
        })
        .unwrap_or((None, Vec::new()));

    Some(ServiceRecord {
        name,
        namespace,
        app_selector,
        ports,
        created_at,
    })
}

fn ingress_to_record(ingress: Ingress) -> Option<IngressRecord> {
    let Some(name) = ingress.metadata.name.clone() else {
        warn!("ingress without a name in list response, skipping");
        return None;
    };
    let namespace = ingress.metadata.namespace.clone().unwrap_or_default();
    let created_at = format_timestamp(ingress.metadata.creation_timestamp.as_ref());

    let rules = ingress
        .spec
        .and_then(|spec| spec.rules)
        .unwrap_or_default()
        .into_iter()
        .map(|rule| {
            let paths = rule
                .http
                .map(|http| {
                    http.paths
                        .into_iter()
                        .filter_map(|path| {
                            let service = path.backend.service?;
                            Some(IngressPathRecord {
                                service_name: service.name,
                                service_port: service.port.and_then(|p| p.number).unwrap_or(0),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            IngressRuleRecord {
                host: rule.host.unwrap_or_default(),
                paths,
            }
        })
        .collect();

    Some(IngressRecord {
        name,
        namespace,
        created_at,
        rules,
    })
}

fn node_to_record(node: Node) -> Option<NodeRecord> {
    let Some(name) = node.metadata.name.clone() else {
        warn!("node without a name in list response, skipping");
        return None;
    };
    let created_at = format_timestamp(node.metadata.creation_timestamp.as_ref());

    let Some(status) = node.status else {
        warn!("node {name} has no status, skipping");
        return None;
    };

    let internal_ip = status
        .addresses
        .as_ref()
        .and_then(|addresses| {
            addresses
                .iter()
                .find(|a| a.type_ == "InternalIP")
                .map(|a| a.address.clone())
        })
        .unwrap_or_else(|| UNKNOWN.to_string());

    let kubelet_version = status
        .node_info
        .as_ref()
        .map(|info| info.kubelet_version.clone())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let ready = status.conditions.as_ref().is_some_and(|conditions| {
        conditions
            .iter()
            .any(|c| c.type_ == "Ready" && c.status == "True")
    });

    let capacity = status.capacity.unwrap_or_default();
    let capacity_cpu = capacity
        .get("cpu")
        .map(|q| q.0.clone())
        .unwrap_or_else(|| "0".to_string());
    let capacity_memory = capacity
        .get("memory")
        .map(|q| q.0.clone())
        .unwrap_or_else(|| "0".to_string());

    Some(NodeRecord {
        name,
        internal_ip,
        kubelet_version,
        created_at,
        ready,
        capacity_cpu,
        capacity_memory,
    })
}

/// Single-container pod manifest in the shape the create command submits.
fn pod_manifest(name: &str, image: &str, port: Option<i32>) -> Pod {
    let ports = port.map(|number| {
        vec![ContainerPort {
            container_port: number,
            ..Default::default()
        }]
    });

    Pod {
        metadata: named(name),
        spec: Some(PodSpec {
            containers: vec![Container {
                name: name.to_lowercase(),
                image: Some(image.to_string()),
                ports,
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Deployment manifest selecting `app=<name>`, one container per
/// image/port pair.
fn deployment_manifest(name: &str, replicas: i32, containers: &[(String, i32)]) -> Deployment {
    let labels = BTreeMap::from([("app".to_string(), name.to_string())]);

    let containers = containers
        .iter()
        .map(|(image, port)| Container {
            name: container_name(image),
            image: Some(image.clone()),
            ports: Some(vec![ContainerPort {
                container_port: *port,
                ..Default::default()
            }]),
            ..Default::default()
        })
        .collect();

    Deployment {
        metadata: named(name),
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers,
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Container name derived from an image reference: tag stripped, path
/// separators and dots flattened to dashes.
fn container_name(image: &str) -> String {
    image.split(':').next().unwrap_or(image).replace(['/', '.'], "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{NodeAddress, NodeCondition, NodeStatus, NodeSystemInfo};
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use k8s_openapi::chrono::{TimeZone, Utc};

    #[test]
    fn test_container_name_from_image() {
        assert_eq!(container_name("nginx:1.27"), "nginx");
        assert_eq!(container_name("registry.io/team/app:v2"), "registry-io-team-app");
        assert_eq!(container_name("redis"), "redis");
    }

    #[test]
    fn test_format_timestamp() {
        let time = Time(Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap());
        assert_eq!(format_timestamp(Some(&time)), "01/03/2025 09:30");
        assert_eq!(format_timestamp(None), NOT_AVAILABLE);
    }

    #[test]
    fn test_pod_manifest_without_port() {
        let pod = pod_manifest("Web-1", "nginx:1.27", None);
        let spec = pod.spec.unwrap();
        assert_eq!(pod.metadata.name.as_deref(), Some("Web-1"));
        assert_eq!(spec.containers[0].name, "web-1");
        assert!(spec.containers[0].ports.is_none());
    }

    #[test]
    fn test_deployment_manifest_selector_and_ports() {
        let manifest = deployment_manifest("web-dp", 3, &[("nginx:1.27".to_string(), 8080)]);
        let spec = manifest.spec.unwrap();

        assert_eq!(spec.replicas, Some(3));
        let selector = spec.selector.match_labels.unwrap();
        assert_eq!(selector.get("app").map(String::as_str), Some("web-dp"));

        let template_spec = spec.template.spec.unwrap();
        assert_eq!(template_spec.containers[0].name, "nginx");
        assert_eq!(
            template_spec.containers[0].ports.as_ref().unwrap()[0].container_port,
            8080
        );
    }

    #[test]
    fn test_node_to_record_with_placeholders() {
        let node = Node {
            metadata: named("worker-1"),
            status: Some(NodeStatus {
                capacity: Some(BTreeMap::from([
                    ("cpu".to_string(), Quantity("4".to_string())),
                    ("memory".to_string(), Quantity("8194300Ki".to_string())),
                ])),
                conditions: Some(vec![NodeCondition {
                    type_: "Ready".to_string(),
                    status: "True".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let record = node_to_record(node).unwrap();
        assert_eq!(record.name, "worker-1");
        assert!(record.ready);
        assert_eq!(record.internal_ip, UNKNOWN);
        assert_eq!(record.kubelet_version, UNKNOWN);
        assert_eq!(record.created_at, NOT_AVAILABLE);
        assert_eq!(record.capacity_cpu, "4");
        assert_eq!(record.capacity_memory, "8194300Ki");
    }

    #[test]
    fn test_node_to_record_reads_addresses_and_info() {
        let node = Node {
            metadata: named("worker-2"),
            status: Some(NodeStatus {
                addresses: Some(vec![
                    NodeAddress {
                        type_: "Hostname".to_string(),
                        address: "worker-2".to_string(),
                    },
                    NodeAddress {
                        type_: "InternalIP".to_string(),
                        address: "10.0.0.7".to_string(),
                    },
                ]),
                node_info: Some(NodeSystemInfo {
                    kubelet_version: "v1.29.1".to_string(),
                    ..Default::default()
                }),
                conditions: Some(vec![NodeCondition {
                    type_: "Ready".to_string(),
                    status: "False".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let record = node_to_record(node).unwrap();
        assert_eq!(record.internal_ip, "10.0.0.7");
        assert_eq!(record.kubelet_version, "v1.29.1");
        assert!(!record.ready);
    }

    #[test]
    fn test_pod_to_record_collects_container_ports() {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("web-1".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            spec: Some(PodSpec {
                node_name: Some("worker-1".to_string()),
                containers: vec![Container {
                    name: "web".to_string(),
                    image: Some("nginx:1.27".to_string()),
                    ports: Some(vec![ContainerPort {
                        container_port: 8080,
                        ..Default::default()
                    }]),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            status: Some(k8s_openapi::api::core::v1::PodStatus {
                phase: Some("Running".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let record = pod_to_record(pod).unwrap();
        assert_eq!(record.phase, PodPhase::Running);
        assert_eq!(record.node_name.as_deref(), Some("worker-1"));
        assert_eq!(record.container_images, vec!["nginx:1.27".to_string()]);
        assert_eq!(record.container_ports[0].ports, vec![8080]);
    }
}
