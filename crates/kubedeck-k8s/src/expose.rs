//! Service and Ingress derivation for a deployment's declared ports.
//!
//! Exposing submits the Service first and only attempts the Ingress when a
//! domain was supplied; a failure between the two steps is reported as a
//! distinct partial outcome so callers can tell a half-applied expose from a
//! clean failure. Teardown runs the same two steps in reverse.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::catalog::ResourceCatalog;
use crate::error::ApiError;

/// Possible errors from the expose and teardown workflows.
#[derive(thiserror::Error, Debug)]
pub enum ExposeError {
    /// The Service could not be created; nothing was left behind.
    #[error("service creation failed: {0}")]
    Service(#[source] ApiError),

    /// The Service was created but the Ingress failed; the Service stays in
    /// place.
    #[error("service {service} created, but ingress creation failed: {source}")]
    IngressAfterService {
        service: String,
        #[source]
        source: ApiError,
    },

    /// The Ingress to tear down could not be found.
    #[error("ingress {0} not found")]
    NotFound(String),

    /// The Ingress routes to no Service, so there is nothing to tear down
    /// behind it.
    #[error("ingress {0} has no service backend")]
    NoBackend(String),

    /// The Ingress could not be deleted; its Service was left untouched.
    #[error("ingress deletion failed: {0}")]
    Ingress(#[source] ApiError),

    /// The Ingress was deleted but its Service was not.
    #[error("ingress {ingress} deleted, but service {service} deletion failed: {source}")]
    ServiceAfterIngress {
        ingress: String,
        service: String,
        #[source]
        source: ApiError,
    },
}

impl ExposeError {
    /// Process exit code, carried over from the underlying API category
    /// where one exists.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExposeError::Service(err)
            | ExposeError::IngressAfterService { source: err, .. }
            | ExposeError::Ingress(err)
            | ExposeError::ServiceAfterIngress { source: err, .. } => err.exit_code(),
            ExposeError::NotFound(_) | ExposeError::NoBackend(_) => 4,
        }
    }
}

/// Parameters for exposing a deployment through a Service and an optional
/// Ingress.
#[derive(Clone, Debug)]
pub struct ExposeRequest {
    pub deployment: String,
    pub namespace: String,
    pub container_port: i32,
    pub service_port: i32,
    /// Ingress host; no Ingress is created when empty.
    pub domain: String,
}

impl ExposeRequest {
    pub fn service_name(&self) -> String {
        format!("{}-svc-{}", self.base_name(), self.service_port)
    }

    pub fn ingress_name(&self) -> String {
        format!("{}-ingress-{}", self.base_name(), self.service_port)
    }

    /// Selector label: the deployment name minus a trailing "-dp" suffix.
    pub fn app_label(&self) -> String {
        let base = self.base_name();
        base.strip_suffix("-dp").unwrap_or(&base).to_string()
    }

    fn base_name(&self) -> String {
        self.deployment.to_lowercase()
    }
}

/// What an expose run actually created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExposeOutcome {
    pub service: String,
    pub ingress: Option<String>,
}

/// What a teardown run actually deleted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TeardownOutcome {
    pub ingress: String,
    pub service: String,
}

/// Submits the derived Service, then the Ingress when a domain was given.
pub async fn expose(
    catalog: &ResourceCatalog<'_>,
    request: &ExposeRequest,
) -> Result<ExposeOutcome, ExposeError> {
    catalog
        .create_service(&request.namespace, &service_manifest(request))
        .await
        .map_err(ExposeError::Service)?;

    if request.domain.trim().is_empty() {
        return Ok(ExposeOutcome {
            service: request.service_name(),
            ingress: None,
        });
    }

    catalog
        .create_ingress(&request.namespace, &ingress_manifest(request))
        .await
        .map_err(|err| ExposeError::IngressAfterService {
            service: request.service_name(),
            source: err,
        })?;

    Ok(ExposeOutcome {
        service: request.service_name(),
        ingress: Some(request.ingress_name()),
    })
}

/// Deletes an Ingress and then the Service its first routed path points at.
pub async fn unexpose(
    catalog: &ResourceCatalog<'_>,
    namespace: &str,
    ingress_name: &str,
) -> Result<TeardownOutcome, ExposeError> {
    let ingresses = catalog
        .list_ingresses(Some(namespace))
        .await
        .map_err(ExposeError::Ingress)?;
    let record = ingresses
        .iter()
        .find(|ingress| ingress.name == ingress_name)
        .ok_or_else(|| ExposeError::NotFound(ingress_name.to_string()))?;
    let service = record
        .backend_service()
        .ok_or_else(|| ExposeError::NoBackend(ingress_name.to_string()))?
        .service_name
        .clone();

    catalog
        .delete_ingress(namespace, ingress_name)
        .await
        .map_err(ExposeError::Ingress)?;

    catalog
        .delete_service(namespace, &service)
        .await
        .map_err(|err| ExposeError::ServiceAfterIngress {
            ingress: ingress_name.to_string(),
            service: service.clone(),
            source: err,
        })?;

    Ok(TeardownOutcome {
        ingress: ingress_name.to_string(),
        service,
    })
}

/// Service manifest selecting the deployment's app label and forwarding
/// `service_port` to `container_port`.
pub fn service_manifest(request: &ExposeRequest) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(request.service_name()),
            namespace: Some(request.namespace.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(BTreeMap::from([("app".to_string(), request.app_label())])),
            ports: Some(vec![ServicePort {
                port: request.service_port,
                target_port: Some(IntOrString::Int(request.container_port)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Ingress manifest routing `/` (prefix match) on the domain to the derived
/// Service.
pub fn ingress_manifest(request: &ExposeRequest) -> Ingress {
    let annotations = BTreeMap::from([(
        "traefik.ingress.kubernetes.io/router.entrypoints".to_string(),
        "web".to_string(),
    )]);

    Ingress {
        metadata: ObjectMeta {
            name: Some(request.ingress_name()),
            namespace: Some(request.namespace.clone()),
            annotations: Some(annotations),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(request.domain.clone()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: request.service_name(),
                                port: Some(ServiceBackendPort {
                                    number: Some(request.service_port),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(domain: &str) -> ExposeRequest {
        ExposeRequest {
            deployment: "web-dp".to_string(),
            namespace: "default".to_string(),
            container_port: 8080,
            service_port: 80,
            domain: domain.to_string(),
        }
    }

    #[test]
    fn test_derived_names() {
        let request = request("");
        assert_eq!(request.service_name(), "web-dp-svc-80");
        assert_eq!(request.ingress_name(), "web-dp-ingress-80");
        assert_eq!(request.app_label(), "web");
    }

    #[test]
    fn test_app_label_without_dp_suffix() {
        let mut request = request("");
        request.deployment = "Backend".to_string();
        assert_eq!(request.app_label(), "backend");
    }

    #[test]
    fn test_service_manifest_forwards_ports() {
        let manifest = service_manifest(&request(""));
        assert_eq!(manifest.metadata.name.as_deref(), Some("web-dp-svc-80"));

        let spec = manifest.spec.unwrap();
        let selector = spec.selector.unwrap();
        assert_eq!(selector.get("app").map(String::as_str), Some("web"));

        let ports = spec.ports.unwrap();
        assert_eq!(ports[0].port, 80);
        assert_eq!(ports[0].target_port, Some(IntOrString::Int(8080)));
    }

    #[test]
    fn test_ingress_manifest_routes_root_prefix() {
        let manifest = ingress_manifest(&request("app.example.com"));
        assert_eq!(manifest.metadata.name.as_deref(), Some("web-dp-ingress-80"));

        let rules = manifest.spec.unwrap().rules.unwrap();
        let rule = &rules[0];
        assert_eq!(rule.host.as_deref(), Some("app.example.com"));

        let path = &rule.http.as_ref().unwrap().paths[0];
        assert_eq!(path.path.as_deref(), Some("/"));
        assert_eq!(path.path_type, "Prefix");

        let backend = path.backend.service.as_ref().unwrap();
        assert_eq!(backend.name, "web-dp-svc-80");
        assert_eq!(backend.port.as_ref().unwrap().number, Some(80));
    }
}
