//! Cluster API access for kubedeck
//!
//! This crate provides the authenticated session, the typed resource
//! catalog for namespaces, pods, deployments, services, ingresses and
//! nodes, and the expose/teardown workflows.

mod catalog;
mod error;
mod expose;
mod session;

pub use catalog::ResourceCatalog;
pub use error::ApiError;
pub use expose::{
    ExposeError, ExposeOutcome, ExposeRequest, TeardownOutcome, expose, ingress_manifest,
    service_manifest, unexpose,
};
pub use session::{DEFAULT_PORT, Session, SessionOptions};

// Re-export types that are used in our public API
pub use kubedeck_types::{
    DeploymentRecord, IngressRecord, NamespaceRecord, NodeRecord, NodeUsage, PodRecord,
    ServiceRecord,
};
