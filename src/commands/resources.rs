use anyhow::{Result, bail};
use serde::Serialize;

use kubedeck_k8s::{ResourceCatalog, Session};

use crate::cli::{CreateCommand, OutputFormat, ResourceArg};

/// Lists one resource collection and renders the records.
pub async fn get(
    session: &Session,
    kind: ResourceArg,
    namespace: Option<&str>,
    output: OutputFormat,
) -> Result<()> {
    let catalog = ResourceCatalog::new(session);

    match kind {
        ResourceArg::Namespaces => {
            let records = catalog.list_namespaces().await?;
            render(&records, output, |r| {
                format!("{:<32} {:<12} {}", r.name, r.phase, r.created_at)
            })
        }
        ResourceArg::Pods => {
            let records = catalog.list_pods(namespace).await?;
            render(&records, output, |r| {
                format!(
                    "{:<40} {:<16} {:<10} {:<16} {}",
                    r.name,
                    r.namespace,
                    r.phase.as_str(),
                    r.node_name.as_deref().unwrap_or("-"),
                    r.container_images.join(", "),
                )
            })
        }
        ResourceArg::Deployments => {
            let records = catalog.list_deployments(namespace).await?;
            render(&records, output, |r| {
                let availability = match r.available {
                    Some(true) => "Available",
                    Some(false) => "Degraded",
                    None => "Unknown",
                };
                format!(
                    "{:<40} {:<16} {:<8} {:<10} {}",
                    r.name,
                    r.namespace,
                    r.replica_status(),
                    availability,
                    r.container_images.join(", "),
                )
            })
        }
        ResourceArg::Services => {
            let records = catalog.list_services(namespace).await?;
            render(&records, output, |r| {
                let ports = r
                    .ports
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "{:<40} {:<16} {:<20} {}",
                    r.name,
                    r.namespace,
                    r.app_selector.as_deref().unwrap_or("-"),
                    ports,
                )
            })
        }
        ResourceArg::Ingresses => {
            let records = catalog.list_ingresses(namespace).await?;
            render(&records, output, |r| {
                let rules = r
                    .rules
                    .iter()
                    .map(|rule| {
                        let paths = rule
                            .paths
                            .iter()
                            .map(|p| format!("{}:{}", p.service_name, p.service_port))
                            .collect::<Vec<_>>()
                            .join(", ");
                        format!("{} -> [{}]", rule.host, paths)
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                format!("{:<40} {:<16} {}", r.name, r.namespace, rules)
            })
        }
        ResourceArg::Nodes => {
            let records = catalog.list_nodes().await?;
            render(&records, output, |r| {
                format!(
                    "{:<32} {:<9} {:<16} {:<12} cpu {} mem {}",
                    r.name,
                    if r.ready { "Ready" } else { "NotReady" },
                    r.internal_ip,
                    r.kubelet_version,
                    r.capacity_cpu,
                    r.capacity_memory,
                )
            })
        }
    }
}

/// Creates a namespace, pod or deployment.
pub async fn create(session: &Session, resource: &CreateCommand) -> Result<()> {
    let catalog = ResourceCatalog::new(session);

    match resource {
        CreateCommand::Namespace { name } => {
            catalog.create_namespace(name).await?;
            println!("namespace/{name} created");
        }
        CreateCommand::Pod {
            name,
            namespace,
            image,
            port,
        } => {
            catalog.create_pod(namespace, name, image, *port).await?;
            println!("pod/{name} created in {namespace}");
        }
        CreateCommand::Deployment {
            name,
            namespace,
            replicas,
            containers,
        } => {
            catalog
                .create_deployment(namespace, name, *replicas, containers)
                .await?;
            println!("deployment/{name} created in {namespace}");
        }
    }

    Ok(())
}

/// Deletes one resource by its typed identifier.
pub async fn delete(
    session: &Session,
    arg: ResourceArg,
    name: &str,
    namespace: Option<&str>,
) -> Result<()> {
    let catalog = ResourceCatalog::new(session);
    let kind = arg.kind();

    if kind.is_namespaced() && namespace.is_none() {
        bail!("--namespace is required to delete a {kind}");
    }
    let ns = namespace.unwrap_or_default();

    match arg {
        ResourceArg::Namespaces => catalog.delete_namespace(name).await?,
        ResourceArg::Pods => catalog.delete_pod(ns, name).await?,
        ResourceArg::Deployments => catalog.delete_deployment(ns, name).await?,
        ResourceArg::Services => catalog.delete_service(ns, name).await?,
        ResourceArg::Ingresses => catalog.delete_ingress(ns, name).await?,
        ResourceArg::Nodes => bail!("nodes cannot be deleted from here"),
    }

    println!("{kind}/{name} deleted");
    Ok(())
}

fn render<T: Serialize>(
    records: &[T],
    output: OutputFormat,
    line: impl Fn(&T) -> String,
) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Table => {
            for record in records {
                println!("{}", line(record));
            }
        }
    }

    Ok(())
}
