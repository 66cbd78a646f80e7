use anyhow::Result;

use kubedeck_k8s::{ExposeRequest, ResourceCatalog, Session};

/// Derives and submits the Service/Ingress pair for a deployment.
pub async fn expose(session: &Session, request: ExposeRequest) -> Result<()> {
    let catalog = ResourceCatalog::new(session);
    let outcome = kubedeck_k8s::expose(&catalog, &request).await?;

    match outcome.ingress {
        Some(ingress) => println!("service/{} and ingress/{ingress} created", outcome.service),
        None => println!("service/{} created", outcome.service),
    }

    Ok(())
}

/// Deletes an ingress and the service it routes to.
pub async fn unexpose(session: &Session, namespace: &str, ingress: &str) -> Result<()> {
    let catalog = ResourceCatalog::new(session);
    let outcome = kubedeck_k8s::unexpose(&catalog, namespace, ingress).await?;

    println!(
        "ingress/{} and service/{} deleted",
        outcome.ingress, outcome.service
    );

    Ok(())
}
