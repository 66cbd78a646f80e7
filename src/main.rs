mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;

use kubedeck_k8s::{ApiError, ExposeError, ExposeRequest};
use kubedeck_store::StoreError;

use crate::cli::{Cli, Command};
use crate::config::AppConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing for debugging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(exit_code(&err));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load()?;

    match &cli.command {
        Command::Login { name } => commands::login(&cli, &config, name).await,
        Command::Logins => commands::logins(&config),
        Command::Get { kind, namespace } => {
            let session = commands::connect(&cli, &config).await?;
            commands::get(&session, *kind, namespace.as_deref(), cli.output).await
        }
        Command::Create { resource } => {
            let session = commands::connect(&cli, &config).await?;
            commands::create(&session, resource).await
        }
        Command::Delete {
            kind,
            name,
            namespace,
        } => {
            let session = commands::connect(&cli, &config).await?;
            commands::delete(&session, *kind, name, namespace.as_deref()).await
        }
        Command::Expose {
            deployment,
            namespace,
            container_port,
            service_port,
            domain,
        } => {
            let session = commands::connect(&cli, &config).await?;
            let request = ExposeRequest {
                deployment: deployment.clone(),
                namespace: namespace.clone(),
                container_port: *container_port,
                service_port: *service_port,
                domain: domain.clone(),
            };
            commands::expose(&session, request).await
        }
        Command::Unexpose { ingress, namespace } => {
            let session = commands::connect(&cli, &config).await?;
            commands::unexpose(&session, namespace, ingress).await
        }
        Command::Watch => {
            let session = commands::connect(&cli, &config).await?;
            commands::watch(&session).await
        }
    }
}

/// Exit code by error category: 0 success, 1 transport, 2 auth,
/// 3 forbidden, 4 api status, 5 parse, 6 store or config.
fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(api) = err.downcast_ref::<ApiError>() {
        return api.exit_code();
    }
    if let Some(expose) = err.downcast_ref::<ExposeError>() {
        return expose.exit_code();
    }
    if err.downcast_ref::<StoreError>().is_some() {
        return 6;
    }

    1
}
