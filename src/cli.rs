use clap::{Parser, Subcommand, ValueEnum};

use kubedeck_types::ResourceKind;

/// Kubedeck - drive a Kubernetes cluster by host and bearer token
#[derive(Parser, Debug)]
#[command(name = "kubedeck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// API server host (IP address or DNS name)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Bearer token presented on every request
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Use a saved login profile instead of --host/--token
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// API server port (overrides the config file)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Verify the server TLS certificate instead of trusting it
    #[arg(long, global = true)]
    pub verify_tls: bool,

    /// Output format for listings
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a token against the cluster and save it as a login profile
    Login {
        /// Profile name to store the login under
        #[arg(long)]
        name: String,
    },

    /// List saved login profiles
    Logins,

    /// List resources of a kind
    Get {
        #[arg(value_enum)]
        kind: ResourceArg,
        /// Restrict the listing to one namespace
        #[arg(long, short)]
        namespace: Option<String>,
    },

    /// Create a resource
    Create {
        #[command(subcommand)]
        resource: CreateCommand,
    },

    /// Delete a resource by name
    Delete {
        #[arg(value_enum)]
        kind: ResourceArg,
        name: String,
        #[arg(long, short)]
        namespace: Option<String>,
    },

    /// Derive and submit a Service (and optional Ingress) for a deployment
    Expose {
        deployment: String,
        #[arg(long, short)]
        namespace: String,
        /// Container port the service forwards to
        #[arg(long)]
        container_port: i32,
        /// Port the service listens on
        #[arg(long)]
        service_port: i32,
        /// Ingress host; omit to create the service only
        #[arg(long, default_value = "")]
        domain: String,
    },

    /// Delete an ingress and the service it routes to
    Unexpose {
        ingress: String,
        #[arg(long, short)]
        namespace: String,
    },

    /// Refresh node utilization and pod phases every two seconds
    Watch,
}

#[derive(Subcommand, Debug)]
pub enum CreateCommand {
    /// Create a namespace
    Namespace { name: String },

    /// Create a single-container pod
    Pod {
        name: String,
        #[arg(long, short)]
        namespace: String,
        /// Container image
        #[arg(long)]
        image: String,
        /// Container port to declare
        #[arg(long)]
        port: Option<i32>,
    },

    /// Create a deployment from one or more image=port containers
    Deployment {
        name: String,
        #[arg(long, short)]
        namespace: String,
        #[arg(long, default_value_t = 1)]
        replicas: i32,
        /// Containers as image=port pairs, repeatable
        #[arg(long = "container", value_parser = parse_container, required = true)]
        containers: Vec<(String, i32)>,
    },
}

/// Resource collections addressable from the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ResourceArg {
    Namespaces,
    Pods,
    Deployments,
    Services,
    Ingresses,
    Nodes,
}

impl ResourceArg {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Namespaces => ResourceKind::Namespace,
            Self::Pods => ResourceKind::Pod,
            Self::Deployments => ResourceKind::Deployment,
            Self::Services => ResourceKind::Service,
            Self::Ingresses => ResourceKind::Ingress,
            Self::Nodes => ResourceKind::Node,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Parses an `image=port` pair.
fn parse_container(value: &str) -> Result<(String, i32), String> {
    let (image, port) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected image=port, got {value:?}"))?;
    if image.is_empty() {
        return Err(format!("empty image in {value:?}"));
    }
    let port = port
        .parse::<i32>()
        .map_err(|_| format!("invalid port in {value:?}"))?;

    Ok((image.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_container() {
        assert_eq!(
            parse_container("nginx:1.27=8080"),
            Ok(("nginx:1.27".to_string(), 8080))
        );
        assert!(parse_container("nginx").is_err());
        assert!(parse_container("nginx=oops").is_err());
        assert!(parse_container("=8080").is_err());
    }

    #[test]
    fn test_expose_args() {
        let cli = Cli::parse_from([
            "kubedeck",
            "expose",
            "web-dp",
            "--namespace",
            "default",
            "--container-port",
            "8080",
            "--service-port",
            "80",
        ]);

        match cli.command {
            Command::Expose {
                deployment, domain, ..
            } => {
                assert_eq!(deployment, "web-dp");
                assert!(domain.is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
