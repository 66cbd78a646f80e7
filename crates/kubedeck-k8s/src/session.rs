use http::Uri;
use k8s_openapi::api::core::v1::Pod;
use kube::api::ListParams;
use kube::{Api, Client, Config};
use tracing::debug;

use crate::error::ApiError;

/// Default API server port.
pub const DEFAULT_PORT: u16 = 6443;

/// Connection policy for a cluster session.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// API server port.
    pub port: u16,

    /// Trust the server certificate without verification. Clusters this tool
    /// targets serve self-signed certificates, so this defaults to `true`;
    /// it is an explicit policy knob, not a hidden default — set it to
    /// `false` to require a verifiable chain.
    pub accept_invalid_certs: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            accept_invalid_certs: true,
        }
    }
}

/// An authenticated connection to one cluster API server.
///
/// Constructed once per login and passed by reference to every operation.
/// The bearer token and endpoint never change after construction; a re-login
/// builds a fresh session.
pub struct Session {
    client: Client,
    host: String,
}

impl Session {
    /// Connects to `https://{host}:{port}` with bearer auth and validates
    /// the token with a single-item list call.
    pub async fn connect(
        host: &str,
        token: &str,
        options: &SessionOptions,
    ) -> Result<Self, ApiError> {
        let url = format!("https://{}:{}", host, options.port)
            .parse::<Uri>()
            .map_err(|err| ApiError::Endpoint(err.to_string()))?;

        debug!(
            "connecting to {} (accept_invalid_certs: {})",
            url, options.accept_invalid_certs
        );

        let mut config = Config::new(url);
        config.accept_invalid_certs = options.accept_invalid_certs;
        config.auth_info.token = Some(token.to_string().into());

        let client = Client::try_from(config).map_err(ApiError::from)?;

        let session = Self {
            client,
            host: host.to_string(),
        };
        session.validate().await?;

        Ok(session)
    }

    /// Verifies the bearer token against the pod collection; a 401 here is
    /// the signal callers use to purge the matching stored credential.
    async fn validate(&self) -> Result<(), ApiError> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        pods.list(&ListParams::default().limit(1))
            .await
            .map_err(ApiError::from)?;

        Ok(())
    }

    /// Returns a cloned client handle for API calls.
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// The host this session was opened against.
    pub fn host(&self) -> &str {
        &self.host
    }
}
