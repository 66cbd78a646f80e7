mod expose;
mod login;
mod resources;
mod watch;

pub use expose::{expose, unexpose};
pub use login::{login, logins};
pub use resources::{create, delete, get};
pub use watch::watch;

use anyhow::{Context, Result, bail};

use kubedeck_k8s::{Session, SessionOptions};
use kubedeck_store::{CredentialStore, TokenCipher};

use crate::cli::Cli;
use crate::config::AppConfig;

/// Opens the credential store at its configured location.
pub fn open_store(config: &AppConfig) -> Result<CredentialStore> {
    let path = config.store_path()?;
    let cipher = TokenCipher::new(&config.passphrase);
    CredentialStore::open(path, cipher).context("failed to open the credential store")
}

/// Resolves the host and token for a command, either from the command line
/// or from a saved profile.
pub fn resolve_login(cli: &Cli, config: &AppConfig) -> Result<(String, String)> {
    if let Some(profile) = &cli.profile {
        let store = open_store(config)?;
        let credential = store
            .list()
            .into_iter()
            .find(|credential| &credential.name == profile)
            .with_context(|| format!("no saved profile named {profile:?}"))?;
        if credential.token.is_empty() {
            bail!("profile {profile:?} has an unreadable token; log in again");
        }
        return Ok((credential.host, credential.token));
    }

    match (&cli.host, &cli.token) {
        (Some(host), Some(token)) => Ok((host.clone(), token.clone())),
        _ => bail!("provide --host and --token, or --profile"),
    }
}

/// Session options derived from the config file plus command-line overrides.
pub fn session_options(cli: &Cli, config: &AppConfig) -> SessionOptions {
    SessionOptions {
        port: cli.port.unwrap_or(config.port),
        accept_invalid_certs: if cli.verify_tls {
            false
        } else {
            config.accept_invalid_certs
        },
    }
}

/// Connects a session for the resolved login.
pub async fn connect(cli: &Cli, config: &AppConfig) -> Result<Session> {
    let (host, token) = resolve_login(cli, config)?;
    let session = Session::connect(&host, &token, &session_options(cli, config)).await?;

    Ok(session)
}
