use anyhow::Result;

use kubedeck_k8s::Session;

use crate::cli::Cli;
use crate::config::AppConfig;

use super::{open_store, session_options};

/// Validates the token against the cluster, then saves the profile. An
/// unauthorized answer also purges any stored credential with the same
/// triple, so expired logins do not linger.
pub async fn login(cli: &Cli, config: &AppConfig, name: &str) -> Result<()> {
    let (host, token) = match (&cli.host, &cli.token) {
        (Some(host), Some(token)) => (host.clone(), token.clone()),
        _ => anyhow::bail!("login needs --host and --token"),
    };

    match Session::connect(&host, &token, &session_options(cli, config)).await {
        Ok(_) => {
            let mut store = open_store(config)?;
            match store.save(name, &host, &token)? {
                Some(stored) => println!("Login saved as {stored} -> {host}"),
                None => println!("Login already saved for {host}"),
            }
            Ok(())
        }
        Err(err) if err.is_auth() => {
            let mut store = open_store(config)?;
            if store.delete_matching(name, &host, &token)? {
                eprintln!("Expired token: removed the stored login for {host}");
            }
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Prints the saved login profiles.
pub fn logins(config: &AppConfig) -> Result<()> {
    let store = open_store(config)?;
    let credentials = store.list();
    if credentials.is_empty() {
        println!("No saved logins");
        return Ok(());
    }

    for credential in credentials {
        println!("{} -> {}", credential.name, credential.host);
    }

    Ok(())
}
