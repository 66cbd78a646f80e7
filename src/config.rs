use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Compiled-in fallback for the token cipher passphrase so first runs work;
/// override it in the config file.
const DEFAULT_PASSPHRASE: &str = "kubedeck-local-store";

/// Tool configuration, loaded from ~/.kubedeck/config.toml when present.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// API server port.
    pub port: u16,

    /// Trust the server certificate without verification. Self-signed
    /// cluster certificates are the expected deployment, so this defaults
    /// to true; set it to false to require a verifiable chain.
    pub accept_invalid_certs: bool,

    /// Credential store file; defaults to credentials.json next to this
    /// config.
    pub store_path: Option<PathBuf>,

    /// Passphrase the token cipher derives its key from. Not a security
    /// boundary; it keeps tokens out of casual file reads.
    pub passphrase: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: kubedeck_k8s::DEFAULT_PORT,
            accept_invalid_certs: true,
            store_path: None,
            passphrase: DEFAULT_PASSPHRASE.to_string(),
        }
    }
}

impl AppConfig {
    /// Default config file (~/.kubedeck/config.toml).
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::home_dir()?.join(".kubedeck").join("config.toml"))
    }

    /// Loads the configuration, falling back to defaults when no file
    /// exists.
    pub fn load() -> Result<Self> {
        let Some(path) = Self::default_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Resolved credential store location.
    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.store_path {
            return Ok(path.clone());
        }
        kubedeck_store::CredentialStore::default_path()
            .context("failed to determine the home directory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.port, 6443);
        assert!(config.accept_invalid_certs);
        assert_eq!(config.passphrase, DEFAULT_PASSPHRASE);
    }

    #[test]
    fn test_partial_file_overrides() {
        let config: AppConfig =
            toml::from_str("port = 8443\naccept_invalid_certs = false").unwrap();
        assert_eq!(config.port, 8443);
        assert!(!config.accept_invalid_certs);
        assert_eq!(config.passphrase, DEFAULT_PASSPHRASE);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(toml::from_str::<AppConfig>("prot = 8443").is_err());
    }
}
