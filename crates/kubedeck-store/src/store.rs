//! File-backed store of login profiles.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use kubedeck_types::Credential;

use crate::cipher::TokenCipher;

/// Possible errors from the credential store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Failed to read or write the store file.
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),

    /// The store file holds something that is not a credential list.
    #[error("store file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// One persisted login profile; the token is sealed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredCredential {
    pub name: String,
    pub host: String,
    pub token: String,
}

/// File-backed store of login profiles.
///
/// Records load into an in-memory cache at construction; name
/// de-duplication scans that cache and every mutation rewrites the whole
/// file. Mutations take `&mut self`, which linearizes each save with the
/// reads its de-duplication depends on.
pub struct CredentialStore {
    path: PathBuf,
    cipher: TokenCipher,
    records: Vec<StoredCredential>,
}

impl CredentialStore {
    /// Default store file (~/.kubedeck/credentials.json).
    pub fn default_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".kubedeck").join("credentials.json"))
    }

    /// Opens the store, loading any existing records into the cache. A
    /// missing file is an empty store, not an error.
    pub fn open(path: PathBuf, cipher: TokenCipher) -> Result<Self, StoreError> {
        let records = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            cipher,
            records,
        })
    }

    /// Saves a login profile under the first free name and returns the name
    /// it was stored under, or `None` when an equivalent profile already
    /// exists.
    pub fn save(&mut self, name: &str, host: &str, token: &str) -> Result<Option<String>, StoreError> {
        if self.is_saved(name, host, token) {
            return Ok(None);
        }

        let unique = self.unique_name(name, host);
        let sealed = self.cipher.seal(token);
        self.records.push(StoredCredential {
            name: unique.clone(),
            host: host.to_string(),
            token: sealed,
        });
        self.persist()?;

        Ok(Some(unique))
    }

    /// Already-saved short-circuit: any record whose name merely starts with
    /// the requested one, on the same host with the same token. Note this is
    /// looser than the exact matching used for suffix assignment.
    fn is_saved(&self, name: &str, host: &str, token: &str) -> bool {
        self.records.iter().any(|record| {
            record.name.starts_with(name)
                && record.host == host
                && self
                    .cipher
                    .open(&record.token)
                    .is_ok_and(|stored| stored == token)
        })
    }

    /// First unused name among `name`, `name_1`, `name_2`… on this host,
    /// comparing existing names exactly.
    fn unique_name(&self, name: &str, host: &str) -> String {
        let taken: Vec<&str> = self
            .records
            .iter()
            .filter(|record| record.host == host)
            .map(|record| record.name.as_str())
            .collect();

        if !taken.contains(&name) {
            return name.to_string();
        }

        let mut suffix = 1;
        loop {
            let candidate = format!("{name}_{suffix}");
            if !taken.contains(&candidate.as_str()) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Lists saved profiles with tokens opened for reuse. A blob that fails
    /// to decrypt yields an empty token rather than an error; callers must
    /// tolerate a blank token.
    pub fn list(&self) -> Vec<Credential> {
        self.records
            .iter()
            .map(|record| {
                let token = match self.cipher.open(&record.token) {
                    Ok(token) => token,
                    Err(err) => {
                        warn!("stored token for {} is unreadable: {err}", record.name);
                        String::new()
                    }
                };
                Credential::new(record.name.clone(), record.host.clone(), token)
            })
            .collect()
    }

    /// Removes the first record matching the exact `(name, host, token)`
    /// triple; invoked when the API reports the token unauthorized.
    pub fn delete_matching(
        &mut self,
        name: &str,
        host: &str,
        token: &str,
    ) -> Result<bool, StoreError> {
        let position = self.records.iter().position(|record| {
            record.name == name
                && record.host == host
                && self
                    .cipher
                    .open(&record.token)
                    .is_ok_and(|stored| stored == token)
        });

        match position {
            Some(index) => {
                self.records.remove(index);
                self.persist()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Number of saved profiles.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.records)?;
        fs::write(&self.path, content)?;

        Ok(())
    }
}
