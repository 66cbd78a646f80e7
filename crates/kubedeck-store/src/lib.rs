//! Credential persistence for kubedeck
//!
//! Login profiles with reversibly sealed tokens, deterministic name
//! de-duplication and file-backed storage.

mod cipher;
mod store;

pub use cipher::{CryptoError, TokenCipher};
pub use store::{CredentialStore, StoreError, StoredCredential};

// Re-export types that are used in our public API
pub use kubedeck_types::Credential;
