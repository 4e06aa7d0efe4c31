//! Process startup: wire the client, credential backend and session
//! manager together and restore any stored session before anything reads
//! session state.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::auth::{CredentialStore, KeyringStore, MemoryStore, SessionManager, VaultStore};
use crate::config::{Config, CredentialBackend, VAULT_PASSPHRASE_ENV};

/// Which credential backend to open at startup
#[derive(Debug, Clone)]
pub enum StoreChoice {
    /// Whatever the config file names
    Configured,
    /// In-memory only; nothing is read from or left on the device
    Ephemeral,
}

/// Open the credential backend named by `config`.
pub fn open_store(config: &Config, choice: &StoreChoice) -> Result<Arc<dyn CredentialStore>> {
    match (choice, config.credential_backend) {
        (StoreChoice::Ephemeral, _) => Ok(Arc::new(MemoryStore::new())),
        (StoreChoice::Configured, CredentialBackend::Keyring) => Ok(Arc::new(KeyringStore::new())),
        (StoreChoice::Configured, CredentialBackend::Vault) => {
            let passphrase = std::env::var(VAULT_PASSPHRASE_ENV).map_err(|_| {
                anyhow!(
                    "The vault credential backend needs {} to be set",
                    VAULT_PASSPHRASE_ENV
                )
            })?;
            let path = config.vault_path()?;
            let vault = VaultStore::open(&path, &passphrase)
                .with_context(|| format!("Failed to open credential vault {}", path.display()))?;
            Ok(Arc::new(vault))
        }
    }
}

/// Build a ready `SessionManager`: resolve the base URL, open storage and
/// restore the persisted session. The returned manager is past `Unknown`.
pub fn start(config: &Config, choice: StoreChoice) -> Result<Arc<SessionManager>> {
    let api_url = config.api_url();
    debug!(api_url = %api_url, backend = ?config.credential_backend, ?choice, "Starting session");

    let api = ApiClient::new(&api_url)?;
    let store = open_store(config, &choice)?;
    Ok(start_with(api, store))
}

/// Same as `start` with explicit parts; lets callers and tests supply their
/// own client and store.
pub fn start_with(api: ApiClient, store: Arc<dyn CredentialStore>) -> Arc<SessionManager> {
    let manager = Arc::new(SessionManager::new(api, store));
    let status = manager.bootstrap();
    info!(?status, "Session bootstrap complete");
    manager
}
