use std::collections::HashMap;

use anyhow::{Context, Result};
use keyring::Entry;
use parking_lot::Mutex;

/// Keychain service name all entries are filed under
pub const SERVICE_NAME: &str = "brewdesk";

/// Storage key for the raw session token
pub const TOKEN_KEY: &str = "auth_token";

/// Storage key for the JSON-serialized user profile
pub const USER_KEY: &str = "user_data";

/// Scoped, durable key-value storage for session secrets.
///
/// Each key is independent: nothing here makes a pair of writes atomic.
pub trait CredentialStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Read the value for `key`, `None` if nothing is stored
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key`. Removing a missing key succeeds.
    fn delete(&self, key: &str) -> Result<()>;
}

/// Credentials kept in the OS keychain.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .with_context(|| format!("Failed to store {} in keychain", key))
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {} from keychain", key)),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {} from keychain", key)),
        }
    }
}

/// Process-local store. Nothing survives a restart; used by tests and
/// `--ephemeral` runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a value exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }
}

impl CredentialStore for MemoryStore {
    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
