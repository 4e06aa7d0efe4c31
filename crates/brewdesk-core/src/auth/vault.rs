//! Passphrase-encrypted credential file for hosts without an OS keychain.
//!
//! Every value is sealed separately with ChaCha20-Poly1305 under a key
//! derived by Argon2 from the passphrase and a random per-file salt. The
//! storage key is bound in as associated data, so a ciphertext copied to
//! another key fails to open.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use parking_lot::Mutex;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::credentials::CredentialStore;

const VAULT_VERSION: u32 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Known plaintext sealed at creation; opening it proves the passphrase.
const CHECK_KEY: &str = "__check__";
const CHECK_VALUE: &str = "brewdesk-vault";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VaultFile {
    version: u32,
    salt: String,
    check: String,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

pub struct VaultStore {
    path: PathBuf,
    cipher: ChaCha20Poly1305,
    file: Mutex<VaultFile>,
}

impl VaultStore {
    /// Open the vault at `path`, creating it if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>, passphrase: &str) -> Result<Self> {
        let path = path.into();
        if passphrase.is_empty() {
            return Err(anyhow!("Vault passphrase must not be empty"));
        }

        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read vault file {}", path.display()))?;
            let file: VaultFile =
                serde_json::from_str(&contents).context("Failed to parse vault file")?;
            if file.version != VAULT_VERSION {
                return Err(anyhow!("Unsupported vault version {}", file.version));
            }

            let salt = STANDARD.decode(&file.salt).context("Corrupt vault salt")?;
            let cipher = derive_cipher(passphrase, &salt)?;
            let check = open_value(&cipher, CHECK_KEY, &file.check)
                .map_err(|_| anyhow!("Wrong vault passphrase"))?;
            if check != CHECK_VALUE {
                return Err(anyhow!("Wrong vault passphrase"));
            }

            debug!(path = %path.display(), entries = file.entries.len(), "Vault opened");
            Ok(Self {
                path,
                cipher,
                file: Mutex::new(file),
            })
        } else {
            let mut salt = [0u8; SALT_LEN];
            rand::thread_rng().fill_bytes(&mut salt);
            let cipher = derive_cipher(passphrase, &salt)?;
            let file = VaultFile {
                version: VAULT_VERSION,
                salt: STANDARD.encode(salt),
                check: seal_value(&cipher, CHECK_KEY, CHECK_VALUE)?,
                entries: BTreeMap::new(),
            };
            write_file(&path, &file)?;

            debug!(path = %path.display(), "Vault created");
            Ok(Self {
                path,
                cipher,
                file: Mutex::new(file),
            })
        }
    }

    /// Apply `change` to a copy of the vault, persist it, and only then make
    /// it the in-memory view. A failed write leaves both unchanged.
    fn commit(&self, change: impl FnOnce(&mut VaultFile) -> bool) -> Result<()> {
        let mut file = self.file.lock();
        let mut staged = file.clone();
        if !change(&mut staged) {
            return Ok(());
        }
        write_file(&self.path, &staged)?;
        *file = staged;
        Ok(())
    }
}

impl CredentialStore for VaultStore {
    fn save(&self, key: &str, value: &str) -> Result<()> {
        let sealed = seal_value(&self.cipher, key, value)?;
        self.commit(|file| {
            file.entries.insert(key.to_string(), sealed);
            true
        })
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        let file = self.file.lock();
        match file.entries.get(key) {
            Some(sealed) => open_value(&self.cipher, key, sealed).map(Some),
            None => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.commit(|file| file.entries.remove(key).is_some())
    }
}

fn derive_cipher(passphrase: &str, salt: &[u8]) -> Result<ChaCha20Poly1305> {
    let mut key = [0u8; 32];
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| anyhow!("Failed to derive vault key: {}", e))?;
    Ok(ChaCha20Poly1305::new(Key::from_slice(&key)))
}

/// Encrypt `value` and encode it as base64(nonce || ciphertext).
fn seal_value(cipher: &ChaCha20Poly1305, key: &str, value: &str) -> Result<String> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: value.as_bytes(),
                aad: key.as_bytes(),
            },
        )
        .map_err(|_| anyhow!("Failed to encrypt {}", key))?;

    let mut sealed = nonce.to_vec();
    sealed.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(sealed))
}

fn open_value(cipher: &ChaCha20Poly1305, key: &str, sealed: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(sealed)
        .with_context(|| format!("Corrupt vault entry {}", key))?;
    if bytes.len() <= NONCE_LEN {
        return Err(anyhow!("Corrupt vault entry {}", key));
    }

    let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: key.as_bytes(),
            },
        )
        .map_err(|_| anyhow!("Failed to decrypt vault entry {}", key))?;

    String::from_utf8(plaintext).with_context(|| format!("Vault entry {} is not UTF-8", key))
}

/// Write via a temp file and rename so a crash never leaves half a vault.
fn write_file(path: &Path, file: &VaultFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(file)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents)
        .with_context(|| format!("Failed to write vault file {}", tmp.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace vault file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::{TOKEN_KEY, USER_KEY};

    #[test]
    fn test_vault_round_trip_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.vault");

        {
            let vault = VaultStore::open(&path, "hunter22").unwrap();
            vault.save(TOKEN_KEY, "tok1").unwrap();
            vault.save(USER_KEY, r#"{"id":"1"}"#).unwrap();
        }

        let vault = VaultStore::open(&path, "hunter22").unwrap();
        assert_eq!(vault.load(TOKEN_KEY).unwrap().as_deref(), Some("tok1"));
        assert_eq!(vault.load(USER_KEY).unwrap().as_deref(), Some(r#"{"id":"1"}"#));
    }

    #[test]
    fn test_vault_wrong_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.vault");
        VaultStore::open(&path, "right").unwrap().save(TOKEN_KEY, "tok1").unwrap();

        let err = VaultStore::open(&path, "wrong").err().unwrap();
        assert!(err.to_string().contains("Wrong vault passphrase"));
    }

    #[test]
    fn test_vault_does_not_store_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.vault");
        VaultStore::open(&path, "pass").unwrap().save(TOKEN_KEY, "super-secret-token").unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("super-secret-token"));
    }

    #[test]
    fn test_vault_delete() {
        let dir = tempfile::tempdir().unwrap();
        let vault = VaultStore::open(dir.path().join("v.vault"), "pass").unwrap();
        vault.save(TOKEN_KEY, "tok1").unwrap();
        vault.delete(TOKEN_KEY).unwrap();
        vault.delete(TOKEN_KEY).unwrap();
        assert_eq!(vault.load(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_vault_entry_bound_to_key() {
        let dir = tempfile::tempdir().unwrap();
        let vault = VaultStore::open(dir.path().join("v.vault"), "pass").unwrap();
        let sealed = seal_value(&vault.cipher, TOKEN_KEY, "tok1").unwrap();
        assert!(open_value(&vault.cipher, USER_KEY, &sealed).is_err());
        assert_eq!(open_value(&vault.cipher, TOKEN_KEY, &sealed).unwrap(), "tok1");
    }

    /// Swap the vault's directory for a plain file so every write fails
    fn break_vault_dir(dir: &Path) {
        std::fs::remove_dir_all(dir).unwrap();
        std::fs::write(dir, "not a directory").unwrap();
    }

    #[test]
    fn test_vault_failed_save_keeps_previous_view() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        let vault = VaultStore::open(sub.join("v.vault"), "pass").unwrap();
        vault.save(USER_KEY, "user").unwrap();
        break_vault_dir(&sub);

        assert!(vault.save(TOKEN_KEY, "tok1").is_err());
        assert_eq!(vault.load(TOKEN_KEY).unwrap(), None);
        assert!(vault.save(USER_KEY, "other").is_err());
        assert_eq!(vault.load(USER_KEY).unwrap().as_deref(), Some("user"));
    }

    #[test]
    fn test_vault_failed_delete_keeps_entry() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        let vault = VaultStore::open(sub.join("v.vault"), "pass").unwrap();
        vault.save(TOKEN_KEY, "tok1").unwrap();
        break_vault_dir(&sub);

        assert!(vault.delete(TOKEN_KEY).is_err());
        assert_eq!(vault.load(TOKEN_KEY).unwrap().as_deref(), Some("tok1"));
        // Nothing to remove, so nothing to write
        assert!(vault.delete(USER_KEY).is_ok());
    }

    #[test]
    fn test_vault_rejects_empty_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        assert!(VaultStore::open(dir.path().join("v.vault"), "").is_err());
    }
}
