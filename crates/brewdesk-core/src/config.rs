//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL override, the credential backend and the
//! last email used to sign in.
//!
//! Configuration is stored at `~/.config/brewdesk/config.json`.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
const APP_NAME: &str = "brewdesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Encrypted credential file name, used by the vault backend
const VAULT_FILE: &str = "credentials.vault";

/// Environment variable that overrides the API base URL
pub const API_URL_ENV: &str = "BREWDESK_API_URL";

/// Environment variable holding the vault passphrase
pub const VAULT_PASSPHRASE_ENV: &str = "BREWDESK_VAULT_PASSPHRASE";

/// Base URL used when neither the environment nor the config file set one
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    #[default]
    Keyring,
    Vault,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub last_email: Option<String>,
    #[serde(default)]
    pub credential_backend: CredentialBackend,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn vault_path(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(VAULT_FILE))
    }

    /// Base URL from `BREWDESK_API_URL`, then the config file, then the default
    pub fn api_url(&self) -> String {
        self.resolve_api_url(std::env::var(API_URL_ENV).ok())
    }

    pub fn resolve_api_url(&self, env_value: Option<String>) -> String {
        let chosen = env_value
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_url.clone().filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        chosen.trim().trim_end_matches('/').to_string()
    }
}

/// True when `url` points at this machine, which other devices cannot reach
pub fn is_loopback(url: &str) -> bool {
    let Some(host) = reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
    else {
        return false;
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost")
        || host
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
}
