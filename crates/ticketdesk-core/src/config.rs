//! Application configuration management.
//!
//! Configuration is stored at `~/.config/ticketdesk/config.json`. Any field
//! may be missing; defaults fill the gaps. A few settings can be overridden
//! from the environment (see `Config::apply_env`).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{CredentialStore, FileStorage, KeyringStorage, MemoryStorage};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "ticketdesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:4000/api";

const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "TICKETDESK_API_URL";

/// Where the bearer token is kept between requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Lost when the process exits
    Memory,
    /// `credentials.json` in the cache directory
    #[default]
    File,
    /// OS keychain
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub login_route: String,
    pub storage: StorageKind,
    /// Per-request timeout. `None` leaves the transport default in place.
    pub request_timeout_secs: Option<u64>,
    pub last_email: Option<String>,
    pub log_to_file: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            storage: StorageKind::default(),
            request_timeout_secs: None,
            last_email: None,
            log_to_file: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.is_empty()) {
            self.api_base_url = url;
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Credential store over the configured backend, rooted in `cache_dir`.
    pub fn credential_store(&self, cache_dir: PathBuf) -> CredentialStore {
        match self.storage {
            StorageKind::Memory => CredentialStore::new(MemoryStorage::new()),
            StorageKind::File => CredentialStore::new(FileStorage::new(cache_dir)),
            StorageKind::Keyring => CredentialStore::new(KeyringStorage::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.login_route, "/login");
        assert_eq!(config.storage, StorageKind::File);
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"storage":"memory","request_timeout_secs":15}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            last_email: Some("staff@example.com".into()),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.last_email.as_deref(), Some("staff@example.com"));
    }

    #[test]
    fn test_env_override() {
        let mut config = Config::default();
        config.apply_env(|key| (key == API_URL_ENV).then(|| "https://tickets.example.com/api".to_string()));
        assert_eq!(config.api_base_url, "https://tickets.example.com/api");

        // Empty values are ignored
        config.apply_env(|_| Some(String::new()));
        assert_eq!(config.api_base_url, "https://tickets.example.com/api");
    }

    #[test]
    fn test_credential_store_per_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage: StorageKind::File,
            ..Default::default()
        };
        let store = config.credential_store(dir.path().to_path_buf());
        store.set("abc");
        assert!(dir.path().join("credentials.json").exists());
    }
}
