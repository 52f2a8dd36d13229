//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the API base URL, which credential backend to use, the request timeout
//! and the last email used to log in.
//!
//! Configuration is stored at `~/.config/absensi/config.json`. The
//! `ABSENSI_API_BASE_URL` environment variable overrides the stored URL.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::auth::{
    CredentialStore, FileCredentialStore, KeyringCredentialStore, MemoryCredentialStore,
};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "absensi";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base_url`
pub const BASE_URL_ENV: &str = "ABSENSI_API_BASE_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl std::str::FromStr for CredentialBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keyring" => Ok(Self::Keyring),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!("Unknown credential backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server root, without the `/api` suffix.
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub credential_backend: CredentialBackend,
    pub last_email: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path)?;
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.api_base_url = Some(url);
            }
        }
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
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

    /// Full API prefix, i.e. the server root with `/api` appended.
    pub fn api_url(&self) -> Result<String> {
        let base = self
            .api_base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!("API base URL is not configured (set {} or run `absensi config`)", BASE_URL_ENV)
            })?;
        Ok(format!("{}/api", base.trim_end_matches('/')))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    /// Open the configured credential backend.
    pub fn credential_store(&self) -> Result<Arc<dyn CredentialStore>> {
        Ok(match self.credential_backend {
            CredentialBackend::File => Arc::new(FileCredentialStore::new(self.cache_dir()?)),
            CredentialBackend::Keyring => Arc::new(KeyringCredentialStore::new()),
            CredentialBackend::Memory => Arc::new(MemoryCredentialStore::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_api_url_appends_prefix() {
        let config = Config {
            api_base_url: Some("https://absen.dexagroup.com/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.api_url().unwrap(), "https://absen.dexagroup.com/api");

        let empty = Config {
            api_base_url: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(empty.api_url().is_err());
        assert!(Config::default().api_url().is_err());
    }

    #[test]
    fn test_request_timeout_default() {
        assert_eq!(Config::default().request_timeout(), Duration::from_secs(30));
        let config = Config {
            request_timeout_secs: Some(5),
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absensi").join(CONFIG_FILE);

        assert!(Config::load_from(&path).unwrap().api_base_url.is_none());

        let config = Config {
            api_base_url: Some("http://localhost:3000".to_string()),
            credential_backend: CredentialBackend::Keyring,
            last_email: Some("sari@dexagroup.com".to_string()),
            request_timeout_secs: None,
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.credential_backend, CredentialBackend::Keyring);
        assert_eq!(loaded.last_email.as_deref(), Some("sari@dexagroup.com"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"credential_backend\": \"keyring\""));
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("FILE".parse::<CredentialBackend>().unwrap(), CredentialBackend::File);
        assert_eq!("memory".parse::<CredentialBackend>().unwrap(), CredentialBackend::Memory);
        assert!("vault".parse::<CredentialBackend>().is_err());
    }

    #[test]
    fn test_missing_backend_defaults_to_file() {
        let config: Config = serde_json::from_str(r#"{"api_base_url":"http://x"}"#).unwrap();
        assert_eq!(config.credential_backend, CredentialBackend::File);
    }
}
