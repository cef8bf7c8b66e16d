//! Persistent client configuration model and file-backed manager.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use issuedesk_api::config::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS};
use issuedesk_api::{ApiConfig, DEFAULT_PAGE_SIZE};

pub const API_URL_ENV: &str = "ISSUEDESK_API_URL";
const MAX_PAGE_SIZE: u32 = 100;
const MIN_DEBOUNCE_MS: u64 = 50;
const MAX_DEBOUNCE_MS: u64 = 5_000;

/// API URL baked in at build time, falling back to the client crate default.
fn default_api_base_url() -> String {
    option_env!("ISSUEDESK_API_URL")
        .map(str::to_string)
        .unwrap_or_else(|| issuedesk_api::config::DEFAULT_API_BASE.to_string())
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Quiescence window for free-text search, in milliseconds.
fn default_search_debounce_ms() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

/// Where the session credential is persisted between runs.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    Keyring,
    File,
}

impl Default for CredentialBackend {
    /// Linux keyrings (keyutils) are dropped on reboot, so Linux defaults to the file store.
    fn default() -> Self {
        if cfg!(target_os = "linux") {
            CredentialBackend::File
        } else {
            CredentialBackend::Keyring
        }
    }
}

impl std::str::FromStr for CredentialBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "keyring" => Ok(CredentialBackend::Keyring),
            "file" => Ok(CredentialBackend::File),
            other => Err(format!("unknown credential backend '{other}' (expected keyring or file)")),
        }
    }
}

/// Represents the client configuration persisted on disk: API endpoint, listing page size, search debounce window, timeouts and credential backend.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    pub credential_backend: CredentialBackend,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            page_size: default_page_size(),
            search_debounce_ms: default_search_debounce_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            credential_backend: CredentialBackend::default(),
        }
    }
}

impl AppConfig {
    /// Clamps values that would make the client unusable.
    pub fn normalize(mut self) -> Self {
        let trimmed = self.api_base_url.trim();
        self.api_base_url = if trimmed.is_empty() {
            default_api_base_url()
        } else {
            trimmed.to_string()
        };
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        self.search_debounce_ms = self.search_debounce_ms.clamp(MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.connect_timeout_secs = self.connect_timeout_secs.max(1);
        self
    }

    /// Applies the runtime environment override for the API URL.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
        self
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(self.api_base_url.clone())
            .with_user_agent(format!("issuedesk/{}", env!("CARGO_PKG_VERSION")))
            .with_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
    }
}

/// Platform directories used for config and file-backed credentials.
pub fn project_dirs() -> Result<directories::ProjectDirs, String> {
    directories::ProjectDirs::from("dev", "issuedesk", "issuedesk")
        .ok_or_else(|| "Could not determine a home directory for issuedesk".to_string())
}

/// Loads and saves the JSON configuration file in the platform-specific config directory.
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Creates a manager bound to the platform-specific config path.
    pub fn new() -> Result<Self, String> {
        let dirs = project_dirs()?;
        Ok(Self {
            path: dirs.config_dir().join("config.json"),
        })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads config from disk, falling back to defaults on read/parse errors.
    pub fn load(&self) -> AppConfig {
        if !self.path.exists() {
            return AppConfig::default();
        }
        let content = fs::read_to_string(&self.path).unwrap_or_default();
        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config.normalize(),
            Err(err) => {
                log::warn!("Ignoring invalid config at {}: {}", self.path.display(), err);
                AppConfig::default()
            }
        }
    }

    /// Persists config to disk, creating parent directories when needed.
    pub fn save(&self, config: &AppConfig) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}
