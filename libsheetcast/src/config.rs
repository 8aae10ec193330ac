//! Configuration management for Sheetcast

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub credentials: CredentialsConfig,
    pub ledger: LedgerConfig,
    pub fetch: FetchConfig,
    pub x: XConfig,
    pub lock: LockConfig,
    pub watch: WatchConfig,
}

/// Where the service-account key comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    SecretManager,
    KeyFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub source: KeySource,
    pub secret_name: String,
    pub secret_version: String,
    pub key_file: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            source: KeySource::SecretManager,
            secret_name: "social-schedule-secret".to_string(),
            secret_version: "latest".to_string(),
            key_file: "~/.config/sheetcast/service-account.json".to_string(),
        }
    }
}

impl CredentialsConfig {
    pub fn expand_key_file_path(&self) -> Result<PathBuf> {
        expand_path(&self.key_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Spreadsheet title, looked up through Drive
    pub document: String,
    /// Worksheet title; empty selects the first sheet
    pub worksheet: String,
    /// Only rows for this platform are eligible
    pub platform: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            document: "Social Scheduler".to_string(),
            worksheet: String::new(),
            platform: "X".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    /// Drive v3 API root; share links are fetched from `{base}/files/{id}?alt=media`
    pub drive_api_base: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            drive_api_base: "https://www.googleapis.com/drive/v3".to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XConfig {
    pub api_base: String,
    pub upload_base: String,
    pub timeout_secs: u64,
}

impl Default for XConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitter.com".to_string(),
            upload_base: "https://upload.twitter.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl XConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Lock file path; empty uses the data directory
    pub path: String,
    pub stale_after_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            stale_after_secs: 3600,
        }
    }
}

impl LockConfig {
    /// Resolve the lock file location
    ///
    /// Falls back to the system temp directory when no data directory exists,
    /// which is the case on most serverless runtimes.
    pub fn resolve_path(&self) -> Result<PathBuf> {
        if !self.path.is_empty() {
            return expand_path(&self.path);
        }
        let base = resolve_data_path().unwrap_or_else(|_| std::env::temp_dir().join("sheetcast"));
        Ok(base.join("sweep.lock"))
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

/// Settings for `sheet-watch`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Secret holding the key used for channel registration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

impl WatchConfig {
    /// Pick the secret for channel registration
    ///
    /// A command-line value wins over `[watch] secret_name`, which wins over
    /// [`WATCH_SECRET_NAME`](crate::watch::WATCH_SECRET_NAME).
    pub fn resolve_secret_name(&self, flag: Option<&str>) -> String {
        flag.or(self.secret_name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(crate::watch::WATCH_SECRET_NAME)
            .to_string()
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file yields the defaults; a file that exists but cannot be
    /// read or parsed is an error.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.ledger.document.trim().is_empty() {
            return Err(ConfigError::MissingField("ledger.document".to_string()).into());
        }
        if self.credentials.source == KeySource::SecretManager
            && self.credentials.secret_name.trim().is_empty()
        {
            return Err(ConfigError::MissingField("credentials.secret_name".to_string()).into());
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::MissingField("fetch.timeout_secs".to_string()).into());
        }
        Ok(())
    }
}

fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .map_err(|e| ConfigError::MissingField(format!("cannot expand '{}': {}", path, e)))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Resolve the configuration file path following XDG base directory conventions
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("SHEETCAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("sheetcast").join("config.toml"))
}

/// Resolve the data directory path following XDG base directory conventions
pub fn resolve_data_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ConfigError::MissingField("data directory".to_string()))?;

    Ok(data_dir.join("sheetcast"))
}
