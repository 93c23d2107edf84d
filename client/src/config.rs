use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const API_URL_ENV: &str = "CRMDESK_API_URL";
pub const PROJECT_ID_ENV: &str = "CRMDESK_PROJECT_ID";
pub const PUBLIC_KEY_ENV: &str = "CRMDESK_PUBLIC_KEY";
pub const TIMEOUT_ENV: &str = "CRMDESK_TIMEOUT_SECS";

/// Settings persisted in `<config_dir>/crmdesk/config.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Values given explicitly (flags or environment); these win over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub project_id: Option<String>,
    pub public_key: Option<String>,
    pub timeout_secs: Option<String>,
}

/// Resolved connection settings for the table API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: Url,
    pub project_id: String,
    pub public_key: String,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Overrides first, then the stored file, then defaults.
    pub fn resolve(
        overrides: ConfigOverrides,
        stored: Option<StoredConfig>,
    ) -> Result<Self, ConfigError> {
        let stored = stored.unwrap_or_default();

        let raw_url = overrides
            .api_url
            .or(stored.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidUrl {
            value: raw_url.clone(),
            source,
        })?;

        let project_id = overrides
            .project_id
            .or(stored.project_id)
            .ok_or(ConfigError::Missing {
                setting: "project id",
                env: PROJECT_ID_ENV,
            })?;
        let public_key = overrides
            .public_key
            .or(stored.public_key)
            .ok_or(ConfigError::Missing {
                setting: "public key",
                env: PUBLIC_KEY_ENV,
            })?;

        let timeout_secs = match overrides.timeout_secs {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw))?,
            None => stored.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_url,
            project_id,
            public_key,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn load(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::resolve(overrides, load_stored()?)
    }

    /// Base URL without a trailing slash, for path concatenation.
    pub fn base_url(&self) -> &str {
        self.api_url.as_str().trim_end_matches('/')
    }
}

pub fn config_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crmdesk");
    config_dir.join("config.json")
}

/// Read the stored config. A missing file is not an error.
pub fn load_stored() -> Result<Option<StoredConfig>, ConfigError> {
    let path = config_path();
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&data)?))
}

pub fn save_stored(config: &StoredConfig) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let data = serde_json::to_string_pretty(config)?;

    // Write with restricted permissions (0o600)
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(&path)?;
    file.write_all(data.as_bytes())?;

    Ok(path)
}

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

#[cfg(not(unix))]
trait OpenOptionsExt {
    fn mode(&mut self, _mode: u32) -> &mut Self;
}

#[cfg(not(unix))]
impl OpenOptionsExt for std::fs::OpenOptions {
    fn mode(&mut self, _mode: u32) -> &mut Self {
        self
    }
}
