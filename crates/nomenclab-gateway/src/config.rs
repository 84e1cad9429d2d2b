//! Client profile configuration.
//!
//! Profiles live in `~/.nomenclab/config.toml`:
//!
//! ```toml
//! [default]
//! base_url = "https://lis.example.org/api"
//! page_size = 50
//!
//! [staging]
//! base_url = "https://staging.lis.example.org/api"
//! ```
//!
//! The `NOMENCLAB_URL` environment variable overrides the profile's
//! `base_url` when set.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_PAGE_SIZE: u32 = 50;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Errors raised while loading the profile file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot determine home directory")]
    NoHomeDirectory,

    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No base URL configured for profile '{profile}'; set NOMENCLAB_URL or add it to config.toml")]
    MissingBaseUrl { profile: String },
}

/// Resolved gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Requested page size for the paginated Analysis collection.
    pub page_size: u32,
    pub request_timeout_secs: u64,
}

impl GatewayConfig {
    /// Configuration pointing at a given base URL, defaults elsewhere.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Resolve a named profile from the config file and environment.
    ///
    /// Resolution order for the base URL: `NOMENCLAB_URL` env var, then the
    /// profile's `base_url` entry.
    ///
    /// # Errors
    ///
    /// Fails when the file is unreadable or malformed, or when no base URL
    /// can be resolved at all.
    pub fn load_profile(profile: &str) -> Result<Self, ConfigError> {
        let profiles = load_all()?;
        let entry = profiles.get(profile).cloned().unwrap_or_default();
        Self::resolve(profile, entry, std::env::var("NOMENCLAB_URL").ok())
    }

    fn resolve(
        profile: &str,
        entry: ProfileEntry,
        env_url: Option<String>,
    ) -> Result<Self, ConfigError> {
        let base_url =
            env_url
                .or(entry.base_url)
                .ok_or_else(|| ConfigError::MissingBaseUrl {
                    profile: profile.to_string(),
                })?;
        Ok(Self {
            base_url,
            page_size: entry.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            request_timeout_secs: entry.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProfileEntry {
    base_url: Option<String>,
    page_size: Option<u32>,
    request_timeout_secs: Option<u64>,
}

type ConfigFile = HashMap<String, ProfileEntry>;

fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = dirs::home_dir()
        .ok_or(ConfigError::NoHomeDirectory)?
        .join(".nomenclab");
    Ok(dir.join("config.toml"))
}

fn load_all() -> Result<ConfigFile, ConfigError> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(ConfigFile::new());
    }
    let content = fs::read_to_string(&path)?;
    Ok(toml::from_str(&content)?)
}
