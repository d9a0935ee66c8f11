use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::normalize::DEFAULT_CONCURRENCY;

/// Environment variable holding the API credential.
pub const API_KEY_VAR: &str = "LINEAR_API_KEY";
/// Optional override for the GraphQL endpoint.
pub const API_URL_VAR: &str = "LINEAR_API_URL";
pub const DEFAULT_API_URL: &str = "https://api.linear.app/graphql";

/// Optional settings from `~/.config/blockmap/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default)]
    pub show_actionable: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            concurrency: default_concurrency(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
            show_actionable: false,
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub api_url: String,
    pub concurrency: usize,
    pub page_size: usize,
    pub page_delay: Duration,
    pub show_actionable: bool,
}

/// Path of the user config file, if the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("blockmap/config.toml"))
}

/// Load the user config, falling back to defaults when there is none.
///
/// # Errors
///
/// Returns [`Error::ConfigParse`] if the file exists but is unreadable or
/// not valid TOML.
pub fn load_user_config() -> Result<UserConfig> {
    match user_config_path() {
        Some(path) => load_config_from(&path),
        None => Ok(UserConfig::default()),
    }
}

/// Load a config file from `path`. A missing file yields defaults.
///
/// # Errors
///
/// Returns [`Error::ConfigParse`] on read or parse failure.
pub fn load_config_from(path: &Path) -> Result<UserConfig> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    toml::from_str::<UserConfig>(&content).map_err(|e| Error::ConfigParse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Resolve settings from the user config and the process environment.
///
/// # Errors
///
/// Returns [`Error::MissingConfig`] when `LINEAR_API_KEY` is unset or empty.
pub fn resolve_settings(user: UserConfig) -> Result<Settings> {
    resolve_settings_with(user, |key| env::var(key).ok())
}

/// Like [`resolve_settings`] with an injectable environment lookup.
///
/// # Errors
///
/// Returns [`Error::MissingConfig`] when the API key is unset or empty.
pub fn resolve_settings_with<F>(user: UserConfig, lookup: F) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = lookup(API_KEY_VAR)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| Error::MissingConfig {
            key: API_KEY_VAR.to_string(),
        })?;

    let api_url = lookup(API_URL_VAR)
        .filter(|value| !value.trim().is_empty())
        .or(user.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    Ok(Settings {
        api_key,
        api_url,
        concurrency: user.concurrency.max(1),
        page_size: user.page_size.clamp(1, 250),
        page_delay: Duration::from_millis(user.page_delay_ms),
        show_actionable: user.show_actionable,
    })
}

const fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

const fn default_page_size() -> usize {
    50
}

const fn default_page_delay_ms() -> u64 {
    100
}
