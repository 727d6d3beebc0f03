//! Configuration file resolution and loading
//!
//! Config file priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. User config file (`~/.config/vct/config.toml` on Linux)
//! 4. System config file (`/etc/vct/config.toml`, Linux only)
//!
//! When no file is found the caller falls back to compiled defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name used under the platform config dir
pub const APP_DIR: &str = "vct";

/// Logging section shared by all VCT config files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Resolve which config file to load, if any
///
/// Returns `None` when no candidate exists; the caller then uses defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3/4: platform config locations
    default_config_candidates()
        .into_iter()
        .find(|candidate| candidate.exists())
}

/// Platform config file candidates, most specific first
fn default_config_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR).join("config.toml"));
    }

    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc").join(APP_DIR).join("config.toml"));
    }

    candidates
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// This file was requested but does not exist; defaults were used
    Missing(PathBuf),
    /// No file was requested; defaults were used
    Defaults,
}

impl ConfigSource {
    /// Log how the configuration was obtained
    ///
    /// Loading happens before the tracing subscriber exists (the log level is
    /// part of the config), so the outcome is logged once tracing is up.
    pub fn report(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
            ConfigSource::Missing(path) => warn!(
                "Config file {} does not exist, using compiled defaults",
                path.display()
            ),
            ConfigSource::Defaults => info!("No config file found, using compiled defaults"),
        }
    }
}

/// Load a TOML config file into `T`
///
/// A missing file is not fatal: `T::default()` is returned together with
/// `ConfigSource::Missing`. A file that exists but cannot be read or parsed
/// is an error.
pub fn load_toml<T>(path: Option<&Path>) -> Result<(T, ConfigSource)>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        return Ok((T::default(), ConfigSource::Defaults));
    };

    if !path.exists() {
        return Ok((T::default(), ConfigSource::Missing(path.to_path_buf())));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    Ok((config, ConfigSource::File(path.to_path_buf())))
}

/// Validate a secret (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve a secret from environment then TOML
///
/// **Priority:** ENV → TOML. Invalid (blank) values are skipped.
pub fn resolve_secret(env_var_name: &str, toml_value: Option<&str>) -> Option<String> {
    let env_value = std::env::var(env_var_name)
        .ok()
        .filter(|key| is_valid_key(key));
    let toml_value = toml_value.filter(|key| is_valid_key(key));

    match (env_value, toml_value) {
        (Some(env), Some(_)) => {
            warn!(
                "{} set in both environment and TOML config. Using environment.",
                env_var_name
            );
            Some(env)
        }
        (Some(env), None) => {
            info!("{} loaded from environment variable", env_var_name);
            Some(env)
        }
        (None, Some(toml)) => {
            info!("{} loaded from TOML config", env_var_name);
            Some(toml.to_string())
        }
        (None, None) => None,
    }
}
