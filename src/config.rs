//! Loading `config.toml`
//!
//! Every key is optional; a missing file yields the defaults. CLI flags are
//! applied on top of whatever the file says.

use anyhow::{Context, Result};
use declarative::Config;
use std::fs;
use std::path::Path;

use crate::paths;

/// Load the config file from the config directory
pub fn load() -> Result<Config> {
    load_from(&paths::config_file()?)
}

/// Load a config file, falling back to defaults when it does not exist
pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Apply command-line overrides
pub fn with_overrides(mut config: Config, why_run: bool, strict: bool) -> Config {
    if why_run {
        config.why_run = true;
    }
    if strict {
        config.treat_deprecation_warnings_as_errors = true;
    }
    config
}

/// Render the effective configuration as TOML
pub fn to_toml(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize config")
}
