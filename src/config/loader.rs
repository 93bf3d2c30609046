//! Configuration loader with XDG-compliant path resolution
//!
//! Loads configuration from multiple locations with layered priority:
//! 1. `/etc/cistep/config.toml` (lowest priority)
//! 2. `~/.config/cistep/config.toml`
//! 3. `~/.cistep.toml`
//! 4. `./.cistep.toml`
//! 5. `--config <path>`
//! 6. `CISTEP_*` environment variables (highest priority)

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use super::model::Config;
use crate::error::StepError;

/// Application name used for XDG directories
const APP_NAME: &str = "cistep";

/// Environment variable prefix; `__` separates nested keys
const ENV_PREFIX: &str = "CISTEP_";

/// Get XDG config search paths in priority order (lowest to highest)
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from(format!("/etc/{}/config.toml", APP_NAME)));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join(APP_NAME).join("config.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(format!(".{}.toml", APP_NAME)));
    }

    paths.push(PathBuf::from(format!(".{}.toml", APP_NAME)));

    paths
}

/// Load configuration with XDG layering
///
/// Configurations are merged in priority order, with later files
/// overriding earlier ones. Environment variables with prefix
/// `CISTEP_` override all file-based configuration.
///
/// # Arguments
/// * `override_path` - Optional path to a config file that takes highest file priority
///
/// # Errors
/// * `StepError::Config` - If `override_path` does not exist, or a layer
///   holds a value of the wrong type
pub fn load_config(override_path: Option<&str>) -> Result<Config, StepError> {
    let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

    for path in config_paths() {
        if path.exists() {
            tracing::debug!("Loading config from: {}", path.display());
            figment = figment.merge(Toml::file(&path));
        }
    }

    if let Some(path) = override_path {
        let path = PathBuf::from(path);
        if path.exists() {
            tracing::debug!("Loading override config from: {}", path.display());
            figment = figment.merge(Toml::file(&path));
        } else {
            return Err(StepError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
    }

    // Format: CISTEP_RETRY__MAX_ATTEMPTS=5 -> retry.max_attempts = 5
    // CISTEP_LOG is the log filter, not a config key
    figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["LOG"]).split("__"));

    figment
        .extract()
        .map_err(|e| StepError::Config(e.to_string()))
}
