//! Configuration file loading for the CLI
//!
//! This module handles finding and loading TOML configuration files
//! from various locations (explicit path, local directory, system directory).

use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

use takeoff::{TakeoffError, config::AppConfig, qa::QaThresholds};

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),
}

impl From<ConfigError> for TakeoffError {
    fn from(err: ConfigError) -> Self {
        TakeoffError::Config(err.to_string())
    }
}

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Local project directory (takeoff/config.toml)
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be parsed
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, TakeoffError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new("takeoff/config.toml");
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "takeoff", "takeoff") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return load_config_file(system_config);
        }

        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using default configuration");
    Ok(AppConfig::default())
}

/// Load QA thresholds, falling back to the defaults.
///
/// An explicit path that cannot be read or parsed still yields defaults; the
/// problem is logged by [`QaThresholds::load`].
pub fn load_thresholds(explicit_path: Option<impl AsRef<Path>>) -> QaThresholds {
    match explicit_path {
        Some(path) => QaThresholds::load(path.as_ref()),
        None => QaThresholds::default(),
    }
}

fn load_config_file(path: impl AsRef<Path>) -> Result<AppConfig, TakeoffError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()).into());
    }

    let content = fs::read_to_string(path)?;
    let config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_explicit_path_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[calibration]\nmin_bar_length = 50.0").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.calibration().min_bar_length, 50.0);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, TakeoffError::Config(_)));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[calibration\nmin_bar_length = ").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, TakeoffError::Config(msg) if msg.contains("TOML")));
    }

    #[test]
    fn test_thresholds_default_without_path() {
        let thresholds = load_thresholds(None::<&Path>);
        assert_eq!(thresholds, QaThresholds::default());
    }
}
