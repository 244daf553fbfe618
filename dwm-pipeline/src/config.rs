//! Configuration resolution for dwm-pipeline
//!
//! Provides multi-tier configuration resolution with
//! CLI argument → `DWM_CONFIG` → user config file → compiled defaults priority,
//! followed by per-field environment overrides.

use dwm_common::config::{load_toml_config, user_config_path, write_toml_config, PipelineConfig};
use dwm_common::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Config file path override
pub const CONFIG_PATH_ENV: &str = "DWM_CONFIG";
/// Overrides `backend.base_url`
pub const BACKEND_URL_ENV: &str = "DWM_BACKEND_URL";
/// Overrides `server.bind`
pub const BIND_ENV: &str = "DWM_BIND";
/// Overrides `logging.level`
pub const LOG_LEVEL_ENV: &str = "DWM_LOG";

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Argument(PathBuf),
    Environment(PathBuf),
    UserFile(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Argument(p) => write!(f, "argument ({})", p.display()),
            ConfigSource::Environment(p) => write!(f, "{} ({})", CONFIG_PATH_ENV, p.display()),
            ConfigSource::UserFile(p) => write!(f, "user config ({})", p.display()),
            ConfigSource::Defaults => write!(f, "compiled defaults"),
        }
    }
}

/// Resolve the pipeline configuration
///
/// An explicitly named file (argument or `DWM_CONFIG`) must load; a missing
/// user config file falls through to defaults.
pub fn resolve_config(cli_path: Option<&Path>) -> Result<(PipelineConfig, ConfigSource)> {
    resolve_config_with_user_path(cli_path, user_config_path())
}

fn resolve_config_with_user_path(
    cli_path: Option<&Path>,
    user_path: Option<PathBuf>,
) -> Result<(PipelineConfig, ConfigSource)> {
    let env_path = non_empty_env(CONFIG_PATH_ENV).map(PathBuf::from);
    let user_path = user_path.filter(|p| p.exists());

    let mut sources = Vec::new();
    if cli_path.is_some() {
        sources.push("argument");
    }
    if env_path.is_some() {
        sources.push(CONFIG_PATH_ENV);
    }
    if user_path.is_some() {
        sources.push("user config");
    }
    if sources.len() > 1 {
        warn!(
            "Configuration found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    let (mut config, source) = if let Some(path) = cli_path {
        (load_toml_config(path)?, ConfigSource::Argument(path.to_path_buf()))
    } else if let Some(path) = env_path {
        (load_toml_config(&path)?, ConfigSource::Environment(path))
    } else if let Some(path) = user_path {
        (load_toml_config(&path)?, ConfigSource::UserFile(path))
    } else {
        (PipelineConfig::default(), ConfigSource::Defaults)
    };

    apply_env_overrides(&mut config);
    config.validate()?;

    info!("Configuration loaded from {}", source);
    Ok((config, source))
}

/// Apply per-field environment overrides
pub fn apply_env_overrides(config: &mut PipelineConfig) {
    if let Some(url) = non_empty_env(BACKEND_URL_ENV) {
        info!("Backend URL overridden by {}", BACKEND_URL_ENV);
        config.backend.base_url = url;
    }
    if let Some(bind) = non_empty_env(BIND_ENV) {
        info!("Bind address overridden by {}", BIND_ENV);
        config.server.bind = bind;
    }
    if let Some(level) = non_empty_env(LOG_LEVEL_ENV) {
        config.logging.level = level;
    }
}

/// Write the compiled defaults to `path` unless a file is already there
pub fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        info!("Config file already exists: {}", path.display());
        return Ok(false);
    }

    write_toml_config(&PipelineConfig::default(), path)?;
    info!("Default configuration written to {}", path.display());
    Ok(true)
}

/// Default location for `write_default_config`
pub fn default_config_path() -> Result<PathBuf> {
    user_config_path()
        .ok_or_else(|| Error::Config("Could not determine the user config directory".to_string()))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        for name in [CONFIG_PATH_ENV, BACKEND_URL_ENV, BIND_ENV, LOG_LEVEL_ENV] {
            std::env::remove_var(name);
        }
    }

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    #[serial]
    fn test_defaults_when_nothing_configured() {
        clear_env();
        let (config, source) = resolve_config_with_user_path(None, None).unwrap();
        assert_eq!(source, ConfigSource::Defaults);
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    #[serial]
    fn test_argument_beats_env_and_user_file() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let cli = write(&dir, "cli.toml", "[polling]\ninterval_ms = 500\n");
        let env = write(&dir, "env.toml", "[polling]\ninterval_ms = 700\n");
        let user = write(&dir, "user.toml", "[polling]\ninterval_ms = 900\n");
        std::env::set_var(CONFIG_PATH_ENV, &env);

        let (config, source) = resolve_config_with_user_path(Some(&cli), Some(user)).unwrap();
        assert_eq!(source, ConfigSource::Argument(cli));
        assert_eq!(config.polling.interval_ms, 500);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_path_beats_user_file() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let env = write(&dir, "env.toml", "[polling]\ntimeout_secs = 60\n");
        let user = write(&dir, "user.toml", "[polling]\ntimeout_secs = 90\n");
        std::env::set_var(CONFIG_PATH_ENV, &env);

        let (config, source) = resolve_config_with_user_path(None, Some(user)).unwrap();
        assert_eq!(source, ConfigSource::Environment(env));
        assert_eq!(config.polling.timeout_secs, 60);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_user_file_falls_back_to_defaults() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let (_, source) =
            resolve_config_with_user_path(None, Some(dir.path().join("absent.toml"))).unwrap();
        assert_eq!(source, ConfigSource::Defaults);
    }

    #[test]
    #[serial]
    fn test_explicit_missing_file_is_error() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(resolve_config_with_user_path(Some(&missing), None).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides_apply_after_file() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let cli = write(&dir, "cli.toml", "[backend]\nbase_url = \"http://file:1\"\n");
        std::env::set_var(BACKEND_URL_ENV, "http://env:2");
        std::env::set_var(BIND_ENV, "0.0.0.0:9000");
        std::env::set_var(LOG_LEVEL_ENV, "  ");

        let (config, _) = resolve_config_with_user_path(Some(&cli), None).unwrap();
        assert_eq!(config.backend.base_url, "http://env:2");
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        // Blank values are ignored
        assert_eq!(config.logging.level, "info");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_file_rejected() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let cli = write(&dir, "bad.toml", "[upload]\nsoft_ceiling = 100\n");
        let err = resolve_config_with_user_path(Some(&cli), None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_write_default_config_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("pipeline.toml");

        assert!(write_default_config(&path).unwrap());
        assert!(!write_default_config(&path).unwrap());
        assert_eq!(load_toml_config(&path).unwrap(), PipelineConfig::default());
    }
}
