//! Pipeline configuration loading
//!
//! Configuration lives in a single TOML file. Every section and field has a
//! compiled default, so an empty file (or no file at all) yields a working
//! configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 50 MiB
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Extensions accepted by file intake when none are configured
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] =
    &["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx"];

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub intake: IntakeConfig,
    pub upload: UploadConfig,
    pub polling: PollingConfig,
    pub backend: BackendConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// File selection constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Largest accepted file, inclusive
    pub max_size_bytes: u64,
    /// Lower-case extensions without the leading dot
    pub allowed_extensions: Vec<String>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// Simulated upload progress parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub tick_interval_ms: u64,
    /// Upper bound of the random increment applied on each tick
    pub max_increment: u8,
    /// Simulated progress never exceeds this before the transport resolves
    pub soft_ceiling: u8,
    /// Delay between reaching 100% and resetting the indicator to 0
    pub reset_grace_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 200,
            max_increment: 30,
            soft_ceiling: 90,
            reset_grace_ms: 1000,
        }
    }
}

impl UploadConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn reset_grace(&self) -> Duration {
        Duration::from_millis(self.reset_grace_ms)
    }
}

/// Status polling cadence and advisory timeout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub timeout_secs: u64,
    /// Progress reported right after submission, before the first poll
    pub initial_progress: u8,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            timeout_secs: 300,
            initial_progress: 10,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Remote job backend location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5731".to_string(),
        }
    }
}

/// Logging settings (overridden by RUST_LOG when set)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.intake.allowed_extensions.is_empty() {
            return Err(Error::Config(
                "intake.allowed_extensions must not be empty".to_string(),
            ));
        }
        if self.upload.tick_interval_ms == 0 {
            return Err(Error::Config(
                "upload.tick_interval_ms must be greater than 0".to_string(),
            ));
        }
        if !(1..=99).contains(&self.upload.soft_ceiling) {
            return Err(Error::Config(format!(
                "upload.soft_ceiling must be within 1..=99, got {}",
                self.upload.soft_ceiling
            )));
        }
        if self.polling.interval_ms == 0 {
            return Err(Error::Config(
                "polling.interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.polling.timeout_secs == 0 {
            return Err(Error::Config(
                "polling.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.polling.initial_progress > 100 {
            return Err(Error::Config(format!(
                "polling.initial_progress must be at most 100, got {}",
                self.polling.initial_progress
            )));
        }
        Ok(())
    }
}

/// Read and validate a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)?;
    let mut config: PipelineConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    // Extensions are compared lower-case without the dot
    config.intake.allowed_extensions = config
        .intake
        .allowed_extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .collect();

    config.validate()?;
    Ok(config)
}

/// Write configuration as TOML, creating parent directories as needed
pub fn write_toml_config(config: &PipelineConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Write to a sibling then rename so readers never see a partial file
    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Per-user configuration file location (~/.config/dwm/pipeline.toml on Linux)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("dwm").join("pipeline.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.intake.max_size_bytes, 52_428_800);
        assert_eq!(config.intake.allowed_extensions.len(), 7);
        assert_eq!(config.polling.interval(), Duration::from_secs(2));
        assert_eq!(config.polling.timeout(), Duration::from_secs(300));
        assert_eq!(config.upload.tick_interval(), Duration::from_millis(200));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pipeline.toml");
        std::fs::write(
            &path,
            "[polling]\ninterval_ms = 500\n\n[intake]\nallowed_extensions = [\".PDF\", \"Txt\"]\n",
        )
        .unwrap();

        let config = load_toml_config(&path).unwrap();
        assert_eq!(config.polling.interval_ms, 500);
        assert_eq!(config.polling.timeout_secs, 300);
        assert_eq!(config.intake.allowed_extensions, vec!["pdf", "txt"]);
        assert_eq!(config.intake.max_size_bytes, DEFAULT_MAX_SIZE_BYTES);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pipeline.toml");
        std::fs::write(&path, "[upload]\nsoft_ceiling = 100\n").unwrap();

        let err = load_toml_config(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("soft_ceiling"));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pipeline.toml");
        std::fs::write(&path, "[polling\n").unwrap();

        assert!(matches!(load_toml_config(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_write_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("pipeline.toml");

        let mut config = PipelineConfig::default();
        config.backend.base_url = "http://backend.internal:9000".to_string();
        write_toml_config(&config, &path).unwrap();

        let loaded = load_toml_config(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(!path.with_extension("toml.tmp").exists());
    }
}
