//! Configuration module for FlexoGear-RS
//!
//! This module handles application configuration including:
//! - Device link identifiers and queue sizes
//! - Exercise thresholds and automation timing
//! - Motor position table (including the RELAX posture)
//! - Where session records are written and for which patient
//! - Simulated device behaviour for demos and tests
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.flexogear.flexogear-rs/`
//! - **macOS**: `~/Library/Application Support/dev.flexogear.flexogear-rs/`
//! - **Windows**: `%APPDATA%\dev.flexogear.flexogear-rs\`
//!
//! # Files
//!
//! - `config.toml` or `config.json` - Application configuration
//! - `sessions/<patient>.jsonl` - Session records
//! - `logs/` - Rolling log files
//!
//! # Example
//!
//! ```ignore
//! use flexogear_rs::config::AppConfig;
//!
//! let config = AppConfig::load_or_default("config.toml");
//! println!("Flex threshold: {}", config.exercise.flex_threshold_deg);
//! config.save("config.json")?;
//! ```

pub mod settings;

pub use settings::*;

use crate::device::PositionTable;
use crate::error::{FlexoError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.flexogear.flexogear-rs";

/// Default configuration filename
pub const CONFIG_FILE: &str = "config.toml";

/// Subdirectory for session records
pub const SESSIONS_DIR: &str = "sessions";

/// Subdirectory for log files
pub const LOGS_DIR: &str = "logs";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        FlexoError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            FlexoError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the default configuration file
pub fn default_config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== App Config ====================

/// On-disk format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Format for `path`; anything but `.json` is TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Device link configuration
    #[serde(default)]
    pub device: DeviceConfig,

    /// Exercise tuning
    #[serde(default)]
    pub exercise: ExerciseConfig,

    /// Motor positions
    #[serde(default)]
    pub motors: PositionTable,

    /// Session record configuration
    #[serde(default)]
    pub recorder: RecorderConfig,

    /// Simulated device configuration
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl AppConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration file (JSON or TOML by extension)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlexoError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        match ConfigFormat::from_path(path) {
            ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| {
                FlexoError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            }),
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| {
                FlexoError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            }),
        }
    }

    /// Load a configuration file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the configuration (JSON or TOML by extension)
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FlexoError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = match ConfigFormat::from_path(path) {
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| FlexoError::Config(format!("Failed to serialize config: {}", e)))?,
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| FlexoError::Config(format!("Failed to serialize config: {}", e)))?,
        };

        std::fs::write(path, content).map_err(|e| {
            FlexoError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Directory session records are written to
    pub fn sessions_dir(&self) -> Result<PathBuf> {
        match &self.recorder.sessions_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(ensure_app_data_dir()?.join(SESSIONS_DIR)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{MotionPattern, MotorCommand};

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.JSON")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Toml);
    }

    #[test]
    fn test_json_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.exercise.automation_delay_ms = 750;
        config.recorder.patient_id = "p-42".to_string();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_toml_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.simulation.pattern = MotionPattern::Deviation {
            period_secs: 3.0,
            amplitude_deg: 15.0,
        };
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.simulation.pattern, config.simulation.pattern);
        assert_eq!(loaded.motors, config.motors);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[exercise]
flex_threshold_deg = -25.0

[motors.relax]
a1 = "90"
a2 = "30"
a3 = "30"
"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.exercise.flex_threshold_deg, -25.0);
        assert_eq!(config.exercise.neutral_threshold_deg, -10.0);
        assert_eq!(config.motors.relax(), &MotorCommand::new("90", "30", "30"));
        assert!(config.motors.contains("TOP"));
        assert_eq!(config.device.name, "FlexoGear");
    }

    #[test]
    fn test_load_or_default_on_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(AppConfig::load(&path).is_err());
        assert_eq!(AppConfig::load_or_default(&path), AppConfig::default());
        assert_eq!(
            AppConfig::load_or_default(dir.path().join("missing.toml")),
            AppConfig::default()
        );
    }

    #[test]
    fn test_explicit_sessions_dir() {
        let mut config = AppConfig::default();
        config.recorder.sessions_dir = Some(PathBuf::from("/tmp/flexo"));
        assert_eq!(config.sessions_dir().unwrap(), PathBuf::from("/tmp/flexo"));
    }
}
