//! Configuration sections
//!
//! Each section of [`super::AppConfig`] lives here with its defaults. The
//! defaults reproduce the constants the device firmware and the clinic
//! workflow were tuned with, so an empty config file is a working config.
//!
//! # Main Types
//!
//! - [`DeviceConfig`] - Advertised name, GATT identifiers and queue sizes
//! - [`ExerciseConfig`] - Rep thresholds and automation timing
//! - [`RecorderConfig`] - Patient identity and record location
//! - [`SimulationConfig`] - Behaviour of the simulated device

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::device::{
    MotionPattern, COMMAND_CHARACTERISTIC_UUID, DEFAULT_DEVICE_NAME, SERVICE_UUID,
    TELEMETRY_CHARACTERISTIC_UUID,
};
use crate::exercise::RepThresholds;

/// Device link settings
///
/// The GATT identifiers are what a radio-backed [`crate::device::WristDevice`]
/// binds to. [`crate::device::SimulatedDevice`] has no GATT layer and only
/// reports them in the startup log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Advertised name the scan filters on
    pub name: String,
    /// GATT service UUID
    pub service_uuid: String,
    /// Telemetry (notify) characteristic UUID
    pub telemetry_uuid: String,
    /// Command (write) characteristic UUID
    pub command_uuid: String,
    /// How long a connection attempt may take before the caller gives up
    pub connect_timeout_ms: u64,
    /// Capacity of the session event queue
    pub event_queue_size: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEVICE_NAME.to_string(),
            service_uuid: SERVICE_UUID.to_string(),
            telemetry_uuid: TELEMETRY_CHARACTERISTIC_UUID.to_string(),
            command_uuid: COMMAND_CHARACTERISTIC_UUID.to_string(),
            connect_timeout_ms: 10_000,
            event_queue_size: 1024,
        }
    }
}

impl DeviceConfig {
    /// Connection timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// One-line description of the device and its GATT identifiers
    pub fn link_summary(&self) -> String {
        format!(
            "'{}' (service {}, telemetry {}, command {})",
            self.name, self.service_uuid, self.telemetry_uuid, self.command_uuid
        )
    }
}

/// Exercise tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExerciseConfig {
    /// Pitch below which a manual rep enters flexion
    pub flex_threshold_deg: f64,
    /// Pitch above which a flexed wrist counts as back at neutral
    pub neutral_threshold_deg: f64,
    /// Delay between automation steps
    pub automation_delay_ms: u64,
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        let thresholds = RepThresholds::default();
        Self {
            flex_threshold_deg: thresholds.flex_deg,
            neutral_threshold_deg: thresholds.neutral_deg,
            automation_delay_ms: 2000,
        }
    }
}

impl ExerciseConfig {
    /// Rep detector thresholds
    pub fn thresholds(&self) -> RepThresholds {
        RepThresholds {
            flex_deg: self.flex_threshold_deg,
            neutral_deg: self.neutral_threshold_deg,
        }
    }

    /// Automation step delay as a [`Duration`]
    pub fn automation_delay(&self) -> Duration {
        Duration::from_millis(self.automation_delay_ms)
    }
}

/// Session record settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Patient the records are filed under
    pub patient_id: String,
    /// Directory for JSON-lines records (app data directory if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions_dir: Option<PathBuf>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            patient_id: "local-patient".to_string(),
            sessions_dir: None,
        }
    }
}

/// Simulated device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Telemetry notifications per second
    pub sample_rate_hz: u32,
    /// Delay before the link comes up
    pub connect_latency_ms: u64,
    /// Fail every connection attempt
    pub fail_connect: bool,
    /// Strap-on pitch offset of the sensor
    pub mounting_pitch_deg: f64,
    /// Strap-on yaw offset of the sensor
    pub mounting_yaw_deg: f64,
    /// Peak uniform jitter added to both angles
    pub noise_deg: f64,
    /// Generated wrist motion
    pub pattern: MotionPattern,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 50,
            connect_latency_ms: 300,
            fail_connect: false,
            mounting_pitch_deg: 12.0,
            mounting_yaw_deg: -6.0,
            noise_deg: 0.3,
            pattern: MotionPattern::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exercise_defaults() {
        let config = ExerciseConfig::default();
        assert_eq!(config.flex_threshold_deg, -30.0);
        assert_eq!(config.neutral_threshold_deg, -10.0);
        assert_eq!(config.automation_delay(), Duration::from_millis(2000));
        assert_eq!(config.thresholds(), RepThresholds::default());
    }

    #[test]
    fn test_device_defaults() {
        let config = DeviceConfig::default();
        assert_eq!(config.name, "FlexoGear");
        assert_eq!(config.service_uuid, "4fafc201-1fb5-459e-8fcc-c5c9c331914b");
        assert!(config.telemetry_uuid.ends_with("26a8"));
        assert!(config.command_uuid.ends_with("26a9"));
    }

    #[test]
    fn test_link_summary_names_gatt_identifiers() {
        let config: DeviceConfig = toml::from_str(
            r#"
            name = "FlexoGear-2"
            command_uuid = "0000ffe1-0000-1000-8000-00805f9b34fb"
            "#,
        )
        .unwrap();

        let summary = config.link_summary();
        assert!(summary.starts_with("'FlexoGear-2'"));
        assert!(summary.contains("service 4fafc201-1fb5-459e-8fcc-c5c9c331914b"));
        assert!(summary.contains(&format!("telemetry {}", TELEMETRY_CHARACTERISTIC_UUID)));
        assert!(summary.ends_with("command 0000ffe1-0000-1000-8000-00805f9b34fb)"));
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: ExerciseConfig = serde_json::from_str(r#"{"automation_delay_ms": 500}"#).unwrap();
        assert_eq!(config.automation_delay_ms, 500);
        assert_eq!(config.flex_threshold_deg, -30.0);
    }
}
