//! Core data types shared across the session core
//!
//! This module contains the small value types that flow between the
//! orientation pipeline, the exercise state machine, and the UI-facing
//! snapshots:
//!
//! - [`ConnectionStatus`] - Device link state
//! - [`LiveAngles`] - Calibrated wrist angles derived from each sample
//! - [`TelemetryStats`] - Counters for accepted and dropped notifications

use serde::{Deserialize, Serialize};

/// Connection status of the wrist device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Not connected to any device
    #[default]
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Connected and streaming
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connecting => write!(f, "Connecting..."),
            ConnectionStatus::Connected => write!(f, "Connected"),
        }
    }
}

/// Wrist angles in degrees
///
/// `pitch` is flexion (negative) / extension (positive); `yaw` is
/// radial / ulnar deviation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LiveAngles {
    /// Flexion/extension in degrees
    pub pitch: f64,
    /// Radial/ulnar deviation in degrees
    pub yaw: f64,
}

impl LiveAngles {
    /// Create a new angle pair
    pub fn new(pitch: f64, yaw: f64) -> Self {
        Self { pitch, yaw }
    }

    /// Flexion/extension mapped onto a 0-100% gauge spanning ±90°
    pub fn pitch_gauge_pct(&self) -> f64 {
        gauge_pct(self.pitch)
    }

    /// Radial/ulnar deviation mapped onto a 0-100% gauge spanning ±90°
    pub fn yaw_gauge_pct(&self) -> f64 {
        gauge_pct(self.yaw)
    }
}

fn gauge_pct(angle: f64) -> f64 {
    ((angle + 90.0) / 180.0 * 100.0).clamp(0.0, 100.0)
}

/// Counters for the telemetry feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    /// Samples decoded cleanly
    pub accepted: u64,
    /// Decoded samples superseded by a later one in the same burst
    pub coalesced: u64,
    /// Payloads discarded as malformed
    pub malformed: u64,
    /// Samples ignored because no link was connected
    pub ignored: u64,
}

impl TelemetryStats {
    /// Percentage of payloads that decoded cleanly
    pub fn acceptance_rate(&self) -> f64 {
        let total = self.accepted + self.malformed;
        if total == 0 {
            100.0
        } else {
            (self.accepted as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_percentages() {
        let angles = LiveAngles::new(0.0, -45.0);
        assert_eq!(angles.pitch_gauge_pct(), 50.0);
        assert_eq!(angles.yaw_gauge_pct(), 25.0);

        let extreme = LiveAngles::new(-120.0, 170.0);
        assert_eq!(extreme.pitch_gauge_pct(), 0.0);
        assert_eq!(extreme.yaw_gauge_pct(), 100.0);
    }

    #[test]
    fn test_connection_status_display() {
        assert_eq!(ConnectionStatus::Connecting.to_string(), "Connecting...");
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_acceptance_rate() {
        let mut stats = TelemetryStats::default();
        assert_eq!(stats.acceptance_rate(), 100.0);
        stats.accepted = 3;
        stats.malformed = 1;
        assert_eq!(stats.acceptance_rate(), 75.0);
    }
}
