//! Session data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::LiveAngles;

/// State of the session recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    /// No session has been recorded yet
    #[default]
    Idle,
    /// A session is running and collecting extrema
    Recording,
    /// The last session has been finalized
    Finalized,
}

impl RecorderState {
    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        matches!(self, RecorderState::Recording)
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Stopped by the user, by a disconnect or by an automation fault
    ManualStop,
    /// All target reps or cycles were completed
    AutoCompleted,
    /// The emergency stop was pressed
    EmergencyStop,
}

impl StopReason {
    /// Status text shown once the session ends
    pub fn message(&self) -> &'static str {
        match self {
            StopReason::ManualStop => "Session Stopped.",
            StopReason::AutoCompleted => "Session Complete!",
            StopReason::EmergencyStop => "EMERGENCY STOP. Motors relaxed.",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::ManualStop => write!(f, "manual stop"),
            StopReason::AutoCompleted => write!(f, "auto-completed"),
            StopReason::EmergencyStop => write!(f, "emergency stop"),
        }
    }
}

/// Running range-of-motion extrema in degrees, seeded at 0
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeOfMotion {
    /// Deepest flexion (most negative pitch)
    pub max_flex: f64,
    /// Largest extension (most positive pitch)
    pub max_ext: f64,
    /// Largest radial deviation (most negative yaw)
    pub max_rad: f64,
    /// Largest ulnar deviation (most positive yaw)
    pub max_uln: f64,
}

impl RangeOfMotion {
    /// Fold one reading into the extrema
    pub fn update(&mut self, angles: &LiveAngles) {
        self.max_flex = self.max_flex.min(angles.pitch);
        self.max_ext = self.max_ext.max(angles.pitch);
        self.max_rad = self.max_rad.min(angles.yaw);
        self.max_uln = self.max_uln.max(angles.yaw);
    }

    /// Reset to the zero seed
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Summary written once per finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Name of the prescribed exercise
    pub exercise_name: String,
    /// Completed reps (manual) or cycles (automated)
    pub reps: u32,
    /// Deepest flexion in whole degrees
    pub max_flex: i32,
    /// Largest extension in whole degrees
    pub max_ext: i32,
    /// Largest radial deviation in whole degrees
    pub max_rad: i32,
    /// Largest ulnar deviation in whole degrees
    pub max_uln: i32,
    /// When the session ended
    pub timestamp: DateTime<Utc>,
    /// Whether the automation sequence drove the session
    pub was_automated: bool,
    /// Whether the session ended with an emergency stop
    pub was_emergency_stop: bool,
}

impl SessionRecord {
    /// Build a record from the session's final state
    pub fn new(
        exercise_name: impl Into<String>,
        reps: u32,
        range: &RangeOfMotion,
        was_automated: bool,
        reason: StopReason,
    ) -> Self {
        Self {
            exercise_name: exercise_name.into(),
            reps,
            max_flex: round_degrees(range.max_flex),
            max_ext: round_degrees(range.max_ext),
            max_rad: round_degrees(range.max_rad),
            max_uln: round_degrees(range.max_uln),
            timestamp: Utc::now(),
            was_automated,
            was_emergency_stop: reason == StopReason::EmergencyStop,
        }
    }
}

fn round_degrees(value: f64) -> i32 {
    value.round() as i32
}

/// Result of finalizing a session
#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    /// The record was written to the store
    Persisted(SessionRecord),
    /// Nothing was completed, so nothing was written
    Skipped,
    /// No session was recording; the call was a no-op
    AlreadyFinalized,
    /// The store rejected the record; it is held for a retry
    PersistFailed {
        record: SessionRecord,
        error: String,
    },
}

impl FinalizeOutcome {
    /// Whether this call wrote a record
    pub fn is_persisted(&self) -> bool {
        matches!(self, FinalizeOutcome::Persisted(_))
    }
}
