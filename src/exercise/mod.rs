//! Exercise state machine
//!
//! A session runs in exactly one of two drive modes, chosen from the
//! prescription when it starts:
//!
//! - **Manual** ([`manual`]): reps are detected from the live pitch signal
//!   with a two-state edge detector (`start` → `flexed` → `start`).
//! - **Automated** ([`automation`]): a timer walks the prescription's
//!   automation sequence, commanding one motor position per tick.
//!
//! Both modes share [`ExerciseProgress`], which is reset on every start and
//! flushed into a session record when the session ends.

pub mod automation;
pub mod manual;
pub mod prescription;

pub use automation::TickOutcome;
pub use manual::{ManualOutcome, RepThresholds};
pub use prescription::Prescription;

use serde::{Deserialize, Serialize};

/// Instruction shown when a manual prescription has no instruction lines
pub const DEFAULT_INSTRUCTION: &str = "Exercise";

/// How a session is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveMode {
    /// Reps detected from live angles
    Manual,
    /// Motor positions driven from the automation sequence
    Automated,
}

impl std::fmt::Display for DriveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriveMode::Manual => write!(f, "Manual"),
            DriveMode::Automated => write!(f, "Automated"),
        }
    }
}

/// Manual-mode rep detector phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepPhase {
    /// Waiting for the wrist to flex past the flex threshold
    #[default]
    Start,
    /// Flexed; waiting for the return to neutral
    Flexed,
}

/// Counters of the running exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProgress {
    /// Reps completed in the current set (manual)
    pub reps_in_set: u32,
    /// 1-based set counter; one past the target once complete
    pub current_set: u32,
    /// Cursor into the instruction script (manual)
    pub step_index: usize,
    /// Rep detector phase (manual)
    pub rep_phase: RepPhase,
    /// Cursor into the automation sequence (automated)
    pub automation_step: usize,
    /// Full passes through the automation sequence (automated)
    pub completed_cycles: u32,
    /// Progress in percent, 0-100
    pub progress_pct: f64,
}

impl Default for ExerciseProgress {
    fn default() -> Self {
        Self {
            reps_in_set: 0,
            current_set: 1,
            step_index: 0,
            rep_phase: RepPhase::Start,
            automation_step: 0,
            completed_cycles: 0,
            progress_pct: 0.0,
        }
    }
}

impl ExerciseProgress {
    /// Fresh progress for a new session
    pub fn new() -> Self {
        Self::default()
    }

    /// Return every counter to its initial value
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Completed work as of now: reps in manual mode, cycles in automated mode
    pub fn completed(&self, mode: DriveMode, prescription: &Prescription) -> u32 {
        match mode {
            DriveMode::Manual => manual::completed_reps(self, prescription),
            DriveMode::Automated => self.completed_cycles,
        }
    }
}

/// `100 * done / target`, capped at 100 and 0 for an empty target
pub(crate) fn percent(done: u32, target: u32) -> f64 {
    if target == 0 {
        return 0.0;
    }
    (100.0 * done as f64 / target as f64).min(100.0)
}
