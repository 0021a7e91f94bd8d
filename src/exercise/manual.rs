//! Manual (IMU-driven) rep detection
//!
//! Each live-angle update while a manual session is active runs one
//! [`step`]. A rep is a flex below the flex threshold followed by a return
//! above the neutral threshold; the gap between the two thresholds gives
//! the detector hysteresis against sensor noise.

use serde::{Deserialize, Serialize};

use super::{percent, ExerciseProgress, Prescription, RepPhase, DEFAULT_INSTRUCTION};

/// Pitch thresholds of the rep detector, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepThresholds {
    /// Entering flexion: pitch below this while in `start`
    pub flex_deg: f64,
    /// Back at neutral: pitch above this while `flexed`
    pub neutral_deg: f64,
}

impl Default for RepThresholds {
    fn default() -> Self {
        Self {
            flex_deg: -30.0,
            neutral_deg: -10.0,
        }
    }
}

/// What a manual step changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualOutcome {
    /// No phase transition
    Unchanged,
    /// The wrist crossed into flexion
    Flexed,
    /// A rep completed within the current set
    RepCompleted { reps_in_set: u32 },
    /// The last rep of a set completed; `next_set` begins
    SetCompleted { next_set: u32 },
    /// The last rep of the last set completed
    SessionCompleted,
}

/// Reps completed across all sets
pub fn completed_reps(progress: &ExerciseProgress, prescription: &Prescription) -> u32 {
    progress
        .current_set
        .saturating_sub(1)
        .saturating_mul(prescription.target_reps)
        .saturating_add(progress.reps_in_set)
}

/// Manual progress in percent of `target_reps * target_sets`
pub fn progress_pct(progress: &ExerciseProgress, prescription: &Prescription) -> f64 {
    percent(
        completed_reps(progress, prescription),
        prescription.total_reps(),
    )
}

/// Instruction line for the current script position
pub fn instruction_text(progress: &ExerciseProgress, prescription: &Prescription) -> String {
    let instructions = &prescription.instructions;
    if instructions.is_empty() {
        return DEFAULT_INSTRUCTION.to_string();
    }
    instructions[progress.step_index % instructions.len()].clone()
}

/// Cue shown between sets
pub fn rest_cue(next_set: u32) -> String {
    format!("Rest. Get Ready for Set {}", next_set)
}

/// Advance the rep detector with one pitch reading
pub fn step(
    progress: &mut ExerciseProgress,
    prescription: &Prescription,
    pitch: f64,
    thresholds: &RepThresholds,
) -> ManualOutcome {
    let outcome = match progress.rep_phase {
        RepPhase::Start if pitch < thresholds.flex_deg => {
            progress.rep_phase = RepPhase::Flexed;
            let len = prescription.instructions.len().max(1);
            progress.step_index = (progress.step_index + 1) % len;
            ManualOutcome::Flexed
        }
        RepPhase::Flexed if pitch > thresholds.neutral_deg => {
            progress.rep_phase = RepPhase::Start;
            progress.step_index = 0;
            progress.reps_in_set += 1;

            if progress.reps_in_set >= prescription.target_reps {
                progress.reps_in_set = 0;
                progress.current_set += 1;
                if progress.current_set > prescription.target_sets {
                    ManualOutcome::SessionCompleted
                } else {
                    ManualOutcome::SetCompleted {
                        next_set: progress.current_set,
                    }
                }
            } else {
                ManualOutcome::RepCompleted {
                    reps_in_set: progress.reps_in_set,
                }
            }
        }
        _ => ManualOutcome::Unchanged,
    };

    progress.progress_pct = progress_pct(progress, prescription);
    outcome
}
