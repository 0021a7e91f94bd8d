//! Automated (motor-driven) sequences
//!
//! Every timer tick commands the position under the cursor and advances it.
//! Wrapping past the last key completes one cycle; the session completes
//! after `target_sets` cycles.

use crate::device::{MotorCommand, PositionTable};
use crate::error::{FlexoError, Result};

use super::{percent, ExerciseProgress, Prescription};

/// Result of one automation tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Moved to `key`; the sequence continues
    Moved { key: String, command: MotorCommand },
    /// Moved to `key`, finishing a cycle; `next_repetition` begins after the delay
    CycleCompleted {
        key: String,
        command: MotorCommand,
        next_repetition: u32,
    },
    /// Moved to `key`, finishing the final cycle
    SessionCompleted { key: String, command: MotorCommand },
}

impl TickOutcome {
    /// Position key commanded by this tick
    pub fn key(&self) -> &str {
        match self {
            TickOutcome::Moved { key, .. }
            | TickOutcome::CycleCompleted { key, .. }
            | TickOutcome::SessionCompleted { key, .. } => key,
        }
    }

    /// Motor command to send for this tick
    pub fn command(&self) -> &MotorCommand {
        match self {
            TickOutcome::Moved { command, .. }
            | TickOutcome::CycleCompleted { command, .. }
            | TickOutcome::SessionCompleted { command, .. } => command,
        }
    }
}

/// Cue shown while a position is being commanded
pub fn moving_cue(key: &str) -> String {
    format!("Moving to: {}", key)
}

/// Cue shown between cycles
pub fn rest_cue(next_repetition: u32) -> String {
    format!("Rest. Get Ready for Repetition {}", next_repetition)
}

/// Automated progress in percent of `target_sets` cycles
pub fn progress_pct(progress: &ExerciseProgress, prescription: &Prescription) -> f64 {
    percent(progress.completed_cycles, prescription.target_sets)
}

/// Run one tick of the automation sequence
///
/// An unknown position key is returned as [`FlexoError::UnknownPosition`]
/// with the progress left untouched.
pub fn tick(
    progress: &mut ExerciseProgress,
    prescription: &Prescription,
    positions: &PositionTable,
) -> Result<TickOutcome> {
    let sequence = &prescription.automation_sequence;
    let key = sequence
        .get(progress.automation_step)
        .ok_or_else(|| FlexoError::InvalidPrescription("automation sequence is empty".to_string()))?;
    let command = positions
        .get(key)
        .cloned()
        .ok_or_else(|| FlexoError::UnknownPosition(key.clone()))?;
    let key = key.clone();

    progress.automation_step += 1;
    if progress.automation_step < sequence.len() {
        return Ok(TickOutcome::Moved { key, command });
    }

    progress.automation_step = 0;
    progress.completed_cycles += 1;
    progress.current_set += 1;
    progress.progress_pct = progress_pct(progress, prescription);

    if progress.current_set > prescription.target_sets {
        Ok(TickOutcome::SessionCompleted { key, command })
    } else {
        Ok(TickOutcome::CycleCompleted {
            key,
            command,
            next_repetition: progress.current_set,
        })
    }
}
