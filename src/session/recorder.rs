//! Session recorder for range-of-motion and the final record
//!
//! The recorder is also the finalize latch: only the first finalize after a
//! start can produce a record, so racing stop paths (auto-complete, stop
//! button, emergency, disconnect) collapse to a single write. A record the
//! store rejected is kept as unsaved until [`SessionRecorder::retry_unsaved`]
//! succeeds or the next session starts.

use crate::exercise::DriveMode;
use crate::types::LiveAngles;

use super::store::SessionStore;
use super::types::{FinalizeOutcome, RangeOfMotion, RecorderState, SessionRecord, StopReason};

/// Session recorder for a single patient
#[derive(Debug)]
pub struct SessionRecorder {
    /// Current recording state
    state: RecorderState,
    /// Patient the records belong to
    patient_id: String,
    /// Exercise of the running session
    exercise_name: String,
    /// Drive mode of the running session
    mode: DriveMode,
    /// Extrema of the running session
    range: RangeOfMotion,
    /// Record the store rejected
    unsaved: Option<SessionRecord>,
}

impl SessionRecorder {
    /// Create a recorder writing records for `patient_id`
    pub fn new(patient_id: impl Into<String>) -> Self {
        Self {
            state: RecorderState::Idle,
            patient_id: patient_id.into(),
            exercise_name: String::new(),
            mode: DriveMode::Manual,
            range: RangeOfMotion::default(),
            unsaved: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Check if recording
    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    /// Patient the records belong to
    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    /// Extrema collected so far
    pub fn range(&self) -> &RangeOfMotion {
        &self.range
    }

    /// Record held after a failed write
    pub fn unsaved(&self) -> Option<&SessionRecord> {
        self.unsaved.as_ref()
    }

    /// Start a new recording
    pub fn start_recording(&mut self, exercise_name: impl Into<String>, mode: DriveMode) {
        if let Some(dropped) = self.unsaved.take() {
            tracing::warn!(
                "Discarding unsaved session '{}' ({} reps)",
                dropped.exercise_name,
                dropped.reps
            );
        }
        self.exercise_name = exercise_name.into();
        self.mode = mode;
        self.range.reset();
        self.state = RecorderState::Recording;
    }

    /// Fold a calibrated reading into the extrema
    pub fn record_angles(&mut self, angles: &LiveAngles) {
        if self.is_recording() {
            self.range.update(angles);
        }
    }

    /// Close the running session
    ///
    /// `completed` is the number of reps (manual) or cycles (automated)
    /// finished as of the stop. A record is written when it is non-zero;
    /// emergency stops are written with `wasEmergencyStop` set.
    pub fn finalize(
        &mut self,
        reason: StopReason,
        completed: u32,
        store: &mut dyn SessionStore,
    ) -> FinalizeOutcome {
        if !self.is_recording() {
            return FinalizeOutcome::AlreadyFinalized;
        }
        self.state = RecorderState::Finalized;

        let outcome = if completed == 0 {
            tracing::info!("Session ended ({}) with no completed reps, not saved", reason);
            FinalizeOutcome::Skipped
        } else {
            let record = SessionRecord::new(
                self.exercise_name.clone(),
                completed,
                &self.range,
                self.mode == DriveMode::Automated,
                reason,
            );
            match store.append(&self.patient_id, &record) {
                Ok(()) => FinalizeOutcome::Persisted(record),
                Err(e) => {
                    tracing::warn!("Failed to save session '{}': {}", record.exercise_name, e);
                    self.unsaved = Some(record.clone());
                    FinalizeOutcome::PersistFailed {
                        record,
                        error: e.to_string(),
                    }
                }
            }
        };

        self.range.reset();
        outcome
    }

    /// Try writing the unsaved record again
    ///
    /// Returns the record once it is stored, `None` if nothing was pending.
    pub fn retry_unsaved(
        &mut self,
        store: &mut dyn SessionStore,
    ) -> crate::error::Result<Option<SessionRecord>> {
        let Some(record) = self.unsaved.take() else {
            return Ok(None);
        };
        match store.append(&self.patient_id, &record) {
            Ok(()) => Ok(Some(record)),
            Err(e) => {
                self.unsaved = Some(record);
                Err(e)
            }
        }
    }
}
