//! Session controller: the single owner of all mutable session state
//!
//! The controller is a reducer. Every input (telemetry, timer ticks, user
//! actions, device link events) is one method call that runs to completion
//! before the next one starts, so no two inputs ever interleave. It never
//! blocks: motor commands are fire-and-forget and the store is only touched
//! on finalize.
//!
//! Two counters keep late inputs from acting on state they no longer
//! belong to:
//!
//! - the **connection attempt** tags every device event; events from an
//!   earlier attempt are ignored
//! - the **session generation** tags the one pending automation tick; any
//!   start, stop or reset bumps it, so a tick scheduled for an earlier
//!   session is ignored

use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::device::{decode_sample, CommandChannel, CommandSink, CommandStats, MotorCommand, PositionTable};
use crate::error::{FlexoError, Result};
use crate::exercise::{
    automation, manual, DriveMode, ExerciseProgress, ManualOutcome, Prescription, RepThresholds,
    TickOutcome, DEFAULT_INSTRUCTION,
};
use crate::orientation::{Calibration, Orientation, QuaternionExt};
use crate::session::{
    FinalizeOutcome, RangeOfMotion, SessionRecord, SessionRecorder, SessionStore, StopReason,
};
use crate::types::{ConnectionStatus, LiveAngles, TelemetryStats};

use super::SessionUpdate;

/// Prompt shown once the link is up
pub const CALIBRATE_PROMPT: &str = "Hold hand straight & Press Calibrate";

/// Prompt shown after a calibration outside a session
pub const CALIBRATED_PROMPT: &str = "Calibrated. Select an exercise.";

/// Key accepted by [`SessionController::send_position`] for the RELAX posture
pub const RELAX: &str = "RELAX";

/// The single outstanding automation tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTick {
    /// Session generation the tick was scheduled for
    pub generation: u64,
    /// When the tick is due
    pub due: Instant,
}

/// Session-level state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Not ready to start: uncalibrated or no prescription
    Idle,
    /// Calibrated with a prescription selected
    Armed,
    /// A session is running
    Active(DriveMode),
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "Idle"),
            SessionPhase::Armed => write!(f, "Armed"),
            SessionPhase::Active(mode) => write!(f, "Active ({})", mode),
        }
    }
}

/// Read-only view of the session for the UI
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    pub phase: SessionPhase,
    pub calibrated: bool,
    pub angles: LiveAngles,
    pub progress: ExerciseProgress,
    pub range: RangeOfMotion,
    pub instruction: String,
    pub exercise_name: Option<String>,
    pub last_stop: Option<StopReason>,
    pub telemetry: TelemetryStats,
    pub commands: CommandStats,
    pub has_unsaved: bool,
}

/// The session context
pub struct SessionController {
    thresholds: RepThresholds,
    automation_delay: Duration,
    positions: PositionTable,

    status: ConnectionStatus,
    attempt: u64,
    commands: CommandChannel,

    calibration: Calibration,
    raw_sample: Option<Orientation>,
    angles: LiveAngles,
    telemetry: TelemetryStats,

    prescription: Option<Prescription>,
    active: Option<DriveMode>,
    progress: ExerciseProgress,
    instruction: String,
    last_stop: Option<StopReason>,

    recorder: SessionRecorder,
    store: Box<dyn SessionStore>,

    generation: u64,
    pending_tick: Option<PendingTick>,

    outbox: Vec<SessionUpdate>,
}

impl SessionController {
    /// Create a controller writing finished sessions to `store`
    pub fn new(config: &AppConfig, store: Box<dyn SessionStore>) -> Self {
        Self {
            thresholds: config.exercise.thresholds(),
            automation_delay: config.exercise.automation_delay(),
            positions: config.motors.clone(),
            status: ConnectionStatus::Disconnected,
            attempt: 0,
            commands: CommandChannel::new(),
            calibration: Calibration::new(),
            raw_sample: None,
            angles: LiveAngles::default(),
            telemetry: TelemetryStats::default(),
            prescription: None,
            active: None,
            progress: ExerciseProgress::new(),
            instruction: DEFAULT_INSTRUCTION.to_string(),
            last_stop: None,
            recorder: SessionRecorder::new(config.recorder.patient_id.clone()),
            store,
            generation: 0,
            pending_tick: None,
            outbox: Vec::new(),
        }
    }

    // ==================== Connection ====================

    /// Start a connection attempt, returning its id
    pub fn begin_connect(&mut self) -> Result<u64> {
        match self.status {
            ConnectionStatus::Disconnected => {}
            ConnectionStatus::Connecting => {
                return Err(FlexoError::AlreadyConnected("connecting".to_string()))
            }
            ConnectionStatus::Connected => {
                return Err(FlexoError::AlreadyConnected("connected".to_string()))
            }
        }

        self.attempt += 1;
        self.status = ConnectionStatus::Connecting;
        tracing::info!("Connecting to device (attempt {})", self.attempt);
        Ok(self.attempt)
    }

    /// The link of `attempt` is up
    ///
    /// Returns false (dropping `sink`) if the attempt is stale.
    pub fn on_connected(&mut self, attempt: u64, sink: Box<dyn CommandSink>) -> bool {
        if attempt != self.attempt || self.status != ConnectionStatus::Connecting {
            tracing::debug!(
                "Ignoring connection of stale attempt {} (current {})",
                attempt,
                self.attempt
            );
            return false;
        }

        self.commands.attach(sink);
        self.status = ConnectionStatus::Connected;
        self.calibration.clear();
        self.raw_sample = None;
        self.instruction = CALIBRATE_PROMPT.to_string();
        tracing::info!("Device connected (attempt {})", attempt);
        true
    }

    /// The connection attempt failed
    pub fn on_connect_failed(&mut self, attempt: u64, reason: &str) -> bool {
        if attempt != self.attempt || self.status != ConnectionStatus::Connecting {
            tracing::debug!("Ignoring failure of stale attempt {}", attempt);
            return false;
        }

        self.status = ConnectionStatus::Disconnected;
        tracing::warn!("Connection attempt {} failed: {}", attempt, reason);
        self.outbox
            .push(SessionUpdate::Error(format!("Connection failed: {}", reason)));
        true
    }

    /// The device dropped the link
    pub fn on_link_lost(&mut self, attempt: u64) -> bool {
        if attempt != self.attempt || self.status == ConnectionStatus::Disconnected {
            tracing::debug!("Ignoring link loss of stale attempt {}", attempt);
            return false;
        }

        tracing::warn!("Device link lost (attempt {})", attempt);
        self.hard_reset();
        self.outbox
            .push(SessionUpdate::Error("Device disconnected.".to_string()));
        true
    }

    /// User disconnect: relax the motors while the link exists, then reset
    pub fn disconnect(&mut self) {
        if self.status == ConnectionStatus::Disconnected {
            return;
        }
        if !self.recorder.is_recording() {
            self.send_relax();
        }
        tracing::info!("Disconnecting");
        self.hard_reset();
    }

    /// Collapse to `Idle` from any state
    ///
    /// A running session is finalized as a manual stop first. Calibration,
    /// the command endpoint and any pending tick are cleared, and both the
    /// session generation and the connection attempt are bumped so nothing
    /// in flight can act on the new state. The selected prescription is
    /// kept.
    pub fn hard_reset(&mut self) {
        let finalized = self.recorder.is_recording();
        if finalized {
            self.finalize(StopReason::ManualStop);
        }

        self.commands.detach();
        self.status = ConnectionStatus::Disconnected;
        self.attempt += 1;
        self.calibration.clear();
        self.raw_sample = None;
        self.angles = LiveAngles::default();
        self.active = None;
        self.progress.reset();
        self.generation += 1;
        self.pending_tick = None;
        if !finalized {
            self.instruction = DEFAULT_INSTRUCTION.to_string();
        }
    }

    /// Reset if a command write found the endpoint closed
    ///
    /// Returns true if the session was reset; the caller should then tear
    /// down the device link.
    pub fn check_command_link(&mut self) -> bool {
        if !self.commands.take_link_lost() || self.status != ConnectionStatus::Connected {
            return false;
        }

        tracing::warn!("Command endpoint closed, resetting session");
        self.hard_reset();
        self.outbox
            .push(SessionUpdate::Error("Device connection lost.".to_string()));
        true
    }

    // ==================== Telemetry ====================

    /// Ingest one telemetry payload
    ///
    /// Returns whether a sample was applied.
    pub fn ingest(&mut self, payload: &[u8]) -> bool {
        self.ingest_burst(std::iter::once(payload))
    }

    /// Ingest a burst of queued payloads, applying only the latest good one
    pub fn ingest_burst<'a, I>(&mut self, payloads: I) -> bool
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut latest = None;
        for payload in payloads {
            if self.status != ConnectionStatus::Connected {
                self.telemetry.ignored += 1;
                continue;
            }
            match decode_sample(payload) {
                Some(sample) => {
                    self.telemetry.accepted += 1;
                    if latest.replace(sample).is_some() {
                        self.telemetry.coalesced += 1;
                    }
                }
                None => {
                    self.telemetry.malformed += 1;
                    tracing::trace!("Dropped malformed telemetry ({} bytes)", payload.len());
                }
            }
        }

        match latest {
            Some(sample) => {
                self.apply_sample(sample);
                true
            }
            None => false,
        }
    }

    /// Store `sample` as the latest raw reading and drive the session from it
    pub fn apply_sample(&mut self, sample: Orientation) {
        self.raw_sample = Some(sample);
        self.angles = self.calibration.apply(&sample).to_wrist_angles();

        let Some(mode) = self.active else {
            return;
        };
        if self.calibration.is_calibrated() {
            self.recorder.record_angles(&self.angles);
        }
        if mode == DriveMode::Manual {
            self.step_manual();
        }
    }

    fn step_manual(&mut self) {
        let Some(prescription) = self.prescription.as_ref() else {
            return;
        };

        let outcome = manual::step(
            &mut self.progress,
            prescription,
            self.angles.pitch,
            &self.thresholds,
        );
        self.instruction = manual::instruction_text(&self.progress, prescription);

        match outcome {
            ManualOutcome::RepCompleted { reps_in_set } => {
                tracing::debug!("Rep {} of set {}", reps_in_set, self.progress.current_set);
            }
            ManualOutcome::SetCompleted { next_set } => {
                tracing::info!("Set complete, starting set {}", next_set);
                self.instruction = manual::rest_cue(next_set);
            }
            ManualOutcome::SessionCompleted => {
                self.finalize(StopReason::AutoCompleted);
            }
            ManualOutcome::Flexed | ManualOutcome::Unchanged => {}
        }
    }

    // ==================== User actions ====================

    /// Capture the latest raw sample as the calibration reference
    pub fn calibrate(&mut self) -> Result<()> {
        if self.status != ConnectionStatus::Connected {
            return Err(FlexoError::NotConnected);
        }
        let sample = self.raw_sample.ok_or(FlexoError::NoSample)?;

        self.calibration.capture(sample);
        self.angles = self.calibration.apply(&sample).to_wrist_angles();
        if self.active.is_none() {
            self.instruction = CALIBRATED_PROMPT.to_string();
        }
        tracing::info!("Calibrated");
        Ok(())
    }

    /// Choose the prescription for the next session
    pub fn select_prescription(&mut self, prescription: Prescription) -> Result<()> {
        if self.active.is_some() {
            return Err(FlexoError::SessionActive);
        }

        tracing::info!(
            "Selected '{}' ({})",
            prescription.exercise_name,
            prescription.drive_mode()
        );
        self.instruction = match prescription.drive_mode() {
            DriveMode::Manual => manual::instruction_text(&ExerciseProgress::new(), &prescription),
            DriveMode::Automated => format!("Ready: {}", prescription.exercise_name),
        };
        self.prescription = Some(prescription);
        Ok(())
    }

    /// Start a session with the selected prescription
    pub fn start_session(&mut self) -> Result<DriveMode> {
        if self.active.is_some() {
            return Err(FlexoError::SessionActive);
        }
        let prescription = self
            .prescription
            .as_ref()
            .ok_or(FlexoError::NoPrescription)?;
        if !self.calibration.is_calibrated() {
            return Err(FlexoError::NotCalibrated);
        }

        let mode = prescription.drive_mode();
        let exercise_name = prescription.exercise_name.clone();
        self.progress.reset();
        self.instruction = match mode {
            DriveMode::Manual => manual::instruction_text(&self.progress, prescription),
            DriveMode::Automated => format!("Starting {}", exercise_name),
        };

        self.generation += 1;
        self.pending_tick = None;
        self.active = Some(mode);
        self.last_stop = None;
        self.recorder.start_recording(exercise_name.clone(), mode);

        if mode == DriveMode::Automated {
            self.schedule_tick(Duration::ZERO);
        }
        tracing::info!("Session started: '{}' ({})", exercise_name, mode);
        Ok(mode)
    }

    /// Stop the running session as a manual stop
    pub fn stop_session(&mut self) -> FinalizeOutcome {
        self.finalize(StopReason::ManualStop)
    }

    /// Stop everything and relax the motors, session or not
    pub fn emergency_stop(&mut self) -> FinalizeOutcome {
        tracing::warn!("Emergency stop");
        let outcome = self.finalize(StopReason::EmergencyStop);
        if outcome == FinalizeOutcome::AlreadyFinalized {
            self.send_relax();
        }
        self.instruction = StopReason::EmergencyStop.message().to_string();
        outcome
    }

    /// Command a named motor position (or `RELAX`)
    pub fn send_position(&mut self, key: &str) -> Result<()> {
        if self.active == Some(DriveMode::Automated) {
            return Err(FlexoError::SessionActive);
        }

        let command = if key.eq_ignore_ascii_case(RELAX) {
            self.positions.relax()
        } else {
            self.positions
                .get(key)
                .ok_or_else(|| FlexoError::UnknownPosition(key.to_string()))?
        };
        self.commands.send(command);
        Ok(())
    }

    /// Command raw actuator angles, each 0-180
    pub fn send_angles(&mut self, a1: &str, a2: &str, a3: &str) -> Result<()> {
        if self.active == Some(DriveMode::Automated) {
            return Err(FlexoError::SessionActive);
        }

        for angle in [a1, a2, a3] {
            match angle.trim().parse::<u16>() {
                Ok(value) if value <= 180 => {}
                _ => return Err(FlexoError::Device(format!("Invalid motor angle: {}", angle))),
            }
        }
        self.commands
            .send(&MotorCommand::new(a1.trim(), a2.trim(), a3.trim()));
        Ok(())
    }

    /// Write the record a failed finalize left behind
    pub fn retry_persist(&mut self) -> Result<Option<SessionRecord>> {
        let saved = self.recorder.retry_unsaved(self.store.as_mut())?;
        if let Some(record) = &saved {
            tracing::info!("Saved pending session '{}'", record.exercise_name);
            self.outbox.push(SessionUpdate::Saved(record.clone()));
        }
        Ok(saved)
    }

    /// Queue `err` for the UI as a rejection or an error
    pub fn report(&mut self, err: &FlexoError) {
        if err.is_precondition() {
            tracing::debug!("Rejected: {}", err);
            self.outbox.push(SessionUpdate::Rejected(err.to_string()));
        } else {
            tracing::error!("{}", err);
            self.outbox.push(SessionUpdate::Error(err.to_string()));
        }
    }

    // ==================== Automation ====================

    fn schedule_tick(&mut self, delay: Duration) {
        // Replaces any previous tick
        self.pending_tick = Some(PendingTick {
            generation: self.generation,
            due: Instant::now() + delay,
        });
    }

    /// Run the pending automation tick of `generation`
    ///
    /// Returns false for a stale or unexpected tick.
    pub fn on_timer(&mut self, generation: u64) -> bool {
        match self.pending_tick {
            Some(tick) if tick.generation == generation && generation == self.generation => {}
            _ => {
                tracing::trace!("Ignoring stale timer tick (generation {})", generation);
                return false;
            }
        }
        self.pending_tick = None;

        if self.active != Some(DriveMode::Automated) {
            return false;
        }
        let Some(prescription) = self.prescription.as_ref() else {
            return false;
        };

        match automation::tick(&mut self.progress, prescription, &self.positions) {
            Err(e) => {
                tracing::error!("Automation aborted: {}", e);
                self.outbox.push(SessionUpdate::Error(e.to_string()));
                self.finalize(StopReason::ManualStop);
            }
            Ok(outcome) => {
                self.commands.send(outcome.command());
                self.instruction = automation::moving_cue(outcome.key());
                match outcome {
                    TickOutcome::Moved { .. } => self.schedule_tick(self.automation_delay),
                    TickOutcome::CycleCompleted {
                        next_repetition, ..
                    } => {
                        self.instruction = automation::rest_cue(next_repetition);
                        self.schedule_tick(self.automation_delay);
                    }
                    TickOutcome::SessionCompleted { .. } => {
                        self.finalize(StopReason::AutoCompleted);
                    }
                }
            }
        }
        true
    }

    // ==================== Finalize ====================

    /// End the running session
    ///
    /// The first call after a start deactivates the session, cancels the
    /// pending tick, relaxes the motors and writes the record; every later
    /// call returns [`FinalizeOutcome::AlreadyFinalized`] and changes nothing.
    pub fn finalize(&mut self, reason: StopReason) -> FinalizeOutcome {
        if !self.recorder.is_recording() {
            return FinalizeOutcome::AlreadyFinalized;
        }

        let completed = match (self.active, self.prescription.as_ref()) {
            (Some(mode), Some(prescription)) => self.progress.completed(mode, prescription),
            _ => 0,
        };

        self.active = None;
        self.generation += 1;
        self.pending_tick = None;
        self.send_relax();

        let outcome = self
            .recorder
            .finalize(reason, completed, self.store.as_mut());
        self.progress.reset();
        self.instruction = reason.message().to_string();
        self.last_stop = Some(reason);
        tracing::info!("Session finished: {} ({} completed)", reason, completed);

        self.outbox.push(SessionUpdate::Finalized {
            reason,
            outcome: outcome.clone(),
        });
        outcome
    }

    fn send_relax(&mut self) {
        self.commands.send(self.positions.relax());
    }

    // ==================== Accessors ====================

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending_tick(&self) -> Option<PendingTick> {
        self.pending_tick
    }

    /// When the worker must wake up for the pending tick
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_tick.map(|tick| tick.due)
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_calibrated()
    }

    pub fn angles(&self) -> LiveAngles {
        self.angles
    }

    pub fn progress(&self) -> &ExerciseProgress {
        &self.progress
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn prescription(&self) -> Option<&Prescription> {
        self.prescription.as_ref()
    }

    pub fn active_mode(&self) -> Option<DriveMode> {
        self.active
    }

    pub fn telemetry(&self) -> TelemetryStats {
        self.telemetry
    }

    pub fn command_stats(&self) -> CommandStats {
        self.commands.stats()
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    /// Current session-level state
    pub fn phase(&self) -> SessionPhase {
        match self.active {
            Some(mode) => SessionPhase::Active(mode),
            None if self.calibration.is_calibrated() && self.prescription.is_some() => {
                SessionPhase::Armed
            }
            None => SessionPhase::Idle,
        }
    }

    /// Snapshot for the UI
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            phase: self.phase(),
            calibrated: self.calibration.is_calibrated(),
            angles: self.angles,
            progress: self.progress.clone(),
            range: *self.recorder.range(),
            instruction: self.instruction.clone(),
            exercise_name: self.prescription.as_ref().map(|p| p.exercise_name.clone()),
            last_stop: self.last_stop,
            telemetry: self.telemetry,
            commands: self.commands.stats(),
            has_unsaved: self.recorder.unsaved().is_some(),
        }
    }

    /// Take the updates queued since the last drain
    pub fn drain_updates(&mut self) -> Vec<SessionUpdate> {
        std::mem::take(&mut self.outbox)
    }
}
