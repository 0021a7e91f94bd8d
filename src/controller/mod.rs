//! Session actor: one worker thread owns the whole session
//!
//! Telemetry notifications, automation timer ticks, user actions and device
//! link events all arrive as tagged [`SessionEvent`]s on one bounded
//! channel. The [`SessionWorker`] applies them one at a time to the
//! [`SessionController`], so session state needs no locking and no two
//! inputs ever interleave.
//!
//! # Architecture
//!
//! - [`SessionEvent`] - Everything that can happen to a session
//! - [`UserAction`] - Requests from the UI
//! - [`SessionUpdate`] - Messages from the worker to the UI
//! - [`SessionHandle`] - UI-side handle for sending actions and receiving updates
//! - [`FlexoBackend`] - Entry point that wires the worker and spawns its thread
//!
//! # Example
//!
//! ```ignore
//! use flexogear_rs::config::AppConfig;
//! use flexogear_rs::controller::FlexoBackend;
//! use flexogear_rs::device::SimulatedDevice;
//! use flexogear_rs::session::MemoryStore;
//!
//! let config = AppConfig::default();
//! let device = SimulatedDevice::new("FlexoGear", config.simulation.clone());
//! let (backend, handle) = FlexoBackend::new(config, Box::new(device), Box::new(MemoryStore::new()));
//! let worker = backend.spawn()?;
//!
//! handle.connect();
//! for update in handle.drain() {
//!     if let SessionUpdate::Snapshot(snapshot) = update {
//!         println!("{}", snapshot.instruction);
//!     }
//! }
//! handle.shutdown();
//! worker.join().ok();
//! ```

pub mod session;
pub mod worker;

pub use session::{
    PendingTick, SessionController, SessionPhase, SessionSnapshot, CALIBRATED_PROMPT,
    CALIBRATE_PROMPT, RELAX,
};
pub use worker::{SessionWorker, WorkerStats};

use crate::config::AppConfig;
use crate::device::{DeviceEvent, WristDevice};
use crate::error::Result;
use crate::exercise::Prescription;
use crate::session::{FinalizeOutcome, SessionRecord, SessionStore, StopReason};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Event applied to the session
#[derive(Debug)]
pub enum SessionEvent {
    /// Raw telemetry notification payload
    SampleArrived(Vec<u8>),
    /// Automation tick for a session generation
    TimerTick { generation: u64 },
    /// Request from the UI
    User(UserAction),
    /// Device link lifecycle
    Device(DeviceEvent),
}

/// Request from the UI
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    /// Connect to the device
    Connect,
    /// Disconnect from the device
    Disconnect,
    /// Capture the current orientation as the reference
    Calibrate,
    /// Choose the exercise for the next session
    SelectPrescription(Prescription),
    /// Start a session
    StartSession,
    /// Stop the running session
    StopSession,
    /// Stop and relax the motors immediately
    EmergencyStop,
    /// Command a named motor position
    SendPosition(String),
    /// Command raw actuator angles
    SendAngles { a1: String, a2: String, a3: String },
    /// Retry writing a record the store rejected
    RetryPersist,
    /// Shut the worker down
    Shutdown,
}

/// Message from the worker to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// Latest session state
    Snapshot(SessionSnapshot),
    /// A request was refused; nothing changed
    Rejected(String),
    /// Something failed
    Error(String),
    /// A session ended
    Finalized {
        reason: StopReason,
        outcome: FinalizeOutcome,
    },
    /// A previously unsaved record was written
    Saved(SessionRecord),
    /// The worker is shutting down
    Shutdown,
}

/// UI-side handle onto the session worker
#[derive(Debug, Clone)]
pub struct SessionHandle {
    /// Receiver for session updates
    pub updates: Receiver<SessionUpdate>,
    /// Sender onto the session event channel
    pub events: Sender<SessionEvent>,
}

impl SessionHandle {
    /// Try to receive an update without blocking
    pub fn try_recv(&self) -> Option<SessionUpdate> {
        self.updates.try_recv().ok()
    }

    /// Receive all pending updates
    pub fn drain(&self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = self.updates.try_recv() {
            updates.push(update);
        }
        updates
    }

    /// Wait for the first update matching `predicate`, discarding the rest
    pub fn wait_for<F>(&self, timeout: Duration, mut predicate: F) -> Option<SessionUpdate>
    where
        F: FnMut(&SessionUpdate) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            match self.updates.recv_deadline(deadline) {
                Ok(update) if predicate(&update) => return Some(update),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None
                }
            }
        }
    }

    /// Send a user action to the worker
    ///
    /// Waits briefly if the event queue is full; returns false if the
    /// action could not be queued.
    pub fn send(&self, action: UserAction) -> bool {
        match self
            .events
            .send_timeout(SessionEvent::User(action), Duration::from_millis(500))
        {
            Ok(()) => true,
            Err(SendTimeoutError::Timeout(_)) => {
                tracing::warn!("Session event queue full, action dropped");
                false
            }
            Err(SendTimeoutError::Disconnected(_)) => false,
        }
    }

    /// Request connection to the device
    pub fn connect(&self) -> bool {
        self.send(UserAction::Connect)
    }

    /// Request disconnection
    pub fn disconnect(&self) -> bool {
        self.send(UserAction::Disconnect)
    }

    /// Calibrate against the current orientation
    pub fn calibrate(&self) -> bool {
        self.send(UserAction::Calibrate)
    }

    /// Select a prescription
    pub fn select_prescription(&self, prescription: Prescription) -> bool {
        self.send(UserAction::SelectPrescription(prescription))
    }

    /// Start a session
    pub fn start_session(&self) -> bool {
        self.send(UserAction::StartSession)
    }

    /// Stop the running session
    pub fn stop_session(&self) -> bool {
        self.send(UserAction::StopSession)
    }

    /// Emergency stop
    pub fn emergency_stop(&self) -> bool {
        self.send(UserAction::EmergencyStop)
    }

    /// Command a named motor position
    pub fn send_position(&self, key: impl Into<String>) -> bool {
        self.send(UserAction::SendPosition(key.into()))
    }

    /// Command raw actuator angles
    pub fn send_angles(
        &self,
        a1: impl Into<String>,
        a2: impl Into<String>,
        a3: impl Into<String>,
    ) -> bool {
        self.send(UserAction::SendAngles {
            a1: a1.into(),
            a2: a2.into(),
            a3: a3.into(),
        })
    }

    /// Retry writing an unsaved record
    pub fn retry_persist(&self) -> bool {
        self.send(UserAction::RetryPersist)
    }

    /// Request shutdown
    pub fn shutdown(&self) -> bool {
        self.send(UserAction::Shutdown)
    }
}

/// The session backend that runs in a separate thread
pub struct FlexoBackend {
    worker: SessionWorker,
    running: Arc<AtomicBool>,
}

impl FlexoBackend {
    /// Create a backend with its communication channels
    pub fn new(
        config: AppConfig,
        device: Box<dyn WristDevice>,
        store: Box<dyn SessionStore>,
    ) -> (Self, SessionHandle) {
        // Telemetry shares this queue, so it is sized for bursts
        let (event_tx, event_rx) = bounded(config.device.event_queue_size.max(16));
        let (update_tx, update_rx) = bounded(1024);
        let running = Arc::new(AtomicBool::new(true));

        let controller = SessionController::new(&config, store);
        let worker = SessionWorker::new(
            controller,
            device,
            event_rx,
            event_tx.clone(),
            update_tx,
            running.clone(),
        );

        let handle = SessionHandle {
            updates: update_rx,
            events: event_tx,
        };

        (Self { worker, running }, handle)
    }

    /// Run the worker loop on the current thread
    pub fn run(self) {
        let mut worker = self.worker;
        worker.run();
    }

    /// Spawn the worker loop on its own thread
    pub fn spawn(self) -> Result<JoinHandle<()>> {
        let handle = std::thread::Builder::new()
            .name("flexo-session".to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    /// Get a handle to stop the worker
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SimulatedDevice;
    use crate::session::MemoryStore;
    use std::sync::atomic::Ordering;

    fn backend() -> (FlexoBackend, SessionHandle) {
        let config = AppConfig::default();
        let device = SimulatedDevice::new("FlexoGear", config.simulation.clone());
        FlexoBackend::new(config, Box::new(device), Box::new(MemoryStore::new()))
    }

    #[test]
    fn test_backend_creation() {
        let (backend, handle) = backend();
        assert!(backend.stop_handle().load(Ordering::SeqCst));
        assert!(handle.shutdown());
    }

    #[test]
    fn test_send_fails_once_worker_is_gone() {
        let (backend, handle) = backend();
        drop(backend);
        assert!(!handle.connect());
        assert!(handle.try_recv().is_none());
        assert!(handle
            .wait_for(Duration::from_millis(10), |_| true)
            .is_none());
    }
}
