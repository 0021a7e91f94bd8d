//! Session Worker Thread Implementation
//!
//! This module contains the main worker loop that runs in a separate thread
//! and owns the session controller, the device link and (through the
//! controller) the session store. It communicates with the UI thread
//! through crossbeam channels.
//!
//! # Responsibilities
//!
//! The worker thread handles:
//!
//! - **Event processing**: Applies telemetry, timer ticks, user actions and device events in arrival order
//! - **Automation timing**: Sleeps until the pending tick is due, then fires it as a [`SessionEvent::TimerTick`]
//! - **Telemetry coalescing**: A burst of queued samples is applied as its latest good sample
//! - **Link supervision**: Tears the device link down when the controller resets
//! - **Publishing**: Sends session updates and snapshots to the UI without ever blocking
//!
//! # Timing
//!
//! The worker blocks on the event channel with a timeout derived from the
//! pending automation tick, capped at [`IDLE_WAIT`] so the running flag is
//! checked regularly even without events.
//!
//! # Backpressure
//!
//! A UI that stops draining must not stall the session. Lifecycle updates
//! (`Rejected`, `Error`, `Finalized`, `Saved`) are held by the worker while
//! the UI queue is full and delivered in order once it has room; at most
//! [`MAX_HELD_UPDATES`] are held, oldest dropped first. Snapshots are only
//! sent when no lifecycle update is waiting and are dropped when the queue
//! is full.

use crate::controller::{SessionController, SessionEvent, SessionSnapshot, SessionUpdate, UserAction};
use crate::device::{DeviceEvent, WristDevice};
use crate::error::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest the worker blocks without an event
pub const IDLE_WAIT: Duration = Duration::from_millis(100);

/// Lifecycle updates held while the UI queue is full
pub const MAX_HELD_UPDATES: usize = 256;

/// Events handled per loop iteration before timers and publishing run
const MAX_BURST: usize = 256;

/// Delivery statistics of the worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Snapshots dropped because the UI queue was full
    pub dropped_snapshots: u64,
    /// Lifecycle updates dropped after the hold queue overflowed
    pub dropped_updates: u64,
}

/// The session worker that runs the event loop
pub struct SessionWorker {
    /// The session state
    controller: SessionController,
    /// Device link
    device: Box<dyn WristDevice>,
    /// Session event receiver
    event_rx: Receiver<SessionEvent>,
    /// Session event sender handed to the device on connect
    event_tx: Sender<SessionEvent>,
    /// Update sender to the UI
    update_tx: Sender<SessionUpdate>,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Samples waiting to be applied as one burst
    pending_samples: Vec<Vec<u8>>,
    /// Lifecycle updates the UI queue had no room for yet
    held_updates: VecDeque<SessionUpdate>,
    /// Last snapshot delivered to the UI
    last_snapshot: Option<SessionSnapshot>,
    /// Delivery statistics
    stats: WorkerStats,
}

impl SessionWorker {
    /// Create a new session worker
    pub fn new(
        controller: SessionController,
        device: Box<dyn WristDevice>,
        event_rx: Receiver<SessionEvent>,
        event_tx: Sender<SessionEvent>,
        update_tx: Sender<SessionUpdate>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            controller,
            device,
            event_rx,
            event_tx,
            update_tx,
            running,
            pending_samples: Vec::new(),
            held_updates: VecDeque::new(),
            last_snapshot: None,
            stats: WorkerStats::default(),
        }
    }

    /// Delivery statistics so far
    pub fn stats(&self) -> WorkerStats {
        self.stats
    }

    /// Run the main worker loop
    pub fn run(&mut self) {
        tracing::info!("Session worker started (device '{}')", self.device.name());

        while self.running.load(Ordering::SeqCst) {
            self.process_events();
            self.fire_due_tick();
            self.publish();
        }

        // Cleanup: finalize and relax while the link still exists
        self.controller.disconnect();
        self.device.disconnect();
        self.publish();

        if self.update_tx.try_send(SessionUpdate::Shutdown).is_err() {
            tracing::debug!("UI queue full or gone, shutdown notice not delivered");
        }
        tracing::info!(
            "Session worker stopped ({} snapshots, {} updates dropped, {} undelivered)",
            self.stats.dropped_snapshots,
            self.stats.dropped_updates,
            self.held_updates.len()
        );
    }

    /// How long to block waiting for the next event
    fn wait_timeout(&self) -> Duration {
        match self.controller.next_deadline() {
            Some(due) => due.saturating_duration_since(Instant::now()).min(IDLE_WAIT),
            None => IDLE_WAIT,
        }
    }

    /// Wait for events and apply everything already queued
    fn process_events(&mut self) {
        let first = match self.event_rx.recv_timeout(self.wait_timeout()) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => return,
            Err(RecvTimeoutError::Disconnected) => {
                self.running.store(false, Ordering::SeqCst);
                return;
            }
        };

        let mut next = Some(first);
        let mut handled = 0;

        while let Some(event) = next.take() {
            self.handle_event(event);

            handled += 1;
            if handled >= MAX_BURST || !self.running.load(Ordering::SeqCst) {
                break;
            }
            next = self.event_rx.try_recv().ok();
        }

        self.flush_samples();
    }

    /// Apply the buffered samples as one burst
    fn flush_samples(&mut self) {
        if self.pending_samples.is_empty() {
            return;
        }
        let mut samples = std::mem::take(&mut self.pending_samples);
        self.controller
            .ingest_burst(samples.iter().map(Vec::as_slice));
        samples.clear();
        self.pending_samples = samples;
        self.supervise_link();
    }

    /// Handle a single event
    ///
    /// Samples are buffered; any other event first applies the samples
    /// that arrived before it.
    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::SampleArrived(payload) => {
                self.pending_samples.push(payload);
                return;
            }
            SessionEvent::TimerTick { generation } => {
                self.flush_samples();
                self.controller.on_timer(generation);
            }
            SessionEvent::User(action) => {
                self.flush_samples();
                self.handle_action(action);
            }
            SessionEvent::Device(event) => {
                self.flush_samples();
                self.handle_device_event(event);
            }
        }
        self.supervise_link();
    }

    fn handle_action(&mut self, action: UserAction) {
        let result = match action {
            UserAction::Connect => self.connect(),
            UserAction::Disconnect => {
                self.controller.disconnect();
                self.device.disconnect();
                Ok(())
            }
            UserAction::Calibrate => self.controller.calibrate(),
            UserAction::SelectPrescription(prescription) => {
                self.controller.select_prescription(prescription)
            }
            UserAction::StartSession => self.controller.start_session().map(|_| ()),
            UserAction::StopSession => {
                self.controller.stop_session();
                Ok(())
            }
            UserAction::EmergencyStop => {
                self.controller.emergency_stop();
                Ok(())
            }
            UserAction::SendPosition(key) => self.controller.send_position(&key),
            UserAction::SendAngles { a1, a2, a3 } => self.controller.send_angles(&a1, &a2, &a3),
            UserAction::RetryPersist => self.controller.retry_persist().map(|_| ()),
            UserAction::Shutdown => {
                tracing::info!("Shutdown requested");
                self.running.store(false, Ordering::SeqCst);
                Ok(())
            }
        };

        if let Err(e) = result {
            self.controller.report(&e);
        }
    }

    fn connect(&mut self) -> Result<()> {
        let attempt = self.controller.begin_connect()?;
        if let Err(e) = self.device.begin_connect(attempt, self.event_tx.clone()) {
            self.controller.on_connect_failed(attempt, &e.to_string());
        }
        Ok(())
    }

    fn handle_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Connected { attempt, sink } => {
                self.controller.on_connected(attempt, sink);
            }
            DeviceEvent::ConnectFailed { attempt, reason } => {
                self.controller.on_connect_failed(attempt, &reason);
            }
            DeviceEvent::LinkLost { attempt } => {
                if self.controller.on_link_lost(attempt) {
                    self.device.disconnect();
                }
            }
        }
    }

    /// Tear the link down if a command write found it closed
    fn supervise_link(&mut self) {
        if self.controller.check_command_link() {
            self.device.disconnect();
        }
    }

    /// Fire the pending automation tick if it is due
    fn fire_due_tick(&mut self) {
        let Some(tick) = self.controller.pending_tick() else {
            return;
        };
        if tick.due <= Instant::now() {
            self.handle_event(SessionEvent::TimerTick {
                generation: tick.generation,
            });
        }
    }

    /// Forward queued updates and the latest snapshot to the UI
    ///
    /// Never blocks; see the module docs for what happens under backpressure.
    fn publish(&mut self) {
        self.held_updates.extend(self.controller.drain_updates());
        while self.held_updates.len() > MAX_HELD_UPDATES {
            self.held_updates.pop_front();
            self.stats.dropped_updates += 1;
        }

        while let Some(update) = self.held_updates.pop_front() {
            match self.update_tx.try_send(update) {
                Ok(()) => {}
                Err(TrySendError::Full(update)) => {
                    self.held_updates.push_front(update);
                    return;
                }
                Err(TrySendError::Disconnected(_)) => {
                    self.held_updates.clear();
                    return;
                }
            }
        }

        let snapshot = self.controller.snapshot();
        if self.last_snapshot.as_ref() == Some(&snapshot) {
            return;
        }
        // Snapshots are superseded by the next one, so drop them under backpressure
        match self
            .update_tx
            .try_send(SessionUpdate::Snapshot(snapshot.clone()))
        {
            Ok(()) => self.last_snapshot = Some(snapshot),
            Err(_) => self.stats.dropped_snapshots += 1,
        }
    }
}
