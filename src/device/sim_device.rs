//! Simulated FlexoGear device
//!
//! This module provides an in-process stand-in for the wrist exoskeleton so
//! the session core can be exercised without hardware. It streams telemetry
//! in the real wire format and consumes motor commands from the same kind
//! of command endpoint a radio link would expose.
//!
//! # Features
//!
//! - **Pattern-based motion**: Generate wrist motion using a few patterns
//! - **Mounting offset**: Samples include a fixed strap-on rotation so
//!   calibration is actually exercised
//! - **Connect latency**: The link comes up on a background thread
//! - **Fault injection**: [`LinkControl`] can drop the link at any time
//!
//! # Motion Patterns
//!
//! - [`MotionPattern::Still`] - Hand held at a fixed pose
//! - [`MotionPattern::FlexCycle`] - Repeated flex/extend cycles starting at neutral
//! - [`MotionPattern::Deviation`] - Side-to-side radial/ulnar sweeps
//!
//! # Example
//!
//! ```ignore
//! use flexogear_rs::device::{SimulatedDevice, WristDevice};
//!
//! let mut device = SimulatedDevice::new("FlexoGear", SimulationConfig::default());
//! let link = device.link_control();
//! device.begin_connect(1, events_tx)?;
//! // ... later
//! link.drop_link();
//! ```

use crate::config::SimulationConfig;
use crate::controller::SessionEvent;
use crate::error::Result;
use crate::orientation::{Orientation, QuaternionExt};
use crate::types::LiveAngles;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::command::{ChannelSink, MotorCommand};
use super::device_trait::{DeviceEvent, WristDevice};
use super::telemetry::encode_sample;

/// Granularity of interruptible sleeps on the link thread
const SLEEP_SLICE: Duration = Duration::from_millis(5);

/// Capacity of the simulated command characteristic
const COMMAND_QUEUE_SIZE: usize = 64;

/// Longest a lifecycle event waits for room on the session queue
const EVENT_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Wrist motion generated by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MotionPattern {
    /// Fixed pose
    Still { pitch: f64, yaw: f64 },
    /// Flex to `flex_deg`, return through neutral, extend to `ext_deg`
    FlexCycle {
        period_secs: f64,
        flex_deg: f64,
        ext_deg: f64,
    },
    /// Radial/ulnar sweep with neutral pitch
    Deviation { period_secs: f64, amplitude_deg: f64 },
}

impl Default for MotionPattern {
    fn default() -> Self {
        MotionPattern::FlexCycle {
            period_secs: 4.0,
            flex_deg: -45.0,
            ext_deg: 20.0,
        }
    }
}

impl MotionPattern {
    /// Wrist angles at `elapsed_secs` into the stream
    pub fn angles_at(&self, elapsed_secs: f64) -> LiveAngles {
        match *self {
            MotionPattern::Still { pitch, yaw } => LiveAngles::new(pitch, yaw),
            MotionPattern::FlexCycle {
                period_secs,
                flex_deg,
                ext_deg,
            } => {
                // First half of the period flexes, second half extends
                let phase = (elapsed_secs % period_secs) / period_secs;
                let swing = (std::f64::consts::PI * 2.0 * phase).sin();
                let pitch = if swing <= 0.0 {
                    -swing * ext_deg
                } else {
                    swing * -flex_deg.abs()
                };
                LiveAngles::new(pitch, 0.0)
            }
            MotionPattern::Deviation {
                period_secs,
                amplitude_deg,
            } => {
                let phase = (elapsed_secs % period_secs) / period_secs;
                LiveAngles::new(
                    0.0,
                    amplitude_deg * (std::f64::consts::PI * 2.0 * phase).sin(),
                )
            }
        }
    }
}

/// Simple pseudo-random jitter (no external dependency)
fn rand_simple() -> f64 {
    use std::cell::Cell;
    thread_local! {
        static SEED: Cell<u64> = const { Cell::new(12345) };
    }
    SEED.with(|seed| {
        let mut s = seed.get();
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        seed.set(s);
        (s as f64) / (u64::MAX as f64)
    })
}

/// State shared between the device, its link thread and [`LinkControl`]
#[derive(Debug, Default)]
struct SharedLink {
    connected: AtomicBool,
    drop_requested: AtomicBool,
    samples_sent: AtomicU64,
    samples_dropped: AtomicU64,
    commands: Mutex<Vec<MotorCommand>>,
}

/// Test and demo handle onto a simulated device
#[derive(Debug, Clone)]
pub struct LinkControl {
    shared: Arc<SharedLink>,
}

impl LinkControl {
    /// Drop the link from the device side (posts `LinkLost`)
    pub fn drop_link(&self) {
        self.shared.drop_requested.store(true, Ordering::SeqCst);
    }

    /// Whether the simulated link is up
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Commands received so far, oldest first
    pub fn received_commands(&self) -> Vec<MotorCommand> {
        self.shared
            .commands
            .lock()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }

    /// Telemetry samples posted so far
    pub fn samples_sent(&self) -> u64 {
        self.shared.samples_sent.load(Ordering::SeqCst)
    }

    /// Telemetry samples dropped because the event queue was full
    pub fn samples_dropped(&self) -> u64 {
        self.shared.samples_dropped.load(Ordering::SeqCst)
    }
}

/// Simulated device for testing without real hardware
pub struct SimulatedDevice {
    /// Advertised name
    name: String,
    /// Motion, rate and latency settings
    config: SimulationConfig,
    /// State shared with the link thread
    shared: Arc<SharedLink>,
    /// Stop flag of the current link thread
    stop: Option<Arc<AtomicBool>>,
    /// Current link thread
    handle: Option<JoinHandle<()>>,
}

impl SimulatedDevice {
    /// Create a simulated device advertising `name`
    pub fn new(name: impl Into<String>, config: SimulationConfig) -> Self {
        Self {
            name: name.into(),
            config,
            shared: Arc::new(SharedLink::default()),
            stop: None,
            handle: None,
        }
    }

    /// Handle for observing commands and injecting link loss
    pub fn link_control(&self) -> LinkControl {
        LinkControl {
            shared: self.shared.clone(),
        }
    }

    fn stop_link(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.store(true, Ordering::SeqCst);
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Simulated link thread panicked");
            }
        }
    }
}

impl WristDevice for SimulatedDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin_connect(&mut self, attempt: u64, events: Sender<SessionEvent>) -> Result<()> {
        self.stop_link();

        let stop = Arc::new(AtomicBool::new(false));
        let link = LinkThread {
            attempt,
            events,
            config: self.config.clone(),
            shared: self.shared.clone(),
            stop: stop.clone(),
        };

        let handle = std::thread::Builder::new()
            .name(format!("sim-link-{}", attempt))
            .spawn(move || link.run())?;

        self.stop = Some(stop);
        self.handle = Some(handle);
        tracing::info!("Simulated device '{}' connecting (attempt {})", self.name, attempt);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.stop_link();
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        self.stop_link();
    }
}

/// Body of one simulated connection
struct LinkThread {
    attempt: u64,
    events: Sender<SessionEvent>,
    config: SimulationConfig,
    shared: Arc<SharedLink>,
    stop: Arc<AtomicBool>,
}

impl LinkThread {
    fn run(self) {
        if !self.sleep_interruptible(Duration::from_millis(self.config.connect_latency_ms)) {
            return;
        }

        if self.config.fail_connect {
            self.post(SessionEvent::Device(DeviceEvent::ConnectFailed {
                attempt: self.attempt,
                reason: "Device not found".to_string(),
            }));
            return;
        }

        let (cmd_tx, cmd_rx) = bounded(COMMAND_QUEUE_SIZE);
        let connected = SessionEvent::Device(DeviceEvent::Connected {
            attempt: self.attempt,
            sink: Box::new(ChannelSink::new(cmd_tx)),
        });
        if !self.post(connected) {
            return;
        }
        self.shared.drop_requested.store(false, Ordering::SeqCst);
        self.shared.connected.store(true, Ordering::SeqCst);

        self.stream(&cmd_rx);

        // Commands written just before teardown (e.g. RELAX) still land
        self.drain_commands(&cmd_rx);
        self.shared.connected.store(false, Ordering::SeqCst);
        tracing::debug!("Simulated link {} closed", self.attempt);
    }

    fn stream(&self, cmd_rx: &Receiver<Vec<u8>>) {
        let rate = self.config.sample_rate_hz.max(1) as u64;
        let interval = Duration::from_micros(1_000_000 / rate);
        let mounting = Orientation::from_wrist_angles(
            self.config.mounting_pitch_deg,
            self.config.mounting_yaw_deg,
        );
        let start = Instant::now();

        while !self.stop.load(Ordering::SeqCst) {
            if self.shared.drop_requested.swap(false, Ordering::SeqCst) {
                tracing::info!("Simulated link {} dropped", self.attempt);
                self.post(SessionEvent::Device(DeviceEvent::LinkLost {
                    attempt: self.attempt,
                }));
                return;
            }

            self.drain_commands(cmd_rx);

            let mut angles = self.config.pattern.angles_at(start.elapsed().as_secs_f64());
            if self.config.noise_deg > 0.0 {
                angles.pitch += (rand_simple() - 0.5) * 2.0 * self.config.noise_deg;
                angles.yaw += (rand_simple() - 0.5) * 2.0 * self.config.noise_deg;
            }
            let sample = mounting * Orientation::from_wrist_angles(angles.pitch, angles.yaw);

            match self
                .events
                .try_send(SessionEvent::SampleArrived(encode_sample(&sample)))
            {
                Ok(()) => {
                    self.shared.samples_sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Full(_)) => {
                    self.shared.samples_dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => return,
            }

            std::thread::sleep(interval);
        }
    }

    /// Post a lifecycle event; gives up if the worker stops draining
    fn post(&self, event: SessionEvent) -> bool {
        self.events.send_timeout(event, EVENT_SEND_TIMEOUT).is_ok()
    }

    fn drain_commands(&self, cmd_rx: &Receiver<Vec<u8>>) {
        while let Ok(payload) = cmd_rx.try_recv() {
            match MotorCommand::from_payload(&payload) {
                Ok(command) => {
                    tracing::trace!("Simulated motors -> {}", command);
                    if let Ok(mut commands) = self.shared.commands.lock() {
                        commands.push(command);
                    }
                }
                Err(e) => tracing::warn!("Simulated device rejected command payload: {}", e),
            }
        }
    }

    /// Returns false if stopped while sleeping
    fn sleep_interruptible(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if self.stop.load(Ordering::SeqCst) {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}
