//! # FlexoGear-RS: Wrist Exoskeleton Session Core
//!
//! The session core for the FlexoGear wrist exoskeleton. It turns the
//! device's orientation stream into wrist angles, counts exercise
//! repetitions, drives the motors through automation sequences and records
//! a summary of every session.
//!
//! ## Architecture
//!
//! - **Device**: Telemetry decoding, motor command encoding and the link trait
//! - **Orientation**: Quaternion math and calibration against a reference pose
//! - **Exercise**: Prescriptions, the manual rep detector and the automation sequencer
//! - **Session**: Range-of-motion tracking and record persistence
//! - **Controller**: A single worker thread that owns the session and serializes every event
//! - **Communication**: Crossbeam channels between the worker, the device link and the UI
//!
//! ## Configuration
//!
//! Configuration and session records are stored in the platform-appropriate
//! data directory under `dev.flexogear.flexogear-rs`:
//!
//! - **Linux**: `~/.local/share/dev.flexogear.flexogear-rs/`
//! - **macOS**: `~/Library/Application Support/dev.flexogear.flexogear-rs/`
//! - **Windows**: `%APPDATA%\dev.flexogear.flexogear-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use flexogear_rs::{
//!     config::AppConfig,
//!     controller::{FlexoBackend, SessionUpdate},
//!     device::SimulatedDevice,
//!     exercise::Prescription,
//!     session::JsonLinesStore,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load_or_default("config.toml");
//!     let store = JsonLinesStore::new(config.sessions_dir()?)?;
//!     let device = SimulatedDevice::new(&config.device.name, config.simulation.clone());
//!
//!     let (backend, handle) = FlexoBackend::new(config, Box::new(device), Box::new(store));
//!     let worker = backend.spawn()?;
//!
//!     handle.connect();
//!     handle.calibrate();
//!     handle.select_prescription(Prescription::new("Wrist Flexion", 10, 3));
//!     handle.start_session();
//!
//!     // ...
//!
//!     handle.shutdown();
//!     worker.join().ok();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod exercise;
pub mod orientation;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use controller::{
    FlexoBackend, SessionController, SessionEvent, SessionHandle, SessionUpdate, UserAction,
};
pub use device::{MotorCommand, PositionTable, SimulatedDevice, WristDevice};
pub use error::{FlexoError, Result};
pub use exercise::{DriveMode, Prescription};
pub use orientation::{Orientation, QuaternionExt};
pub use session::{SessionRecord, SessionStore, StopReason};
pub use types::{ConnectionStatus, LiveAngles};
