//! WristDevice trait for unified device interface
//!
//! This module provides a common trait for all FlexoGear link
//! implementations, enabling both a radio-backed device and the in-process
//! simulator used for tests and demos.

use crate::controller::SessionEvent;
use crate::error::Result;
use crossbeam_channel::Sender;

use super::command::CommandSink;

/// Events a device link posts onto the session event channel
///
/// Every event carries the connection attempt it belongs to; events from a
/// superseded attempt are ignored by the controller.
#[derive(Debug)]
pub enum DeviceEvent {
    /// The link is up and its command endpoint is available
    Connected {
        attempt: u64,
        sink: Box<dyn CommandSink>,
    },
    /// The connection attempt failed
    ConnectFailed { attempt: u64, reason: String },
    /// The link dropped on the device side
    LinkLost { attempt: u64 },
}

impl DeviceEvent {
    /// Connection attempt this event belongs to
    pub fn attempt(&self) -> u64 {
        match self {
            DeviceEvent::Connected { attempt, .. }
            | DeviceEvent::ConnectFailed { attempt, .. }
            | DeviceEvent::LinkLost { attempt } => *attempt,
        }
    }
}

/// Unified interface for wrist devices
///
/// Connecting is asynchronous with unpredictable latency, so
/// [`WristDevice::begin_connect`] only starts the attempt. The outcome, all
/// telemetry notifications ([`SessionEvent::SampleArrived`]) and any link
/// loss arrive later on `events`. Implementations must be `Send` so the
/// worker thread can own them.
///
/// # Example
///
/// ```ignore
/// fn connect(device: &mut dyn WristDevice, events: Sender<SessionEvent>) -> Result<()> {
///     device.begin_connect(1, events)
/// }
/// ```
pub trait WristDevice: Send {
    /// Advertised device name used to filter the scan
    fn name(&self) -> &str;

    /// Start connecting; must not block on the link
    ///
    /// # Arguments
    /// * `attempt` - Identifier to tag every event of this connection with
    /// * `events` - Session event channel to post link events and telemetry to
    fn begin_connect(&mut self, attempt: u64, events: Sender<SessionEvent>) -> Result<()>;

    /// Tear the link down (no-op if not connected)
    fn disconnect(&mut self);

    /// Whether a link is currently up
    fn is_connected(&self) -> bool;
}
