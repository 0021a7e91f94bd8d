//! Motor command channel
//!
//! Motor commands are absolute position targets for the three actuators,
//! so a dropped write self-corrects on the next one. Sends are therefore
//! fire-and-forget: no retries, no blocking, and a failure never becomes a
//! session fault.
//!
//! # Wire Format
//!
//! A single characteristic write of a UTF-8 JSON object with exactly three
//! string keys:
//!
//! ```text
//! {"a1":"90","a2":"90","a3":"90"}
//! ```

use crate::error::Result;
use crossbeam_channel::{Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Key of the neutral ready position
pub const CENTER: &str = "CENTER";

/// Target angles for the three actuators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MotorCommand {
    pub a1: String,
    pub a2: String,
    pub a3: String,
}

impl MotorCommand {
    /// Create a command from three angle strings
    pub fn new(a1: impl Into<String>, a2: impl Into<String>, a3: impl Into<String>) -> Self {
        Self {
            a1: a1.into(),
            a2: a2.into(),
            a3: a3.into(),
        }
    }

    /// Encode as the JSON payload written to the device
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a payload written by [`MotorCommand::to_payload`]
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

impl std::fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.a1, self.a2, self.a3)
    }
}

/// Named motor positions used by automation sequences and the preset dial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionTable {
    /// Position key (e.g. `TOP`) to actuator targets
    #[serde(default = "default_positions")]
    pub positions: BTreeMap<String, MotorCommand>,

    /// Unloaded posture sent whenever no session supervises the device
    #[serde(default = "default_relax")]
    pub relax: MotorCommand,
}

impl Default for PositionTable {
    fn default() -> Self {
        Self {
            positions: default_positions(),
            relax: default_relax(),
        }
    }
}

fn default_positions() -> BTreeMap<String, MotorCommand> {
    [
        ("TOP", MotorCommand::new("0", "180", "180")),
        ("BOTTOM", MotorCommand::new("180", "0", "0")),
        (CENTER, MotorCommand::new("90", "90", "90")),
        ("LEFT", MotorCommand::new("0", "0", "0")),
        ("RIGHT", MotorCommand::new("180", "180", "0")),
        ("TOP_LEFT", MotorCommand::new("0", "90", "90")),
        ("TOP_RIGHT", MotorCommand::new("90", "180", "90")),
        ("BOTTOM_LEFT", MotorCommand::new("90", "0", "0")),
        ("BOTTOM_RIGHT", MotorCommand::new("180", "90", "0")),
    ]
    .into_iter()
    .map(|(key, cmd)| (key.to_string(), cmd))
    .collect()
}

fn default_relax() -> MotorCommand {
    MotorCommand::new("90", "45", "45")
}

impl PositionTable {
    /// Look up a position key
    pub fn get(&self, key: &str) -> Option<&MotorCommand> {
        self.positions.get(key)
    }

    /// Whether `key` names a known position
    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// The neutral ready position, if configured
    pub fn center(&self) -> Option<&MotorCommand> {
        self.get(CENTER)
    }

    /// The reserved unloaded posture
    pub fn relax(&self) -> &MotorCommand {
        &self.relax
    }
}

/// Failure writing to a command endpoint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The endpoint could not take the write right now
    #[error("command endpoint busy")]
    Busy,
    /// The endpoint is gone; the link has dropped
    #[error("command endpoint closed")]
    Closed,
    /// Any other write failure
    #[error("{0}")]
    Other(String),
}

/// A connected command characteristic
///
/// Writes must return promptly; implementations hand the payload to the
/// device's own I/O path rather than waiting on the radio.
pub trait CommandSink: Send + std::fmt::Debug {
    /// Write one payload
    fn write(&mut self, payload: &[u8]) -> std::result::Result<(), SinkError>;
}

/// Command sink backed by a bounded crossbeam channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<Vec<u8>>,
}

impl ChannelSink {
    /// Wrap the sending half of the device's command queue
    pub fn new(tx: Sender<Vec<u8>>) -> Self {
        Self { tx }
    }
}

impl CommandSink for ChannelSink {
    fn write(&mut self, payload: &[u8]) -> std::result::Result<(), SinkError> {
        self.tx.try_send(payload.to_vec()).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Busy,
            TrySendError::Disconnected(_) => SinkError::Closed,
        })
    }
}

/// Counters for outbound commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandStats {
    /// Commands written successfully
    pub sent: u64,
    /// Commands that failed to write
    pub failed: u64,
    /// Commands issued with no endpoint attached
    pub skipped: u64,
}

/// Best-effort channel to the device's command endpoint
#[derive(Debug, Default)]
pub struct CommandChannel {
    sink: Option<Box<dyn CommandSink>>,
    link_lost: bool,
    stats: CommandStats,
}

impl CommandChannel {
    /// Create a channel with no endpoint attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the endpoint of a freshly connected link
    pub fn attach(&mut self, sink: Box<dyn CommandSink>) {
        self.sink = Some(sink);
        self.link_lost = false;
    }

    /// Drop the endpoint
    pub fn detach(&mut self) {
        self.sink = None;
    }

    /// Whether an endpoint is attached
    pub fn is_attached(&self) -> bool {
        self.sink.is_some()
    }

    /// Send statistics
    pub fn stats(&self) -> CommandStats {
        self.stats
    }

    /// Returns true once after a write found the endpoint closed
    pub fn take_link_lost(&mut self) -> bool {
        std::mem::take(&mut self.link_lost)
    }

    /// Write `command` if an endpoint is attached
    ///
    /// Returns whether the write was accepted. Failures are logged and
    /// counted, never retried.
    pub fn send(&mut self, command: &MotorCommand) -> bool {
        let Some(sink) = self.sink.as_mut() else {
            self.stats.skipped += 1;
            tracing::debug!("No command endpoint, dropping {}", command);
            return false;
        };

        let payload = match command.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                self.stats.failed += 1;
                tracing::error!("Failed to encode motor command: {}", e);
                return false;
            }
        };

        match sink.write(&payload) {
            Ok(()) => {
                self.stats.sent += 1;
                tracing::debug!("Sent motor command {}", command);
                true
            }
            Err(e) => {
                self.stats.failed += 1;
                tracing::warn!("Send failed ({}): {}", command, e);
                if e == SinkError::Closed {
                    self.link_lost = true;
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_payload_has_exactly_three_string_keys() {
        let payload = MotorCommand::new("0", "180", "180").to_payload().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(object["a1"], "0");
        assert_eq!(object["a2"], "180");
        assert_eq!(object["a3"], "180");
    }

    #[test]
    fn test_default_table() {
        let table = PositionTable::default();
        assert_eq!(table.center(), Some(&MotorCommand::new("90", "90", "90")));
        assert!(table.contains("TOP_LEFT"));
        assert!(!table.contains("RELAX"));
        assert!(table.get("UP").is_none());
    }

    #[test]
    fn test_send_without_endpoint_is_noop() {
        let mut channel = CommandChannel::new();
        assert!(!channel.send(&MotorCommand::new("1", "2", "3")));
        assert_eq!(channel.stats().skipped, 1);
        assert!(!channel.take_link_lost());
    }

    #[test]
    fn test_send_through_channel_sink() {
        let (tx, rx) = bounded(4);
        let mut channel = CommandChannel::new();
        channel.attach(Box::new(ChannelSink::new(tx)));

        assert!(channel.send(&MotorCommand::new("90", "90", "90")));
        let received = MotorCommand::from_payload(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(received, MotorCommand::new("90", "90", "90"));
        assert_eq!(channel.stats().sent, 1);
    }

    #[test]
    fn test_busy_endpoint_is_not_link_loss() {
        let (tx, _rx) = bounded(1);
        let mut channel = CommandChannel::new();
        channel.attach(Box::new(ChannelSink::new(tx)));

        assert!(channel.send(&MotorCommand::new("0", "0", "0")));
        assert!(!channel.send(&MotorCommand::new("0", "0", "0")));
        assert_eq!(channel.stats().failed, 1);
        assert!(!channel.take_link_lost());
    }

    #[test]
    fn test_closed_endpoint_flags_link_loss_once() {
        let (tx, rx) = bounded(1);
        drop(rx);
        let mut channel = CommandChannel::new();
        channel.attach(Box::new(ChannelSink::new(tx)));

        assert!(!channel.send(&MotorCommand::new("0", "0", "0")));
        assert!(channel.take_link_lost());
        assert!(!channel.take_link_lost());
    }
}
