//! Device link: telemetry in, motor commands out
//!
//! The FlexoGear exposes one service with two characteristics: a notify
//! characteristic streaming orientation quaternions and a write
//! characteristic accepting motor commands. This module models both sides
//! of that link independently of the radio stack.
//!
//! # Components
//!
//! - [`WristDevice`] - Asynchronous link abstraction owned by the session worker
//! - [`DeviceEvent`] - Link lifecycle events tagged with their connection attempt
//! - [`decode_sample`] - Telemetry payload parser (`x,y,z,w`)
//! - [`CommandChannel`] / [`MotorCommand`] - Best-effort motor command writes
//! - [`PositionTable`] - Named motor positions and the RELAX posture
//! - [`SimulatedDevice`] - In-process device for demos and tests

pub mod command;
pub mod device_trait;
pub mod sim_device;
pub mod telemetry;

pub use command::{
    ChannelSink, CommandChannel, CommandSink, CommandStats, MotorCommand, PositionTable,
    SinkError, CENTER,
};
pub use device_trait::{DeviceEvent, WristDevice};
pub use sim_device::{LinkControl, MotionPattern, SimulatedDevice};
pub use telemetry::{decode_sample, encode_sample, FIELD_COUNT};

/// GATT service advertised by the device
pub const SERVICE_UUID: &str = "4fafc201-1fb5-459e-8fcc-c5c9c331914b";

/// Notify characteristic carrying orientation samples
pub const TELEMETRY_CHARACTERISTIC_UUID: &str = "beb5483e-36e1-4688-b7f5-ea07361b26a8";

/// Write characteristic accepting motor commands
pub const COMMAND_CHARACTERISTIC_UUID: &str = "beb5483e-36e1-4688-b7f5-ea07361b26a9";

/// Advertised name the scan filters on
pub const DEFAULT_DEVICE_NAME: &str = "FlexoGear";
