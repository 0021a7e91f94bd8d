//! Orientation pipeline: quaternion math and calibration
//!
//! Raw samples from the device are composed with the inverse of a captured
//! reference and converted to wrist angles:
//!
//! ```text
//! sample ──▶ conjugate(reference) * sample ──▶ to_euler ──▶ LiveAngles
//! ```
//!
//! # Example
//!
//! ```
//! use flexogear_rs::orientation::{Calibration, Orientation, QuaternionExt};
//!
//! let resting = Orientation::from_wrist_angles(8.0, -3.0);
//! let mut calibration = Calibration::new();
//! calibration.capture(resting);
//!
//! let angles = calibration.apply(&resting).to_wrist_angles();
//! assert!(angles.pitch.abs() < 1e-6 && angles.yaw.abs() < 1e-6);
//! ```

pub mod calibration;
pub mod math;

pub use calibration::{apply_calibration, calibrate, Calibration, CalibrationReference};
pub use math::{conjugate, identity, multiply, to_euler, Orientation, QuaternionExt};
