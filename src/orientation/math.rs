//! Quaternion helpers for wrist orientation
//!
//! Orientation samples are plain `nalgebra` quaternions (`w` real part,
//! `i/j/k` imaginary parts matching the device's `x/y/z`). The helpers here
//! fix the one physical convention the rest of the crate relies on: Euler
//! extraction in ZYX order, with pitch negated so wrist flexion reads
//! negative. Downstream rep thresholds are tuned to that sign.

use nalgebra::{Quaternion, UnitQuaternion};

use crate::types::LiveAngles;

/// Orientation sample as streamed by the device
pub type Orientation = Quaternion<f64>;

/// Identity orientation (no rotation)
pub fn identity() -> Orientation {
    Quaternion::identity()
}

/// Hamilton product `q1 * q2`
///
/// Non-commutative: `q1` is the transform applied second.
pub fn multiply(q1: &Orientation, q2: &Orientation) -> Orientation {
    q1 * q2
}

/// Conjugate `{w, -x, -y, -z}`, the inverse of a unit quaternion
pub fn conjugate(q: &Orientation) -> Orientation {
    q.conjugate()
}

/// Convert a quaternion to wrist angles in degrees
///
/// The pitch argument is clamped to ±90° when floating noise pushes it
/// outside `[-1, 1]`. Yaw uses `atan2` for the full ±180° range.
pub fn to_euler(q: &Orientation) -> LiveAngles {
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);

    let sinp = 2.0 * (w * y - z * x);
    let pitch = if sinp.abs() >= 1.0 {
        std::f64::consts::FRAC_PI_2.copysign(sinp)
    } else {
        sinp.asin()
    };

    let siny_cosp = 2.0 * (w * z + x * y);
    let cosy_cosp = 1.0 - 2.0 * (y * y + z * z);
    let yaw = siny_cosp.atan2(cosy_cosp);

    // +0.0 folds -0.0 so a zeroed reading prints as 0
    LiveAngles {
        pitch: -pitch.to_degrees() + 0.0,
        yaw: yaw.to_degrees() + 0.0,
    }
}

/// Extension trait for wrist-angle conversions on quaternions
pub trait QuaternionExt {
    /// Wrist angles in degrees using the crate's pitch convention
    fn to_wrist_angles(&self) -> LiveAngles;

    /// Build the orientation that reads back as the given wrist angles
    fn from_wrist_angles(pitch_deg: f64, yaw_deg: f64) -> Orientation;
}

impl QuaternionExt for Orientation {
    fn to_wrist_angles(&self) -> LiveAngles {
        to_euler(self)
    }

    fn from_wrist_angles(pitch_deg: f64, yaw_deg: f64) -> Orientation {
        // Pitch is reported negated, so the physical rotation is the opposite sign
        UnitQuaternion::from_euler_angles(0.0, (-pitch_deg).to_radians(), yaw_deg.to_radians())
            .into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn unit(w: f64, x: f64, y: f64, z: f64) -> Orientation {
        Quaternion::new(w, x, y, z).normalize()
    }

    #[test]
    fn test_multiply_is_hamilton_product() {
        // i * j = k, j * i = -k
        let i = Quaternion::new(0.0, 1.0, 0.0, 0.0);
        let j = Quaternion::new(0.0, 0.0, 1.0, 0.0);
        let ij = multiply(&i, &j);
        let ji = multiply(&j, &i);
        assert_eq!(ij, Quaternion::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(ji, Quaternion::new(0.0, 0.0, 0.0, -1.0));
    }

    #[test]
    fn test_conjugate_negates_vector_part() {
        let q = Quaternion::new(0.5, 0.1, -0.2, 0.3);
        assert_eq!(conjugate(&q), Quaternion::new(0.5, -0.1, 0.2, -0.3));
    }

    #[test]
    fn test_identity_reads_zero() {
        let angles = to_euler(&identity());
        assert_eq!(angles.pitch, 0.0);
        assert_eq!(angles.yaw, 0.0);
    }

    #[test]
    fn test_pitch_clamps_on_overshoot() {
        // Slightly non-unit quaternion pushes sinp past 1
        let q = Quaternion::new(0.7072, 0.0, 0.7072, 0.0);
        let angles = to_euler(&q);
        assert_eq!(angles.pitch, -90.0);
    }

    #[test]
    fn test_wrist_angle_roundtrip() {
        for (pitch, yaw) in [(-35.0, 0.0), (20.0, -15.0), (0.0, 170.0), (-60.0, 45.0)] {
            let q = Orientation::from_wrist_angles(pitch, yaw);
            let angles = q.to_wrist_angles();
            assert!((angles.pitch - pitch).abs() < 1e-9, "pitch {}", pitch);
            assert!((angles.yaw - yaw).abs() < 1e-9, "yaw {}", yaw);
        }
    }

    proptest! {
        #[test]
        fn conjugate_times_self_is_identity(
            w in -1.0f64..1.0, x in -1.0f64..1.0, y in -1.0f64..1.0, z in -1.0f64..1.0
        ) {
            prop_assume!(Quaternion::new(w, x, y, z).norm() > 0.1);
            let q = unit(w, x, y, z);
            let product = multiply(&conjugate(&q), &q);
            prop_assert!((product.w - 1.0).abs() < EPS);
            prop_assert!(product.i.abs() < EPS);
            prop_assert!(product.j.abs() < EPS);
            prop_assert!(product.k.abs() < EPS);
        }

        #[test]
        fn yaw_stays_in_range(
            w in -1.0f64..1.0, x in -1.0f64..1.0, y in -1.0f64..1.0, z in -1.0f64..1.0
        ) {
            prop_assume!(Quaternion::new(w, x, y, z).norm() > 0.1);
            let angles = to_euler(&unit(w, x, y, z));
            prop_assert!(angles.yaw >= -180.0 && angles.yaw <= 180.0);
            prop_assert!(angles.pitch >= -90.0 && angles.pitch <= 90.0);
        }
    }
}
