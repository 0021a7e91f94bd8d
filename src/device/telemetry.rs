//! Decoding of telemetry notifications
//!
//! Each notification is a UTF-8 string of four comma-separated decimals in
//! the order `x,y,z,w`. Anything else is discarded without surfacing an
//! error: a single bad packet must never interrupt an exercise.

use nalgebra::Quaternion;

use crate::orientation::Orientation;

/// Number of fields in a telemetry payload
pub const FIELD_COUNT: usize = 4;

/// Decode a notification payload into an orientation sample
///
/// Returns `None` for invalid UTF-8, a field count other than four, or
/// any field that does not parse as a finite number.
pub fn decode_sample(payload: &[u8]) -> Option<Orientation> {
    let text = std::str::from_utf8(payload).ok()?;

    let mut fields = [0.0f64; FIELD_COUNT];
    let mut count = 0;
    for part in text.trim().split(',') {
        if count == FIELD_COUNT {
            return None;
        }
        let value: f64 = part.trim().parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        fields[count] = value;
        count += 1;
    }
    if count != FIELD_COUNT {
        return None;
    }

    let [x, y, z, w] = fields;
    Some(Quaternion::new(w, x, y, z))
}

/// Encode a sample in the device's wire order (used by the simulator)
pub fn encode_sample(q: &Orientation) -> Vec<u8> {
    format!("{:.6},{:.6},{:.6},{:.6}", q.i, q.j, q.k, q.w).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_is_xyzw() {
        let q = decode_sample(b"0.1,0.2,0.3,0.9").unwrap();
        assert_eq!(q.i, 0.1);
        assert_eq!(q.j, 0.2);
        assert_eq!(q.k, 0.3);
        assert_eq!(q.w, 0.9);
    }

    #[test]
    fn test_tolerates_whitespace_and_newline() {
        assert!(decode_sample(b" 0.0, 0.0 ,0.0,1.0\r\n").is_some());
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(decode_sample(b"0.1,0.2,0.3,x").is_none());
        assert!(decode_sample(b"0.1,0.2,0.3").is_none());
        assert!(decode_sample(b"0.1,0.2,0.3,0.4,0.5").is_none());
        assert!(decode_sample(b"0.1,0.2,,0.4").is_none());
        assert!(decode_sample(b"0.1,0.2,NaN,0.4").is_none());
        assert!(decode_sample(b"0.1,inf,0.3,0.4").is_none());
        assert!(decode_sample(b"").is_none());
        assert!(decode_sample(&[0xff, 0xfe, 0x2c]).is_none());
    }

    #[test]
    fn test_encode_decode_agree() {
        let q = Quaternion::new(0.5, -0.5, 0.5, -0.5);
        let decoded = decode_sample(&encode_sample(&q)).unwrap();
        assert!((decoded - q).norm() < 1e-6);
    }
}
