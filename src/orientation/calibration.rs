//! Zeroing live orientation against a captured reference

use super::math::{conjugate, multiply, Orientation};

/// A retained orientation sample captured when the patient holds the
/// hand straight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationReference(Orientation);

impl CalibrationReference {
    /// The captured sample
    pub fn orientation(&self) -> &Orientation {
        &self.0
    }

    /// Express `sample` relative to this reference
    pub fn apply(&self, sample: &Orientation) -> Orientation {
        apply_calibration(self, sample)
    }
}

/// Capture `sample` verbatim as the new reference
pub fn calibrate(sample: Orientation) -> CalibrationReference {
    CalibrationReference(sample)
}

/// `conjugate(reference) * sample`
pub fn apply_calibration(reference: &CalibrationReference, sample: &Orientation) -> Orientation {
    multiply(&conjugate(&reference.0), sample)
}

/// Calibration slot owned by one session context
///
/// While unset the pipeline reports raw angles and sessions may not start.
#[derive(Debug, Clone, Default)]
pub struct Calibration {
    reference: Option<CalibrationReference>,
}

impl Calibration {
    /// Create an empty (uncalibrated) slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a reference is held
    pub fn is_calibrated(&self) -> bool {
        self.reference.is_some()
    }

    /// Current reference, if any
    pub fn reference(&self) -> Option<&CalibrationReference> {
        self.reference.as_ref()
    }

    /// Store `sample` as the reference, replacing any previous one
    pub fn capture(&mut self, sample: Orientation) {
        self.reference = Some(calibrate(sample));
    }

    /// Forget the reference
    pub fn clear(&mut self) {
        self.reference = None;
    }

    /// Calibrated orientation, or the raw sample when uncalibrated
    pub fn apply(&self, sample: &Orientation) -> Orientation {
        match &self.reference {
            Some(reference) => reference.apply(sample),
            None => *sample,
        }
    }
}
