//! Test data builders for creating test objects

use flexogear_rs::exercise::Prescription;

/// Builder for creating test Prescriptions
pub struct PrescriptionBuilder {
    name: String,
    reps: u32,
    sets: u32,
    instructions: Vec<String>,
    sequence: Vec<String>,
}

impl PrescriptionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reps: 3,
            sets: 1,
            instructions: Vec::new(),
            sequence: Vec::new(),
        }
    }

    pub fn reps(mut self, reps: u32) -> Self {
        self.reps = reps;
        self
    }

    pub fn sets(mut self, sets: u32) -> Self {
        self.sets = sets;
        self
    }

    pub fn instruction(mut self, text: &str) -> Self {
        self.instructions.push(text.to_string());
        self
    }

    pub fn step(mut self, key: &str) -> Self {
        self.sequence.push(key.to_string());
        self
    }

    pub fn build(self) -> Prescription {
        Prescription::new(self.name, self.reps, self.sets)
            .with_instructions(self.instructions)
            .with_automation(self.sequence)
    }
}

/// Alternate TOP and CENTER for `cycles` cycles
pub fn top_center(cycles: u32) -> Prescription {
    PrescriptionBuilder::new("Assisted Flexion")
        .reps(0)
        .sets(cycles)
        .step("TOP")
        .step("CENTER")
        .build()
}

/// A short manual prescription
pub fn manual_flexion() -> Prescription {
    PrescriptionBuilder::new("Wrist Flexion")
        .reps(2)
        .sets(1)
        .instruction("Bend down")
        .build()
}
