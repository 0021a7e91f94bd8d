//! Prescription records
//!
//! Prescriptions are authored by the clinician and read-only to the session
//! core. The serialized form uses the camelCase field names of the shared
//! record shape; missing or `null` lists are treated as empty.

use crate::device::PositionTable;
use crate::error::{FlexoError, Result};
use serde::{Deserialize, Deserializer, Serialize};

use super::DriveMode;

/// An exercise prescribed to a patient
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    /// Catalog identifier, if the prescription came from a store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name copied into session records
    pub exercise_name: String,
    /// Reps per set (manual mode)
    pub target_reps: u32,
    /// Sets (manual) or sequence cycles (automated)
    pub target_sets: u32,
    /// Cyclic instruction script for manual mode
    #[serde(default, deserialize_with = "null_as_empty")]
    pub instructions: Vec<String>,
    /// Motor position keys; non-empty selects automated mode
    #[serde(default, deserialize_with = "null_as_empty")]
    pub automation_sequence: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Prescription {
    /// Create a manual prescription with no instructions
    pub fn new(exercise_name: impl Into<String>, target_reps: u32, target_sets: u32) -> Self {
        Self {
            exercise_name: exercise_name.into(),
            target_reps,
            target_sets,
            ..Default::default()
        }
    }

    /// Builder: set the instruction script
    pub fn with_instructions<I, S>(mut self, instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instructions = instructions.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set the automation sequence
    pub fn with_automation<I, S>(mut self, sequence: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.automation_sequence = sequence.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the automation sequence drives this exercise
    pub fn is_automated(&self) -> bool {
        !self.automation_sequence.is_empty()
    }

    /// Drive mode selected by this prescription
    pub fn drive_mode(&self) -> DriveMode {
        if self.is_automated() {
            DriveMode::Automated
        } else {
            DriveMode::Manual
        }
    }

    /// Total reps of a manual session
    pub fn total_reps(&self) -> u32 {
        self.target_reps.saturating_mul(self.target_sets)
    }

    /// Copy with blank instruction lines removed and whitespace trimmed
    pub fn normalized(&self) -> Self {
        let mut normalized = self.clone();
        normalized.exercise_name = self.exercise_name.trim().to_string();
        normalized.instructions = self
            .instructions
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        normalized.automation_sequence = self
            .automation_sequence
            .iter()
            .map(|key| key.trim().to_uppercase())
            .filter(|key| !key.is_empty())
            .collect();
        normalized
    }

    /// Check the prescription the way the prescription form does
    pub fn validate(&self, positions: &PositionTable) -> Result<()> {
        if self.exercise_name.trim().is_empty() {
            return Err(FlexoError::InvalidPrescription(
                "exercise name is empty".to_string(),
            ));
        }
        if self.target_sets == 0 {
            return Err(FlexoError::InvalidPrescription(
                "target sets must be at least 1".to_string(),
            ));
        }

        if self.is_automated() {
            if self.automation_sequence.len() < 2 {
                return Err(FlexoError::InvalidPrescription(
                    "automation sequence needs at least two positions".to_string(),
                ));
            }
            if let Some(key) = self
                .automation_sequence
                .iter()
                .find(|key| !positions.contains(key))
            {
                return Err(FlexoError::UnknownPosition(key.clone()));
            }
        } else if self.target_reps == 0 {
            return Err(FlexoError::InvalidPrescription(
                "target reps must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{
            "id": "rx-1",
            "exerciseName": "Wrist Flexion",
            "targetReps": 10,
            "targetSets": 3,
            "instructions": ["Flex wrist down", "Return to neutral"]
        }"#;
        let rx: Prescription = serde_json::from_str(json).unwrap();
        assert_eq!(rx.id.as_deref(), Some("rx-1"));
        assert_eq!(rx.exercise_name, "Wrist Flexion");
        assert_eq!(rx.instructions.len(), 2);
        assert!(rx.automation_sequence.is_empty());
        assert_eq!(rx.drive_mode(), DriveMode::Manual);
    }

    #[test]
    fn test_missing_and_null_lists_are_empty() {
        let json = r#"{"exerciseName":"Assist","targetReps":1,"targetSets":2,
                       "instructions":null,"automationSequence":null}"#;
        let rx: Prescription = serde_json::from_str(json).unwrap();
        assert!(rx.instructions.is_empty());
        assert!(!rx.is_automated());

        let json = r#"{"exerciseName":"Assist","targetReps":1,"targetSets":2}"#;
        let rx: Prescription = serde_json::from_str(json).unwrap();
        assert!(rx.instructions.is_empty());
    }

    #[test]
    fn test_automation_selects_mode() {
        let rx = Prescription::new("Assist", 1, 2).with_automation(["TOP", "CENTER"]);
        assert_eq!(rx.drive_mode(), DriveMode::Automated);

        let json = serde_json::to_value(&rx).unwrap();
        assert_eq!(json["automationSequence"][0], "TOP");
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_normalized_drops_blank_lines() {
        let rx = Prescription::new("  Flex  ", 5, 1)
            .with_instructions(["Flex", "  ", "Return "])
            .with_automation([" top", ""]);
        let normalized = rx.normalized();
        assert_eq!(normalized.exercise_name, "Flex");
        assert_eq!(normalized.instructions, vec!["Flex", "Return"]);
        assert_eq!(normalized.automation_sequence, vec!["TOP"]);
    }

    #[test]
    fn test_validate() {
        let table = PositionTable::default();

        assert!(Prescription::new("Flex", 10, 3).validate(&table).is_ok());
        assert!(Prescription::new("", 10, 3).validate(&table).is_err());
        assert!(Prescription::new("Flex", 0, 3).validate(&table).is_err());
        assert!(Prescription::new("Flex", 10, 0).validate(&table).is_err());

        let short = Prescription::new("Assist", 0, 2).with_automation(["TOP"]);
        assert!(short.validate(&table).is_err());

        let unknown = Prescription::new("Assist", 0, 2).with_automation(["TOP", "UP"]);
        assert!(matches!(
            unknown.validate(&table),
            Err(FlexoError::UnknownPosition(key)) if key == "UP"
        ));

        let ok = Prescription::new("Assist", 0, 2).with_automation(["TOP", "CENTER"]);
        assert!(ok.validate(&table).is_ok());
    }
}
