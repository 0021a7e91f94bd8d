//! Error handling for the FlexoGear session core
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate.

use thiserror::Error;

/// Main error type for FlexoGear operations
#[derive(Error, Debug)]
pub enum FlexoError {
    /// A session was started before a prescription was selected
    #[error("Select an exercise first.")]
    NoPrescription,

    /// A session was started before the device was calibrated
    #[error("Calibrate device first.")]
    NotCalibrated,

    /// The operation needs a connected device
    #[error("Device is not connected.")]
    NotConnected,

    /// Calibration was requested before any orientation sample arrived
    #[error("No orientation sample received yet. Hold still and try again.")]
    NoSample,

    /// The operation is not allowed while a session is running
    #[error("A session is already active.")]
    SessionActive,

    /// A connection attempt is already in progress or established
    #[error("Device is already {0}.")]
    AlreadyConnected(String),

    /// An automation sequence referenced a position that does not exist
    #[error("Invalid command key in sequence: {0}")]
    UnknownPosition(String),

    /// Prescription failed validation
    #[error("Invalid prescription: {0}")]
    InvalidPrescription(String),

    /// Errors related to the device link
    #[error("Device error: {0}")]
    Device(String),

    /// Errors related to writing session records
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FlexoError>,
    },
}

impl FlexoError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FlexoError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error is a rejected precondition at a call boundary
    ///
    /// These are reported to the user as plain messages and never change state.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            FlexoError::NoPrescription
                | FlexoError::NotCalibrated
                | FlexoError::NotConnected
                | FlexoError::NoSample
                | FlexoError::SessionActive
                | FlexoError::AlreadyConnected(_)
        )
    }
}

impl From<serde_json::Error> for FlexoError {
    fn from(err: serde_json::Error) -> Self {
        FlexoError::Serialization(err.to_string())
    }
}

/// Result type alias for FlexoGear operations
pub type Result<T> = std::result::Result<T, FlexoError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| FlexoError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| FlexoError::from(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_messages() {
        assert_eq!(
            FlexoError::NoPrescription.to_string(),
            "Select an exercise first."
        );
        assert_eq!(
            FlexoError::NotCalibrated.to_string(),
            "Calibrate device first."
        );
        assert!(FlexoError::NotCalibrated.is_precondition());
        assert!(!FlexoError::UnknownPosition("UP".into()).is_precondition());
    }

    #[test]
    fn test_error_with_context() {
        let err = FlexoError::Persistence("disk full".to_string());
        let with_ctx = err.with_context("Failed to append session");
        assert!(with_ctx.to_string().contains("Failed to append session"));
        assert!(with_ctx.to_string().contains("disk full"));
    }

    #[test]
    fn test_io_result_context() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = res.context("Opening store").unwrap_err();
        assert!(err.to_string().starts_with("Opening store"));
    }
}
