// Calibration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Error code range: 2001-2003
pub struct CalibrationErrorCodes;

impl CalibrationErrorCodes {
    /// Silence and talking profiles are not populated yet
    pub const NOT_COMPLETE: i32 = 2001;

    /// Calibration already in progress
    pub const ALREADY_IN_PROGRESS: i32 = 2002;

    /// Calibration stopped by the user before all stages ran
    pub const CANCELLED: i32 = 2003;
}

/// Log a calibration error with structured context
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationProcedure, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// A stage timing out is not an error: it falls back to a default
/// sub-profile. These variants only cover misuse of the workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Calibration not complete
    NotComplete,

    /// Calibration already in progress
    AlreadyInProgress,

    /// Calibration cancelled at the given stage
    Cancelled { stage: String },
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::NotComplete => CalibrationErrorCodes::NOT_COMPLETE,
            CalibrationError::AlreadyInProgress => CalibrationErrorCodes::ALREADY_IN_PROGRESS,
            CalibrationError::Cancelled { .. } => CalibrationErrorCodes::CANCELLED,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::NotComplete => {
                "Calibration not complete: silence and talking profiles required".to_string()
            }
            CalibrationError::AlreadyInProgress => "Calibration already in progress".to_string(),
            CalibrationError::Cancelled { stage } => {
                format!("Calibration cancelled during {} stage", stage)
            }
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}
