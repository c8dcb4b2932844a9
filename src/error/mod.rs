// Error types for the breathing engine
//
// This module defines custom error types for audio input, calibration and
// configuration, with stable numeric codes so front-ends can react to
// failures without string matching.

mod audio;
mod calibration;
mod config;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use config::{log_config_error, ConfigError, ConfigErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the CLI and any embedding front-end.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_trait_objects() {
        let errors: Vec<Box<dyn ErrorCode>> = vec![
            Box::new(AudioError::PermissionDenied),
            Box::new(CalibrationError::NotComplete),
            Box::new(ConfigError::InvalidWeights { sum: 0.9 }),
        ];
        let codes: Vec<i32> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes, vec![1004, 2001, 3001]);
    }

    #[test]
    fn test_error_propagation() {
        fn may_fail() -> Result<(), AudioError> {
            Err(AudioError::NotRunning)
        }

        fn caller() -> Result<(), AudioError> {
            may_fail()?;
            Ok(())
        }

        assert!(caller().is_err());
    }
}
