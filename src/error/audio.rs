// Audio input error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Error code range: 1001-1006
pub struct AudioErrorCodes;

impl AudioErrorCodes {
    /// Audio input is already running
    pub const ALREADY_RUNNING: i32 = 1001;

    /// Audio input is not running
    pub const NOT_RUNNING: i32 = 1002;

    /// Hardware error occurred
    pub const HARDWARE_ERROR: i32 = 1003;

    /// Microphone permission denied
    pub const PERMISSION_DENIED: i32 = 1004;

    /// Failed to open audio stream
    pub const STREAM_OPEN_FAILED: i32 = 1005;

    /// Device or file delivers a format we cannot analyse
    pub const UNSUPPORTED_FORMAT: i32 = 1006;
}

/// Log an audio error with structured context
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=AudioInput, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// Acquisition failures are surfaced once to the caller and never retried;
/// the caller may re-attempt the whole initialization later.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Audio input is already running
    AlreadyRunning,

    /// Audio input is not running
    NotRunning,

    /// Hardware error occurred
    HardwareError { details: String },

    /// Microphone permission denied
    PermissionDenied,

    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Sample format or file layout not supported
    UnsupportedFormat { details: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::AlreadyRunning => AudioErrorCodes::ALREADY_RUNNING,
            AudioError::NotRunning => AudioErrorCodes::NOT_RUNNING,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::PermissionDenied => AudioErrorCodes::PERMISSION_DENIED,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::UnsupportedFormat { .. } => AudioErrorCodes::UNSUPPORTED_FORMAT,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::AlreadyRunning => {
                "Audio input already running. Call stop() first.".to_string()
            }
            AudioError::NotRunning => "Audio input not running. Call start() first.".to_string(),
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            AudioError::PermissionDenied => "Microphone permission denied".to_string(),
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::UnsupportedFormat { details } => {
                format!("Unsupported audio format: {}", details)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => AudioError::PermissionDenied,
            _ => AudioError::HardwareError {
                details: err.to_string(),
            },
        }
    }
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) => io.into(),
            other => AudioError::UnsupportedFormat {
                details: other.to_string(),
            },
        }
    }
}
