// Configuration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 3001-3003
pub struct ConfigErrorCodes;

impl ConfigErrorCodes {
    /// Score weights do not sum to 1.0
    pub const INVALID_WEIGHTS: i32 = 3001;

    /// A field is outside its allowed range
    pub const INVALID_VALUE: i32 = 3002;

    /// Configuration text could not be parsed
    pub const PARSE: i32 = 3003;
}

/// Log a configuration error with structured context
pub fn log_config_error(err: &ConfigError, context: &str) {
    error!(
        "Config error in {}: code={}, component=AppConfig, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Weights must sum to 1.0
    InvalidWeights { sum: f64 },

    /// Field outside its allowed range
    InvalidValue { field: String, reason: String },

    /// JSON parse failure
    Parse { reason: String },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::InvalidWeights { .. } => ConfigErrorCodes::INVALID_WEIGHTS,
            ConfigError::InvalidValue { .. } => ConfigErrorCodes::INVALID_VALUE,
            ConfigError::Parse { .. } => ConfigErrorCodes::PARSE,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::InvalidWeights { sum } => {
                format!("Score weights must sum to 1.0 (got {:.4})", sum)
            }
            ConfigError::InvalidValue { field, reason } => {
                format!("Invalid value for {}: {}", field, reason)
            }
            ConfigError::Parse { reason } => format!("Failed to parse configuration: {}", reason),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_codes() {
        assert_eq!(ConfigError::InvalidWeights { sum: 0.5 }.code(), 3001);
        assert_eq!(
            ConfigError::InvalidValue {
                field: "audio.fft_size".to_string(),
                reason: "must be a power of two".to_string()
            }
            .code(),
            3002
        );
        assert_eq!(
            ConfigError::Parse {
                reason: "eof".to_string()
            }
            .code(),
            3003
        );
    }

    #[test]
    fn test_invalid_weights_message() {
        let err = ConfigError::InvalidWeights { sum: 0.95 };
        assert!(err.message().contains("0.9500"));
    }

    #[test]
    fn test_from_serde_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ConfigError = parse_err.into();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
