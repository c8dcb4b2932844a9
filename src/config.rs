//! Configuration for the breathing engine
//!
//! All timing, analysis and scoring constants live here. The configuration is
//! loaded once at startup (JSON file or defaults), validated, and then passed
//! by reference to every component. Nothing mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{log_config_error, ConfigError};

/// Tolerance used when checking that score weights sum to 1.0
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub weights: ScoreWeights,
}

/// Guided session pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Target inhale duration the guide indicator follows
    pub target_inhale_ms: u64,
    /// Target exhale duration the guide indicator follows
    pub target_exhale_ms: u64,
    /// Pause after each breathing phase
    pub hold_ms: u64,
    /// Number of rounds (one inhale + one exhale each)
    pub total_rounds: u32,
    /// Fraction of the gap to target closed after every round
    pub adaptation_rate: f64,
    /// Cadence of the synchrony monitor
    pub monitor_period_ms: u64,
    /// Cadence of countdown display updates
    pub countdown_period_ms: u64,
    /// Pause between the intro narration and round 1
    pub intro_pause_ms: u64,
    /// Pause between rounds
    pub round_pause_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_inhale_ms: 4000,
            target_exhale_ms: 4000,
            hold_ms: 1000,
            total_rounds: 5,
            adaptation_rate: 0.5,
            monitor_period_ms: 50,
            countdown_period_ms: 100,
            intro_pause_ms: 2000,
            round_pause_ms: 500,
        }
    }
}

impl SessionConfig {
    pub fn monitor_period(&self) -> Duration {
        Duration::from_millis(self.monitor_period_ms)
    }
}

/// Calibration procedure configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Length of the fixed silence and talking capture windows
    pub duration_ms: u64,
    /// Delay between the stage prompt and the start of capture
    pub settle_ms: u64,
    /// Ceiling for the onset-based breathing stages
    pub max_wait_ms: u64,
    /// Polling cadence while capturing
    pub poll_period_ms: u64,
    /// Minimum time after onset before a breath may end
    pub min_breath_ms: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            duration_ms: 6000,
            settle_ms: 500,
            max_wait_ms: 12_000,
            poll_period_ms: 50,
            min_breath_ms: 1000,
        }
    }
}

impl CalibrationConfig {
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }
}

/// Audio analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// FFT size; magnitude frames carry fft_size / 2 bins
    pub fft_size: usize,
    /// Exponential smoothing factor applied to the envelope
    pub smoothing_factor: f64,
    /// Number of feature frames kept for short-horizon statistics
    pub feature_history_length: usize,
    /// Temporal smoothing of magnitude spectra (analyser time constant)
    pub analyser_smoothing: f64,
    /// Level mapped to magnitude 0.0
    pub min_decibels: f64,
    /// Level mapped to magnitude 1.0
    pub max_decibels: f64,
    /// Display refresh rate driving the live sampling tick
    pub refresh_hz: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing_factor: 0.3,
            feature_history_length: 30,
            analyser_smoothing: 0.5,
            min_decibels: -100.0,
            max_decibels: -30.0,
            refresh_hz: 60,
        }
    }
}

impl AudioConfig {
    /// Period of the display-refresh sampling tick
    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_hz.max(1) as f64)
    }
}

/// Weights of the four breath-likelihood terms (must sum to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub envelope: f64,
    pub envelope_slope: f64,
    pub spectral_centroid: f64,
    pub zero_crossing_rate: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            envelope: 0.35,
            envelope_slope: 0.25,
            spectral_centroid: 0.20,
            zero_crossing_rate: 0.20,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.envelope + self.envelope_slope + self.spectral_centroid + self.zero_crossing_rate
    }
}

impl AppConfig {
    /// Parse and validate configuration from JSON text
    ///
    /// Missing sections and fields take their default values.
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or the defaults if the file is missing,
    /// malformed, or fails validation.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log_config_error(&err, "load_from_file");
                    log::warn!(
                        "[Config] Rejected configuration from {:?}. Using defaults.",
                        path.as_ref()
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default asset location
    pub fn load() -> Self {
        Self::load_from_file("assets/breath_config.json")
    }

    /// Check cross-field invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sum = self.weights.sum();
        let weights = [
            self.weights.envelope,
            self.weights.envelope_slope,
            self.weights.spectral_centroid,
            self.weights.zero_crossing_rate,
        ];
        if weights.iter().any(|w| *w < 0.0) || (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::InvalidWeights { sum });
        }

        let audio = &self.audio;
        if audio.fft_size < 32 || !audio.fft_size.is_power_of_two() {
            return Err(invalid("audio.fft_size", "must be a power of two >= 32"));
        }
        if !(audio.smoothing_factor > 0.0 && audio.smoothing_factor <= 1.0) {
            return Err(invalid("audio.smoothing_factor", "must be in (0, 1]"));
        }
        if audio.feature_history_length == 0 {
            return Err(invalid("audio.feature_history_length", "must be at least 1"));
        }
        if !(0.0..1.0).contains(&audio.analyser_smoothing) {
            return Err(invalid("audio.analyser_smoothing", "must be in [0, 1)"));
        }
        if audio.min_decibels >= audio.max_decibels {
            return Err(invalid("audio.min_decibels", "must be below max_decibels"));
        }

        let session = &self.session;
        if !(session.adaptation_rate > 0.0 && session.adaptation_rate <= 1.0) {
            return Err(invalid("session.adaptation_rate", "must be in (0, 1]"));
        }
        if session.target_inhale_ms == 0 || session.target_exhale_ms == 0 {
            return Err(invalid("session.target_*_ms", "must be positive"));
        }
        if session.monitor_period_ms == 0 || session.countdown_period_ms == 0 {
            return Err(invalid("session.*_period_ms", "must be positive"));
        }

        let calibration = &self.calibration;
        if calibration.poll_period_ms == 0 || calibration.duration_ms == 0 {
            return Err(invalid("calibration", "durations must be positive"));
        }
        if calibration.max_wait_ms <= calibration.min_breath_ms {
            return Err(invalid(
                "calibration.max_wait_ms",
                "must exceed min_breath_ms",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
