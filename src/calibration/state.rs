// CalibrationProfile - per-user reference features
//
// One sub-profile per calibration stage. Every field starts at zero, which
// the scorer, classifier and phase detector read as "not calibrated yet".
// A profile is replaced as a whole when calibration completes and is never
// mutated piecemeal while a session reads it.

use serde::{Deserialize, Serialize};

use crate::analysis::features::FeatureFrame;
use crate::analysis::history::population_variance;

/// Reference features captured during one calibration stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubProfile {
    /// Mean (or, for breathing stages, peak) breath-band envelope
    pub envelope: f64,
    /// Mean spectral centroid in Hz
    pub spectral_centroid: f64,
    /// Mean zero-crossing rate
    pub zero_crossing_rate: f64,
    /// Population variance of envelope slopes (talking stage only)
    #[serde(default)]
    pub envelope_slope_variance: Option<f64>,
    /// Measured breath duration (breathing stages only)
    #[serde(default)]
    pub duration_ms: Option<u64>,
    /// Envelope trace from onset to end (breathing stages only)
    #[serde(default)]
    pub envelope_pattern: Vec<f64>,
}

impl SubProfile {
    /// Average envelope, centroid and ZCR over captured frames
    ///
    /// An empty capture yields all zeros.
    pub fn mean_of(frames: &[FeatureFrame]) -> Self {
        if frames.is_empty() {
            return Self::default();
        }
        let n = frames.len() as f64;
        Self {
            envelope: frames.iter().map(|f| f.envelope).sum::<f64>() / n,
            spectral_centroid: frames.iter().map(|f| f.spectral_centroid).sum::<f64>() / n,
            zero_crossing_rate: frames.iter().map(|f| f.zero_crossing_rate).sum::<f64>() / n,
            ..Self::default()
        }
    }

    /// Like [`SubProfile::mean_of`], plus the variance of envelope slopes
    pub fn mean_with_slope_variance(frames: &[FeatureFrame]) -> Self {
        let slopes: Vec<f64> = frames.iter().map(|f| f.envelope_slope).collect();
        Self {
            envelope_slope_variance: Some(population_variance(&slopes)),
            ..Self::mean_of(frames)
        }
    }

    /// Measured duration in seconds, if any
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_ms.map(|ms| ms as f64 / 1000.0)
    }
}

/// Per-user calibration profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    pub silence: SubProfile,
    pub talking: SubProfile,
    pub breathing_in: SubProfile,
    pub breathing_out: SubProfile,
}

impl CalibrationProfile {
    /// Whether the silence stage has produced a usable noise floor
    ///
    /// Breath scores are forced to 0.0 until this holds.
    pub fn is_calibrated(&self) -> bool {
        self.silence.envelope > 0.0
    }

    /// Whether the talking stage has produced a reference
    ///
    /// The talking classifier stays silent until this holds.
    pub fn has_talking_reference(&self) -> bool {
        self.talking.envelope > 0.0
    }

    /// Larger of the inhale and exhale reference envelopes
    pub fn breath_envelope_reference(&self) -> f64 {
        self.breathing_in.envelope.max(self.breathing_out.envelope)
    }

    /// Return every field to zero
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(envelope: f64, slope: f64, centroid: f64, zcr: f64) -> FeatureFrame {
        FeatureFrame::unscored(envelope, slope, centroid, zcr)
    }

    #[test]
    fn test_default_profile_is_uncalibrated() {
        let profile = CalibrationProfile::default();
        assert!(!profile.is_calibrated());
        assert!(!profile.has_talking_reference());
        assert_eq!(profile.breath_envelope_reference(), 0.0);
    }

    #[test]
    fn test_mean_of_frames() {
        let frames = [frame(0.1, 0.0, 100.0, 0.1), frame(0.3, 0.0, 300.0, 0.3)];
        let sub = SubProfile::mean_of(&frames);
        assert!((sub.envelope - 0.2).abs() < 1e-12);
        assert!((sub.spectral_centroid - 200.0).abs() < 1e-12);
        assert!((sub.zero_crossing_rate - 0.2).abs() < 1e-12);
        assert_eq!(sub.envelope_slope_variance, None);
    }

    #[test]
    fn test_mean_of_empty_capture_is_zero() {
        assert_eq!(SubProfile::mean_of(&[]), SubProfile::default());
        let talking = SubProfile::mean_with_slope_variance(&[]);
        assert_eq!(talking.envelope_slope_variance, Some(0.0));
    }

    #[test]
    fn test_slope_variance_is_population_variance() {
        let frames = [frame(0.1, 0.02, 0.0, 0.0), frame(0.1, -0.02, 0.0, 0.0)];
        let sub = SubProfile::mean_with_slope_variance(&frames);
        assert!((sub.envelope_slope_variance.unwrap() - 0.0004).abs() < 1e-15);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut profile = CalibrationProfile::default();
        profile.silence.envelope = 0.02;
        profile.breathing_in.duration_ms = Some(3000);
        profile.reset();
        assert_eq!(profile, CalibrationProfile::default());
    }

    #[test]
    fn test_profile_json_roundtrip() {
        let mut profile = CalibrationProfile::default();
        profile.silence.envelope = 0.01;
        profile.talking.envelope_slope_variance = Some(0.004);
        profile.breathing_out.envelope_pattern = vec![0.1, 0.2, 0.1];
        let json = profile.to_json().unwrap();
        assert_eq!(CalibrationProfile::from_json(&json).unwrap(), profile);
    }
}
