// Types module - Data structures for breath features
//
// This module defines the per-frame feature record shared by the scorer,
// the talking classifier, the phase detector and calibration.

use serde::{Deserialize, Serialize};

/// Features extracted from one analysis frame
///
/// A frame is immutable once it has been scored and pushed into the
/// feature history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureFrame {
    /// Smoothed RMS of the breath band (80-600 Hz), always >= 0
    pub envelope: f64,

    /// Difference between this envelope and the previous one
    ///
    /// Positive while a breath builds, negative while it fades.
    pub envelope_slope: f64,

    /// Magnitude-weighted mean frequency of the breath band in Hz
    ///
    /// 0.0 when the band carries no energy.
    pub spectral_centroid: f64,

    /// Fraction of adjacent sample pairs that change sign (0.0 to 1.0)
    pub zero_crossing_rate: f64,

    /// Likelihood that the frame is breathing (0.0 to 1.0)
    pub breath_score: f64,
}

impl FeatureFrame {
    /// Frame carrying raw measurements only (breath score not yet computed)
    pub fn unscored(
        envelope: f64,
        envelope_slope: f64,
        spectral_centroid: f64,
        zero_crossing_rate: f64,
    ) -> Self {
        Self {
            envelope,
            envelope_slope,
            spectral_centroid,
            zero_crossing_rate,
            breath_score: 0.0,
        }
    }

    /// Copy of this frame with the breath score filled in
    pub fn with_score(self, breath_score: f64) -> Self {
        Self {
            breath_score,
            ..self
        }
    }
}
