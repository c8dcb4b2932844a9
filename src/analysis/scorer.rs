//! Breath-likelihood scoring
//!
//! A weighted sum of four evidence terms, each in [0, 1] before weighting:
//!
//! - envelope: louder than silence, quieter than speech, scaled by the
//!   calibrated breath envelope
//! - envelope slope: breath envelopes change smoothly, speech jitters
//! - spectral centroid: breath noise sits lower than the talking centroid
//! - zero-crossing rate: breath crosses zero less often than speech
//!
//! Nothing is scored until silence has been calibrated.

use serde::Serialize;

use super::features::FeatureFrame;
use crate::calibration::CalibrationProfile;
use crate::config::ScoreWeights;

/// Envelope must exceed silence by this factor to count as breath
pub const SILENCE_MARGIN: f64 = 1.3;
/// Envelope must stay below this fraction of talking to count as breath
pub const TALKING_CEILING: f64 = 0.8;
/// Keeps the envelope ratio finite when breath references are zero
const ENVELOPE_EPSILON: f64 = 0.01;

/// Fallback talking references for an incomplete profile
pub const DEFAULT_TALKING_SLOPE_VARIANCE: f64 = 0.01;
pub const DEFAULT_TALKING_CENTROID: f64 = 500.0;
pub const DEFAULT_TALKING_ZCR: f64 = 0.15;

/// Fallback breath-band references
pub const DEFAULT_BREATH_CENTROID: f64 = 300.0;
pub const DEFAULT_BREATH_ZCR: f64 = 0.05;

/// Weighted contribution of each term, plus diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub envelope: f64,
    pub envelope_slope: f64,
    pub spectral_centroid: f64,
    pub zero_crossing_rate: f64,
    /// Breath-band centroid reference (diagnostic only, not scored)
    pub breath_centroid_reference: f64,
    /// Breath ZCR reference (diagnostic only, not scored)
    pub breath_zcr_reference: f64,
    /// Final score in [0, 1]
    pub total: f64,
}

/// Scores feature frames against a calibration profile
#[derive(Debug, Clone, Copy)]
pub struct BreathScorer {
    weights: ScoreWeights,
}

impl BreathScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Breath likelihood of `frame` in [0, 1]
    ///
    /// # Arguments
    /// * `frame` - Raw features (its `breath_score` field is ignored)
    /// * `slope_variance` - Variance of recent slopes, current frame included
    /// * `profile` - Calibration references
    pub fn score(&self, frame: &FeatureFrame, slope_variance: f64, profile: &CalibrationProfile) -> f64 {
        self.breakdown(frame, slope_variance, profile).total
    }

    /// Score with per-term contributions
    pub fn breakdown(
        &self,
        frame: &FeatureFrame,
        slope_variance: f64,
        profile: &CalibrationProfile,
    ) -> ScoreBreakdown {
        if !profile.is_calibrated() {
            return ScoreBreakdown::default();
        }

        let silence = &profile.silence;
        let talking = &profile.talking;
        let mut breakdown = ScoreBreakdown::default();

        let env = frame.envelope;
        if env > silence.envelope * SILENCE_MARGIN && env < talking.envelope * TALKING_CEILING {
            let reference = profile.breath_envelope_reference() + ENVELOPE_EPSILON;
            breakdown.envelope = self.weights.envelope * (env / reference).min(1.0);
        }

        let talking_variance = talking
            .envelope_slope_variance
            .filter(|v| *v > 0.0)
            .unwrap_or(DEFAULT_TALKING_SLOPE_VARIANCE);
        breakdown.envelope_slope =
            self.weights.envelope_slope * (1.0 - slope_variance / talking_variance).max(0.0);

        let talking_centroid = positive_or(talking.spectral_centroid, DEFAULT_TALKING_CENTROID);
        let centroid = frame.spectral_centroid;
        if centroid > 0.0 && centroid < talking_centroid {
            breakdown.spectral_centroid =
                self.weights.spectral_centroid * (1.0 - centroid / talking_centroid).max(0.0);
        }

        let talking_zcr = positive_or(talking.zero_crossing_rate, DEFAULT_TALKING_ZCR);
        let zcr = frame.zero_crossing_rate;
        if zcr < talking_zcr {
            breakdown.zero_crossing_rate =
                self.weights.zero_crossing_rate * (1.0 - zcr / talking_zcr).max(0.0);
        }

        // TODO: decide whether the breath-band references should feed the
        // centroid and ZCR terms; they are reported but not scored.
        breakdown.breath_centroid_reference = positive_or(
            profile
                .breathing_in
                .spectral_centroid
                .max(profile.breathing_out.spectral_centroid),
            DEFAULT_BREATH_CENTROID,
        );
        breakdown.breath_zcr_reference = positive_or(
            profile
                .breathing_in
                .zero_crossing_rate
                .max(profile.breathing_out.zero_crossing_rate),
            DEFAULT_BREATH_ZCR,
        );

        let total = breakdown.envelope
            + breakdown.envelope_slope
            + breakdown.spectral_centroid
            + breakdown.zero_crossing_rate;
        breakdown.total = if total.is_finite() {
            total.clamp(0.0, 1.0)
        } else {
            0.0
        };
        breakdown
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
#[path = "scorer_tests.rs"]
mod tests;
