// TalkingClassifier - speech detection with frame-count hysteresis
//
// Each frame is checked against four speech indicators derived from the
// talking reference. A frame showing at least three of them counts as a
// speech frame. Speech frames push a counter up, all other frames pull it
// down (never below zero), and talking is reported once the counter
// reaches TALKING_FRAMES_REQUIRED. Short consonant bursts therefore do not
// trigger the warning, and it clears gradually once speech stops.

use serde::Serialize;

use super::features::FeatureFrame;
use crate::calibration::CalibrationProfile;

/// Counter value at which talking is reported
pub const TALKING_FRAMES_REQUIRED: u32 = 5;

/// Indicators that must agree for a frame to count as speech
pub const INDICATORS_REQUIRED: usize = 3;

const ENVELOPE_FRACTION: f64 = 0.5;
const CENTROID_FRACTION: f64 = 0.6;
const ZCR_FRACTION: f64 = 0.5;
const SLOPE_VARIANCE_FRACTION: f64 = 0.3;

const DEFAULT_CENTROID: f64 = 400.0;
const DEFAULT_ZCR: f64 = 0.1;
const DEFAULT_SLOPE_VARIANCE: f64 = 0.005;

/// Which speech indicators fired for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TalkingIndicators {
    pub high_envelope: bool,
    pub high_centroid: bool,
    pub high_zero_crossing_rate: bool,
    pub high_slope_variance: bool,
}

impl TalkingIndicators {
    /// Evaluate the indicators against the talking reference
    pub fn evaluate(frame: &FeatureFrame, slope_variance: f64, profile: &CalibrationProfile) -> Self {
        let talking = &profile.talking;
        let centroid_ref = non_zero_or(talking.spectral_centroid, DEFAULT_CENTROID);
        let zcr_ref = non_zero_or(talking.zero_crossing_rate, DEFAULT_ZCR);
        let variance_ref = talking
            .envelope_slope_variance
            .filter(|v| *v != 0.0)
            .unwrap_or(DEFAULT_SLOPE_VARIANCE);

        Self {
            high_envelope: frame.envelope > talking.envelope * ENVELOPE_FRACTION,
            high_centroid: frame.spectral_centroid > centroid_ref * CENTROID_FRACTION,
            high_zero_crossing_rate: frame.zero_crossing_rate > zcr_ref * ZCR_FRACTION,
            high_slope_variance: slope_variance > variance_ref * SLOPE_VARIANCE_FRACTION,
        }
    }

    pub fn count(&self) -> usize {
        [
            self.high_envelope,
            self.high_centroid,
            self.high_zero_crossing_rate,
            self.high_slope_variance,
        ]
        .iter()
        .filter(|&&fired| fired)
        .count()
    }

    pub fn is_speech_frame(&self) -> bool {
        self.count() >= INDICATORS_REQUIRED
    }
}

/// Talking detector with hysteresis
#[derive(Debug, Default)]
pub struct TalkingClassifier {
    frame_count: u32,
}

impl TalkingClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one frame and update the hysteresis counter
    ///
    /// Without a talking reference this returns false and leaves the counter
    /// untouched.
    ///
    /// # Returns
    /// true while the user is considered to be talking
    pub fn update(
        &mut self,
        frame: &FeatureFrame,
        slope_variance: f64,
        profile: &CalibrationProfile,
    ) -> bool {
        if !profile.has_talking_reference() {
            return false;
        }

        if TalkingIndicators::evaluate(frame, slope_variance, profile).is_speech_frame() {
            self.frame_count = self.frame_count.saturating_add(1);
        } else {
            self.frame_count = self.frame_count.saturating_sub(1);
        }

        self.is_talking()
    }

    pub fn is_talking(&self) -> bool {
        self.frame_count >= TALKING_FRAMES_REQUIRED
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn reset(&mut self) {
        self.frame_count = 0;
    }
}

fn non_zero_or(value: f64, fallback: f64) -> f64 {
    if value != 0.0 {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
