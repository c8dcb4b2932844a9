// FeatureExtractor - per-frame breath features
//
// Turns one analyser frame (band magnitudes plus raw samples) into a scored
// FeatureFrame and appends it to the bounded feature history.
//
// Module organization:
// - types: Data structures (FeatureFrame)
// - fft: Analyser-style magnitude spectra (used by the audio inputs)
// - spectral: Breath-band RMS and centroid
// - temporal: Zero-crossing rate
// - mod.rs: Coordinator (FeatureExtractor)
//
// Per frame:
// 1. Band RMS over 80-600 Hz, smoothed with an exponential moving average
// 2. Envelope slope against the previous smoothed value
// 3. Spectral centroid of the same band
// 4. Zero-crossing rate of the time-domain block
// 5. Breath score, using the slope variance of the history plus this frame

mod fft;
mod spectral;
mod temporal;
mod types;

pub use fft::SpectrumAnalyser;
pub use spectral::{SpectralFeatures, BREATH_BAND_HIGH_HZ, BREATH_BAND_LOW_HZ};
pub use temporal::compute_zcr;
pub use types::FeatureFrame;

use super::history::FeatureHistory;
use super::scorer::{BreathScorer, ScoreBreakdown};
use crate::audio::AudioFrame;
use crate::calibration::CalibrationProfile;
use crate::config::{AudioConfig, ScoreWeights};

/// FeatureExtractor owns the envelope smoother, the history and the scorer
pub struct FeatureExtractor {
    fft_size: usize,
    smoothing_factor: f64,
    smoothed_envelope: f64,
    history: FeatureHistory,
    scorer: BreathScorer,
    last_slope_variance: f64,
    last_breakdown: ScoreBreakdown,
}

impl FeatureExtractor {
    pub fn new(config: &AudioConfig, weights: ScoreWeights) -> Self {
        Self {
            fft_size: config.fft_size,
            smoothing_factor: config.smoothing_factor,
            smoothed_envelope: 0.0,
            history: FeatureHistory::new(config.feature_history_length),
            scorer: BreathScorer::new(weights),
            last_slope_variance: 0.0,
            last_breakdown: ScoreBreakdown::default(),
        }
    }

    /// Extract, score and record the features of one frame
    ///
    /// # Arguments
    /// * `audio` - Magnitudes and samples of the current analyser frame
    /// * `profile` - Calibration references for scoring
    ///
    /// # Returns
    /// The scored frame (identical to the one pushed into the history)
    pub fn extract(&mut self, audio: &AudioFrame, profile: &CalibrationProfile) -> FeatureFrame {
        let spectral = SpectralFeatures::new(audio.sample_rate, self.fft_size);

        let rms = spectral.compute_band_rms(&audio.magnitudes);
        let previous = self.smoothed_envelope;
        let envelope = self.smoothing_factor * rms + (1.0 - self.smoothing_factor) * previous;
        self.smoothed_envelope = envelope;

        let raw = FeatureFrame::unscored(
            envelope,
            envelope - previous,
            spectral.compute_centroid(&audio.magnitudes),
            compute_zcr(&audio.samples),
        );

        let slope_variance = self.history.slope_variance_with(raw.envelope_slope);
        let breakdown = self.scorer.breakdown(&raw, slope_variance, profile);
        let frame = raw.with_score(breakdown.total);

        self.history.push(frame);
        self.last_slope_variance = slope_variance;
        self.last_breakdown = breakdown;
        frame
    }

    pub fn history(&self) -> &FeatureHistory {
        &self.history
    }

    /// Slope variance used to score the most recent frame
    pub fn last_slope_variance(&self) -> f64 {
        self.last_slope_variance
    }

    /// Score contributions of the most recent frame
    pub fn last_breakdown(&self) -> &ScoreBreakdown {
        &self.last_breakdown
    }

    /// Drop the history and the envelope memory
    pub fn reset(&mut self) {
        self.smoothed_envelope = 0.0;
        self.history.clear();
        self.last_slope_variance = 0.0;
        self.last_breakdown = ScoreBreakdown::default();
    }
}
