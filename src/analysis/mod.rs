// Analysis module - per-frame breath analysis pipeline
//
// Pipeline: FeatureExtractor (envelope, slope, centroid, ZCR, breath score)
//           → TalkingClassifier → PhaseDetector
// Output: AnalysisFrame, consumed by calibration, the session controller and
// the debug display.
//
// The analyzer reads a CalibrationProfile snapshot. Calibration swaps in a
// new snapshot after each stage; a session never changes it.

use serde::Serialize;

use crate::audio::AudioFrame;
use crate::calibration::CalibrationProfile;
use crate::config::AppConfig;

pub mod classifier;
pub mod features;
pub mod history;
pub mod phase;
pub mod scorer;

use classifier::TalkingClassifier;
use features::{FeatureExtractor, FeatureFrame};
use phase::{BreathPhase, PhaseDetector, PhaseTransition};

/// Everything known about one analysis tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisFrame {
    /// Scheduler time of the tick
    pub timestamp_ms: u64,
    pub features: FeatureFrame,
    /// Variance of recent envelope slopes, this frame included
    pub slope_variance: f64,
    /// Talking classifier verdict after this frame
    pub talking: bool,
    /// Committed breath phase after this frame
    pub phase: BreathPhase,
    /// Phase change committed by this frame, if any
    pub transition: Option<PhaseTransition>,
}

/// Runs the full analysis pipeline against a calibration profile
pub struct BreathAnalyzer {
    extractor: FeatureExtractor,
    talking: TalkingClassifier,
    phase: PhaseDetector,
    profile: CalibrationProfile,
}

impl BreathAnalyzer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            extractor: FeatureExtractor::new(&config.audio, config.weights),
            talking: TalkingClassifier::new(),
            phase: PhaseDetector::new(),
            profile: CalibrationProfile::default(),
        }
    }

    /// Analyse one frame captured at `now_ms`
    pub fn process(&mut self, audio: &AudioFrame, now_ms: u64) -> AnalysisFrame {
        let features = self.extractor.extract(audio, &self.profile);
        let slope_variance = self.extractor.last_slope_variance();
        let talking = self.talking.update(&features, slope_variance, &self.profile);
        let transition = self.phase.update(&features, &self.profile, now_ms);

        AnalysisFrame {
            timestamp_ms: now_ms,
            features,
            slope_variance,
            talking,
            phase: self.phase.phase(),
            transition,
        }
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    /// Replace the calibration snapshot used for scoring
    pub fn set_profile(&mut self, profile: CalibrationProfile) {
        self.profile = profile;
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn phase_detector(&self) -> &PhaseDetector {
        &self.phase
    }

    pub fn talking_classifier(&self) -> &TalkingClassifier {
        &self.talking
    }

    /// Clear detector state while keeping the profile
    pub fn reset_detectors(&mut self) {
        self.extractor.reset();
        self.talking.reset();
        self.phase.reset();
    }
}
