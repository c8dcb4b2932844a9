// Stage captures - finite-state consumers over the feature stream
//
// A capture is fed one FeatureFrame per poll tick and decides when its stage
// is done:
// - FixedWindowCapture: averages every frame inside a fixed window
// - BreathCapture: waits for a breath onset, follows it to its decay and
//   times it, falling back to documented defaults after a hard ceiling
//
// Captures never block and always finish: a fixed window ends with its
// window, a breath capture ends at the latest on its ceiling.

use crate::analysis::features::FeatureFrame;
use crate::calibration::state::SubProfile;
use crate::config::CalibrationConfig;

/// Envelope must exceed the silence reference by this factor to start a breath
pub const ONSET_FACTOR: f64 = 1.5;

/// Default sub-profile values used when no breath is captured
pub const DEFAULT_BREATH_ENVELOPE: f64 = 0.1;
pub const DEFAULT_BREATH_ZCR: f64 = 0.05;
pub const DEFAULT_BREATH_DURATION_MS: u64 = 4000;

/// How a finished stage produced its sub-profile
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// Computed from captured frames
    Measured(SubProfile),
    /// No usable breath before the ceiling; documented defaults
    TimedOut(SubProfile),
}

impl StageOutcome {
    pub fn profile(&self) -> &SubProfile {
        match self {
            StageOutcome::Measured(profile) | StageOutcome::TimedOut(profile) => profile,
        }
    }

    pub fn into_profile(self) -> SubProfile {
        match self {
            StageOutcome::Measured(profile) | StageOutcome::TimedOut(profile) => profile,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StageOutcome::TimedOut(_))
    }
}

/// Result of feeding one frame to a capture
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureStatus {
    /// Still running; progress through the stage (0-100)
    Capturing { percent: f64 },
    Finished(StageOutcome),
}

/// Averages frames over a fixed window
#[derive(Debug, Clone)]
pub struct FixedWindowCapture {
    start_ms: u64,
    window_ms: u64,
    with_slope_variance: bool,
    frames: Vec<FeatureFrame>,
}

impl FixedWindowCapture {
    /// Mean envelope, centroid and ZCR (silence stage)
    pub fn means(start_ms: u64, window_ms: u64) -> Self {
        Self {
            start_ms,
            window_ms,
            with_slope_variance: false,
            frames: Vec::new(),
        }
    }

    /// Means plus slope variance (talking stage)
    pub fn means_and_slope_variance(start_ms: u64, window_ms: u64) -> Self {
        Self {
            with_slope_variance: true,
            ..Self::means(start_ms, window_ms)
        }
    }

    /// Number of frames captured so far
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn consume(&mut self, frame: &FeatureFrame, now_ms: u64) -> CaptureStatus {
        if now_ms < self.start_ms {
            return CaptureStatus::Capturing { percent: 0.0 };
        }

        let elapsed = now_ms - self.start_ms;
        if elapsed < self.window_ms {
            self.frames.push(*frame);
            return CaptureStatus::Capturing {
                percent: elapsed as f64 / self.window_ms as f64 * 100.0,
            };
        }

        let profile = if self.with_slope_variance {
            SubProfile::mean_with_slope_variance(&self.frames)
        } else {
            SubProfile::mean_of(&self.frames)
        };
        CaptureStatus::Finished(StageOutcome::Measured(profile))
    }
}

/// Direction of the breath being captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreathDirection {
    In,
    Out,
}

impl BreathDirection {
    /// Fraction of the peak envelope below which the breath has ended
    pub fn decay_ratio(&self) -> f64 {
        match self {
            BreathDirection::In => 0.35,
            BreathDirection::Out => 0.30,
        }
    }

    /// Centroid of the fallback sub-profile
    pub fn default_centroid(&self) -> f64 {
        match self {
            BreathDirection::In => 250.0,
            BreathDirection::Out => 200.0,
        }
    }

    pub fn noun(&self) -> &'static str {
        match self {
            BreathDirection::In => "inhale",
            BreathDirection::Out => "exhale",
        }
    }
}

/// Times one breath from onset to decay
#[derive(Debug, Clone)]
pub struct BreathCapture {
    direction: BreathDirection,
    start_ms: u64,
    onset_threshold: f64,
    min_breath_ms: u64,
    max_wait_ms: u64,
    estimated_ms: u64,
    onset_ms: Option<u64>,
    peak: f64,
    frames: Vec<FeatureFrame>,
    pattern: Vec<f64>,
}

impl BreathCapture {
    /// # Arguments
    /// * `direction` - Inhale or exhale
    /// * `start_ms` - Start of the stage; the ceiling counts from here
    /// * `silence_envelope` - Calibrated noise floor
    /// * `config` - Ceiling and minimum breath length
    /// * `estimated_ms` - Expected breath length, for progress reporting
    pub fn new(
        direction: BreathDirection,
        start_ms: u64,
        silence_envelope: f64,
        config: &CalibrationConfig,
        estimated_ms: u64,
    ) -> Self {
        Self {
            direction,
            start_ms,
            onset_threshold: silence_envelope * ONSET_FACTOR,
            min_breath_ms: config.min_breath_ms,
            max_wait_ms: config.max_wait_ms,
            estimated_ms: estimated_ms.max(1),
            onset_ms: None,
            peak: 0.0,
            frames: Vec::new(),
            pattern: Vec::new(),
        }
    }

    pub fn direction(&self) -> BreathDirection {
        self.direction
    }

    pub fn onset_ms(&self) -> Option<u64> {
        self.onset_ms
    }

    /// Highest envelope seen since onset
    pub fn peak(&self) -> f64 {
        self.peak
    }

    pub fn consume(&mut self, frame: &FeatureFrame, now_ms: u64) -> CaptureStatus {
        if self.onset_ms.is_none() && frame.envelope > self.onset_threshold {
            log::debug!(
                "[Calibration] {} onset at {}ms (envelope {:.4})",
                self.direction.noun(),
                now_ms,
                frame.envelope
            );
            self.onset_ms = Some(now_ms);
        }

        if let Some(onset) = self.onset_ms {
            self.frames.push(*frame);
            self.pattern.push(frame.envelope);
            self.peak = self.peak.max(frame.envelope);

            let since_onset = now_ms.saturating_sub(onset);
            let decayed = frame.envelope < self.peak * self.direction.decay_ratio();
            if decayed && since_onset >= self.min_breath_ms {
                return CaptureStatus::Finished(StageOutcome::Measured(SubProfile {
                    duration_ms: Some(since_onset),
                    envelope_pattern: std::mem::take(&mut self.pattern),
                    ..SubProfile::mean_of(&self.frames)
                }));
            }
        }

        if now_ms.saturating_sub(self.start_ms) >= self.max_wait_ms {
            log::warn!(
                "[Calibration] No complete {} within {}ms, using defaults",
                self.direction.noun(),
                self.max_wait_ms
            );
            return CaptureStatus::Finished(StageOutcome::TimedOut(self.default_profile()));
        }

        let percent = match self.onset_ms {
            Some(onset) => {
                (now_ms.saturating_sub(onset) as f64 / self.estimated_ms as f64 * 100.0).min(99.0)
            }
            None => 0.0,
        };
        CaptureStatus::Capturing { percent }
    }

    /// Fallback sub-profile after the ceiling
    pub fn default_profile(&self) -> SubProfile {
        SubProfile {
            envelope: if self.peak > 0.0 {
                self.peak
            } else {
                DEFAULT_BREATH_ENVELOPE
            },
            spectral_centroid: self.direction.default_centroid(),
            zero_crossing_rate: DEFAULT_BREATH_ZCR,
            envelope_slope_variance: None,
            duration_ms: Some(DEFAULT_BREATH_DURATION_MS),
            envelope_pattern: Vec::new(),
        }
    }
}
