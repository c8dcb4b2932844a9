use serde::{Deserialize, Serialize};

use super::features::FeatureFrame;
use crate::calibration::CalibrationProfile;

/// Slope magnitude separating a rising/falling envelope from a flat one
pub const SLOPE_THRESHOLD: f64 = 0.003;

/// Consecutive consistent proposals needed before a phase change commits
pub const PHASE_STABLE_FRAMES: u32 = 3;

/// Silence reference used before silence has been calibrated
pub const DEFAULT_SILENCE_REFERENCE: f64 = 0.01;

/// Envelope must exceed the silence reference by this factor to be active
const ACTIVE_FACTOR: f64 = 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreathPhase {
    #[default]
    Idle,
    Rising,
    Falling,
}

impl BreathPhase {
    pub fn label(&self) -> &'static str {
        match self {
            BreathPhase::Idle => "idle",
            BreathPhase::Rising => "rising",
            BreathPhase::Falling => "falling",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseTransition {
    pub from: BreathPhase,
    pub to: BreathPhase,
    pub at_ms: u64,
}

/// Breath phase tracker with hysteresis
#[derive(Debug, Default)]
pub struct PhaseDetector {
    phase: BreathPhase,
    pending: Option<BreathPhase>,
    pending_frames: u32,
    committed_at_ms: u64,
    breath_start_ms: Option<u64>,
    last_breath_duration_ms: Option<u64>,
    confidence: f64,
}

impl PhaseDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset internal state (e.g. between calibration and session)
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn phase(&self) -> BreathPhase {
        self.phase
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Time of the last committed transition
    pub fn committed_at_ms(&self) -> u64 {
        self.committed_at_ms
    }

    /// Duration of the last complete breath (rise through return to idle)
    pub fn last_breath_duration_ms(&self) -> Option<u64> {
        self.last_breath_duration_ms
    }

    /// Phase suggested by a single frame, before hysteresis
    pub fn propose(&self, frame: &FeatureFrame, profile: &CalibrationProfile) -> BreathPhase {
        let silence = if profile.silence.envelope != 0.0 {
            profile.silence.envelope
        } else {
            DEFAULT_SILENCE_REFERENCE
        };

        if frame.envelope <= silence * ACTIVE_FACTOR {
            BreathPhase::Idle
        } else if frame.envelope_slope > SLOPE_THRESHOLD {
            BreathPhase::Rising
        } else if frame.envelope_slope < -SLOPE_THRESHOLD {
            BreathPhase::Falling
        } else {
            self.phase
        }
    }

    /// Feed one scored frame
    ///
    /// # Returns
    /// The committed transition, if this frame completed one
    pub fn update(
        &mut self,
        frame: &FeatureFrame,
        profile: &CalibrationProfile,
        now_ms: u64,
    ) -> Option<PhaseTransition> {
        self.confidence = frame.breath_score;
        let proposed = self.propose(frame, profile);

        if proposed == self.phase {
            self.pending = None;
            self.pending_frames = 0;
            return None;
        }

        if self.pending == Some(proposed) {
            self.pending_frames += 1;
        } else {
            self.pending = Some(proposed);
            self.pending_frames = 1;
        }

        if self.pending_frames < PHASE_STABLE_FRAMES {
            return None;
        }

        let transition = PhaseTransition {
            from: self.phase,
            to: proposed,
            at_ms: now_ms,
        };
        self.commit(transition);
        Some(transition)
    }

    fn commit(&mut self, transition: PhaseTransition) {
        match (transition.from, transition.to) {
            (BreathPhase::Idle, BreathPhase::Rising) => {
                self.breath_start_ms = Some(transition.at_ms);
            }
            (BreathPhase::Falling, BreathPhase::Idle) => {
                if let Some(start) = self.breath_start_ms.take() {
                    self.last_breath_duration_ms = Some(transition.at_ms.saturating_sub(start));
                }
            }
            _ => {}
        }

        log::debug!(
            "[PhaseDetector] {} -> {} at {}ms",
            transition.from.label(),
            transition.to.label(),
            transition.at_ms
        );
        self.phase = transition.to;
        self.committed_at_ms = transition.at_ms;
        self.pending = None;
        self.pending_frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::SubProfile;

    fn profile() -> CalibrationProfile {
        CalibrationProfile {
            silence: SubProfile {
                envelope: 0.02,
                ..SubProfile::default()
            },
            ..CalibrationProfile::default()
        }
    }

    fn frame(envelope: f64, slope: f64) -> FeatureFrame {
        FeatureFrame::unscored(envelope, slope, 0.0, 0.0).with_score(0.4)
    }

    fn feed(detector: &mut PhaseDetector, f: FeatureFrame, times: u32, start_ms: u64) -> Vec<PhaseTransition> {
        (0..times)
            .filter_map(|i| detector.update(&f, &profile(), start_ms + i as u64 * 50))
            .collect()
    }

    #[test]
    fn test_starts_idle() {
        let detector = PhaseDetector::new();
        assert_eq!(detector.phase(), BreathPhase::Idle);
        assert_eq!(detector.last_breath_duration_ms(), None);
    }

    #[test]
    fn test_commit_needs_three_frames() {
        let mut detector = PhaseDetector::new();
        let rising = frame(0.1, 0.01);

        assert!(detector.update(&rising, &profile(), 0).is_none());
        assert!(detector.update(&rising, &profile(), 50).is_none());
        let transition = detector.update(&rising, &profile(), 100).unwrap();

        assert_eq!(transition.from, BreathPhase::Idle);
        assert_eq!(transition.to, BreathPhase::Rising);
        assert_eq!(detector.phase(), BreathPhase::Rising);
        assert_eq!(detector.committed_at_ms(), 100);
    }

    #[test]
    fn test_matching_proposal_resets_pending() {
        let mut detector = PhaseDetector::new();
        let rising = frame(0.1, 0.01);
        let quiet = frame(0.01, 0.0);

        detector.update(&rising, &profile(), 0);
        detector.update(&rising, &profile(), 50);
        detector.update(&quiet, &profile(), 100);
        assert!(detector.update(&rising, &profile(), 150).is_none());
        assert!(detector.update(&rising, &profile(), 200).is_none());
        assert!(detector.update(&rising, &profile(), 250).is_some());
    }

    #[test]
    fn test_alternating_proposals_never_commit() {
        let mut detector = PhaseDetector::new();
        for i in 0..10 {
            let slope = if i % 2 == 0 { 0.01 } else { -0.01 };
            assert!(detector.update(&frame(0.1, slope), &profile(), i * 50).is_none());
        }
        assert_eq!(detector.phase(), BreathPhase::Idle);
    }

    #[test]
    fn test_flat_active_envelope_keeps_phase() {
        let mut detector = PhaseDetector::new();
        feed(&mut detector, frame(0.1, 0.01), 3, 0);
        assert_eq!(detector.phase(), BreathPhase::Rising);

        let transitions = feed(&mut detector, frame(0.1, 0.001), 10, 150);
        assert!(transitions.is_empty());
        assert_eq!(detector.phase(), BreathPhase::Rising);
    }

    #[test]
    fn test_full_breath_records_duration() {
        let mut detector = PhaseDetector::new();
        let mut transitions = feed(&mut detector, frame(0.1, 0.01), 20, 0);
        transitions.extend(feed(&mut detector, frame(0.1, -0.01), 20, 1000));
        transitions.extend(feed(&mut detector, frame(0.01, 0.0), 5, 2000));

        let phases: Vec<BreathPhase> = transitions.iter().map(|t| t.to).collect();
        assert_eq!(
            phases,
            vec![BreathPhase::Rising, BreathPhase::Falling, BreathPhase::Idle]
        );
        // rising committed at 100ms, idle committed at 2100ms
        assert_eq!(detector.last_breath_duration_ms(), Some(2000));
    }

    #[test]
    fn test_uncalibrated_uses_default_silence() {
        let detector = PhaseDetector::new();
        let uncalibrated = CalibrationProfile::default();
        // 2 * 0.01 = 0.02
        assert_eq!(detector.propose(&frame(0.015, 0.01), &uncalibrated), BreathPhase::Idle);
        assert_eq!(detector.propose(&frame(0.03, 0.01), &uncalibrated), BreathPhase::Rising);
    }

    #[test]
    fn test_confidence_tracks_breath_score() {
        let mut detector = PhaseDetector::new();
        detector.update(&frame(0.1, 0.0), &profile(), 0);
        assert_eq!(detector.confidence(), 0.4);
    }
}
