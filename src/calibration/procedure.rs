// CalibrationProcedure - four-stage calibration state machine
//
// The procedure owns the profile under construction and the capture of the
// current stage. A driver runs each stage as:
// 1. narrate `stage.prompt()`
// 2. `begin_capture(now)`
// 3. feed one frame per poll tick to `consume` until it reports Finished
// 4. narrate `completion_prompt`, then `advance()`
//
// Each finished stage writes its sub-profile exactly once. After the last
// stage `finish()` hands out the completed profile.

use crate::analysis::features::FeatureFrame;
use crate::calibration::capture::{
    BreathCapture, BreathDirection, CaptureStatus, FixedWindowCapture, StageOutcome,
};
use crate::calibration::progress::{CalibrationProgress, CalibrationStage};
use crate::calibration::state::CalibrationProfile;
use crate::calibration::capture::DEFAULT_BREATH_DURATION_MS;
use crate::config::{AppConfig, CalibrationConfig};
use crate::error::CalibrationError;

/// Capture running for the current stage
#[derive(Debug, Clone)]
pub enum StageCapture {
    Window(FixedWindowCapture),
    Breath(BreathCapture),
}

impl StageCapture {
    pub fn consume(&mut self, frame: &FeatureFrame, now_ms: u64) -> CaptureStatus {
        match self {
            StageCapture::Window(capture) => capture.consume(frame, now_ms),
            StageCapture::Breath(capture) => capture.consume(frame, now_ms),
        }
    }
}

/// CalibrationProcedure manages the stage workflow
pub struct CalibrationProcedure {
    calibration: CalibrationConfig,
    target_inhale_ms: u64,
    stage: Option<CalibrationStage>,
    capture: Option<StageCapture>,
    last_progress: Option<CalibrationProgress>,
    profile: CalibrationProfile,
}

impl CalibrationProcedure {
    /// Create a procedure positioned at the first stage
    pub fn new(config: &AppConfig) -> Self {
        Self {
            calibration: config.calibration.clone(),
            target_inhale_ms: config.session.target_inhale_ms,
            stage: Some(CalibrationStage::first()),
            capture: None,
            last_progress: None,
            profile: CalibrationProfile::default(),
        }
    }

    /// Stage currently running, or None once every stage has finished
    pub fn current_stage(&self) -> Option<CalibrationStage> {
        self.stage
    }

    /// Profile built so far (finished stages only)
    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.stage.is_none()
    }

    pub fn last_progress(&self) -> Option<CalibrationProgress> {
        self.last_progress
    }

    /// Start capturing the current stage
    ///
    /// `prompt_done_ms` is when the stage prompt finished. Fixed windows open
    /// after the settle delay; breath stages count their ceiling from here.
    ///
    /// # Errors
    /// * `AlreadyInProgress` - A capture is already running
    /// * `NotComplete` - Every stage has already finished
    pub fn begin_capture(&mut self, prompt_done_ms: u64) -> Result<(), CalibrationError> {
        if self.capture.is_some() {
            return Err(CalibrationError::AlreadyInProgress);
        }
        let stage = self.stage.ok_or(CalibrationError::NotComplete)?;
        let window_start = prompt_done_ms + self.calibration.settle_ms;
        let window_ms = self.calibration.duration_ms;

        let capture = match stage {
            CalibrationStage::Silence => {
                StageCapture::Window(FixedWindowCapture::means(window_start, window_ms))
            }
            CalibrationStage::Talking => StageCapture::Window(
                FixedWindowCapture::means_and_slope_variance(window_start, window_ms),
            ),
            CalibrationStage::BreathingIn => StageCapture::Breath(BreathCapture::new(
                BreathDirection::In,
                prompt_done_ms,
                self.profile.silence.envelope,
                &self.calibration,
                self.target_inhale_ms,
            )),
            CalibrationStage::BreathingOut => {
                let estimated = self
                    .profile
                    .breathing_in
                    .duration_ms
                    .unwrap_or(DEFAULT_BREATH_DURATION_MS);
                StageCapture::Breath(BreathCapture::new(
                    BreathDirection::Out,
                    prompt_done_ms,
                    self.profile.silence.envelope,
                    &self.calibration,
                    estimated,
                ))
            }
        };

        log::info!("[Calibration] Capturing {}", stage.display_name());
        self.capture = Some(capture);
        self.last_progress = Some(CalibrationProgress::new(stage, 0.0));
        Ok(())
    }

    /// Feed one frame to the running capture
    ///
    /// A finished capture stores its sub-profile in the profile.
    ///
    /// # Returns
    /// * `None` - No capture is running
    /// * `Some(status)` - Capture progress or the finished outcome
    pub fn consume(&mut self, frame: &FeatureFrame, now_ms: u64) -> Option<CaptureStatus> {
        let stage = self.stage?;
        let capture = self.capture.as_mut()?;
        let status = capture.consume(frame, now_ms);

        match &status {
            CaptureStatus::Capturing { percent } => {
                self.last_progress = Some(CalibrationProgress::new(stage, *percent));
            }
            CaptureStatus::Finished(outcome) => {
                self.store(stage, outcome);
                self.capture = None;
                self.last_progress = Some(CalibrationProgress::new(stage, 100.0));
            }
        }
        Some(status)
    }

    fn store(&mut self, stage: CalibrationStage, outcome: &StageOutcome) {
        let sub = outcome.profile().clone();
        log::info!(
            "[Calibration] {} done: envelope {:.4}, centroid {:.0} Hz, zcr {:.3}{}",
            stage.display_name(),
            sub.envelope,
            sub.spectral_centroid,
            sub.zero_crossing_rate,
            if outcome.is_timeout() { " (defaults)" } else { "" }
        );
        match stage {
            CalibrationStage::Silence => self.profile.silence = sub,
            CalibrationStage::Talking => self.profile.talking = sub,
            CalibrationStage::BreathingIn => self.profile.breathing_in = sub,
            CalibrationStage::BreathingOut => self.profile.breathing_out = sub,
        }
    }

    /// Move to the next stage once the current capture has finished
    ///
    /// # Returns
    /// The new current stage, or None when calibration is complete
    pub fn advance(&mut self) -> Option<CalibrationStage> {
        if self.capture.is_some() {
            return self.stage;
        }
        self.stage = self.stage.and_then(|stage| stage.next());
        self.stage
    }

    /// Hand out the finished profile
    ///
    /// # Errors
    /// `NotComplete` while any stage is still pending
    pub fn finish(self) -> Result<CalibrationProfile, CalibrationError> {
        if !self.is_complete() {
            return Err(CalibrationError::NotComplete);
        }
        Ok(self.profile)
    }

    /// Drop all captured data and start over from the first stage
    pub fn reset(&mut self) {
        self.stage = Some(CalibrationStage::first());
        self.capture = None;
        self.last_progress = None;
        self.profile.reset();
    }
}

/// Narration closing a finished stage
pub fn completion_prompt(stage: CalibrationStage, outcome: &StageOutcome) -> String {
    match (stage, outcome) {
        (CalibrationStage::Silence, _) => "Good. Silence calibrated.".to_string(),
        (CalibrationStage::Talking, _) => "Thank you. Now let's measure your breathing.".to_string(),
        (CalibrationStage::BreathingIn, StageOutcome::Measured(sub)) => format!(
            "Good. Your inhale was {:.1} seconds.",
            sub.duration_secs().unwrap_or_default()
        ),
        (CalibrationStage::BreathingIn, StageOutcome::TimedOut(_)) => {
            "Using default timing. Let's continue.".to_string()
        }
        (CalibrationStage::BreathingOut, StageOutcome::Measured(sub)) => format!(
            "Your exhale was {:.1} seconds. Calibration complete.",
            sub.duration_secs().unwrap_or_default()
        ),
        (CalibrationStage::BreathingOut, StageOutcome::TimedOut(_)) => {
            "Using default timing. Calibration complete.".to_string()
        }
    }
}

#[cfg(test)]
#[path = "procedure_tests.rs"]
mod tests;
