//! BreathEngine: the facade front-ends drive.
//!
//! Owns the audio input, scheduler, analyzer, narrator and display (through
//! an [`EngineContext`]) plus the current calibration profile. Calibration,
//! guided sessions and live monitoring all run on the caller's thread; a
//! [`StopSignal`] obtained from [`BreathEngine::stop_signal`] ends any of
//! them from elsewhere.

use std::time::Duration;

use crate::audio::{AudioInput, InputState};
use crate::calibration::{CalibrationProfile, CalibrationReport};
use crate::config::AppConfig;
use crate::display::DisplaySink;
use crate::engine::calibrate::run_calibration;
use crate::engine::clock::Scheduler;
use crate::engine::context::EngineContext;
use crate::engine::stream::{FrameStream, StopSignal};
use crate::error::{log_audio_error, log_calibration_error, AudioError, CalibrationError};
use crate::narration::Narrator;
use crate::session::{SessionController, SessionSummary};

/// BreathEngine orchestrates calibration, sessions and monitoring.
pub struct BreathEngine {
    ctx: EngineContext,
}

impl BreathEngine {
    pub fn new(
        config: AppConfig,
        input: Box<dyn AudioInput>,
        scheduler: Box<dyn Scheduler>,
        narrator: Box<dyn Narrator>,
        display: Box<dyn DisplaySink>,
    ) -> Self {
        let stream = FrameStream::new(input, scheduler, &config);
        Self {
            ctx: EngineContext::new(config, stream, narrator, display),
        }
    }

    /// Share an existing stop signal instead of the engine's own
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.ctx.stop = stop;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.ctx.config
    }

    /// Open the audio input, resuming it if it starts suspended
    ///
    /// Failures are returned once and never retried; the caller may try
    /// again later.
    pub fn start_audio(&mut self) -> Result<(), AudioError> {
        let input = self.ctx.stream.input_mut();
        if input.state() == InputState::Stopped {
            if let Err(err) = input.start() {
                log_audio_error(&err, "start_audio");
                return Err(err);
            }
        }
        if input.state() == InputState::Suspended {
            if let Err(err) = input.resume() {
                log_audio_error(&err, "start_audio");
                return Err(err);
            }
        }
        log::info!(
            "[BreathEngine] Audio running at {} Hz",
            self.ctx.stream.input().sample_rate()
        );
        Ok(())
    }

    pub fn stop_audio(&mut self) -> Result<(), AudioError> {
        self.ctx.stream.input_mut().stop()?;
        log::info!("[BreathEngine] Audio stopped");
        Ok(())
    }

    pub fn audio_state(&self) -> InputState {
        self.ctx.stream.input().state()
    }

    /// Run the four calibration stages
    ///
    /// On success the measured profile becomes the engine's profile. A
    /// cancelled calibration leaves the previous profile in place.
    pub fn calibrate(&mut self) -> Result<CalibrationReport, CalibrationError> {
        self.prepare_flow();
        let span = tracing::info_span!("calibration");
        let _guard = span.enter();
        run_calibration(&mut self.ctx)
    }

    /// Run a guided session with the current profile
    ///
    /// Every call starts again from the calibration-derived pacing.
    ///
    /// # Errors
    /// `NotComplete` until silence and talking have been calibrated
    pub fn run_session(&mut self) -> Result<SessionSummary, CalibrationError> {
        let profile = self.ctx.stream.profile().clone();
        if !profile.is_calibrated() || !profile.has_talking_reference() {
            let err = CalibrationError::NotComplete;
            log_calibration_error(&err, "run_session");
            return Err(err);
        }
        self.prepare_flow();
        let mut controller = SessionController::new(&self.ctx.config.session, &profile);
        Ok(controller.run(&mut self.ctx))
    }

    /// Sample at the display refresh rate for `duration`
    ///
    /// Debug metrics go to the display every frame.
    ///
    /// # Returns
    /// Number of frames analysed
    pub fn monitor(&mut self, duration: Duration) -> usize {
        self.prepare_flow();
        let period = self.ctx.config.audio.refresh_period();
        let deadline = self.ctx.stream.now() + duration;
        let mut frames = 0;
        while self.ctx.stream.now() < deadline {
            let frame = self.ctx.sample();
            frames += 1;
            if let Some(transition) = frame.transition {
                log::debug!(
                    "[BreathEngine] {} -> {} at {} ms",
                    transition.from.label(),
                    transition.to.label(),
                    transition.at_ms
                );
            }
            if !self.ctx.tick(period) {
                break;
            }
        }
        frames
    }

    /// Clear every sub-profile; sessions are refused until recalibrated
    pub fn reset_calibration(&mut self) {
        let mut profile = self.ctx.stream.profile().clone();
        profile.reset();
        self.ctx.stream.set_profile(profile);
        log::info!("[BreathEngine] Calibration reset");
    }

    pub fn profile(&self) -> &CalibrationProfile {
        self.ctx.stream.profile()
    }

    /// Load a previously saved profile
    pub fn set_profile(&mut self, profile: CalibrationProfile) {
        self.ctx.stream.set_profile(profile);
    }

    /// Handle that stops the flow currently running
    pub fn stop_signal(&self) -> StopSignal {
        self.ctx.stop.clone()
    }

    fn prepare_flow(&mut self) {
        self.ctx.stop.clear();
        self.ctx.stream.reset_detectors();
        if self.audio_state() == InputState::Suspended {
            if let Err(err) = self.ctx.stream.input_mut().resume() {
                log_audio_error(&err, "prepare_flow");
            }
        }
        if self.audio_state() != InputState::Running {
            log::warn!("[BreathEngine] Audio input not running; analysing silence");
        }
    }
}

#[cfg(test)]
mod tests;
