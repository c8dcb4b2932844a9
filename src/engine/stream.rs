//! Pulls audio frames through the analyzer on the scheduler's clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::analysis::{AnalysisFrame, BreathAnalyzer};
use crate::audio::{AudioFrame, AudioInput};
use crate::calibration::CalibrationProfile;
use crate::config::AppConfig;
use crate::error::{log_audio_error, AudioError};
use crate::engine::clock::Scheduler;

/// Shared flag asking a running flow to stop
///
/// Clones observe the same flag. Flows check it at every tick and return
/// their partial result.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Re-arm before starting a new flow
    pub fn clear(&self) {
        self.stopped.store(false, Ordering::SeqCst);
    }
}

/// Audio input, clock and analyzer driven together
pub struct FrameStream {
    input: Box<dyn AudioInput>,
    scheduler: Box<dyn Scheduler>,
    analyzer: BreathAnalyzer,
    bins: usize,
    last: Option<AnalysisFrame>,
    read_errors: u64,
}

impl FrameStream {
    pub fn new(
        input: Box<dyn AudioInput>,
        scheduler: Box<dyn Scheduler>,
        config: &AppConfig,
    ) -> Self {
        Self {
            input,
            scheduler,
            analyzer: BreathAnalyzer::new(config),
            bins: config.audio.fft_size / 2,
            last: None,
            read_errors: 0,
        }
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn now_ms(&self) -> u64 {
        self.scheduler.now().as_millis() as u64
    }

    pub fn sleep(&mut self, duration: Duration) {
        self.scheduler.sleep(duration);
    }

    /// Read and analyse the frame at the current time
    ///
    /// A failed read is logged and analysed as silence so the flow keeps
    /// its cadence.
    pub fn sample(&mut self) -> AnalysisFrame {
        let now = self.scheduler.now();
        let audio = match self.input.read_frame(now) {
            Ok(frame) => frame,
            Err(err) => {
                self.note_read_error(&err);
                AudioFrame::silent(self.bins, self.input.sample_rate())
            }
        };
        let frame = self.analyzer.process(&audio, now.as_millis() as u64);
        self.last = Some(frame);
        frame
    }

    /// Sleep for `period`, then sample
    pub fn next_frame(&mut self, period: Duration) -> AnalysisFrame {
        self.scheduler.sleep(period);
        self.sample()
    }

    fn note_read_error(&mut self, err: &AudioError) {
        self.read_errors += 1;
        if self.read_errors == 1 || self.read_errors % 100 == 0 {
            log_audio_error(err, "FrameStream::sample");
            log::warn!(
                "[FrameStream] Substituting silence ({} failed reads)",
                self.read_errors
            );
        }
    }

    pub fn last_frame(&self) -> Option<&AnalysisFrame> {
        self.last.as_ref()
    }

    pub fn read_errors(&self) -> u64 {
        self.read_errors
    }

    pub fn input(&self) -> &dyn AudioInput {
        self.input.as_ref()
    }

    pub fn input_mut(&mut self) -> &mut dyn AudioInput {
        self.input.as_mut()
    }

    pub fn analyzer(&self) -> &BreathAnalyzer {
        &self.analyzer
    }

    pub fn profile(&self) -> &CalibrationProfile {
        self.analyzer.profile()
    }

    pub fn set_profile(&mut self, profile: CalibrationProfile) {
        self.analyzer.set_profile(profile);
    }

    pub fn reset_detectors(&mut self) {
        self.analyzer.reset_detectors();
    }
}
