//! Everything a running flow (calibration or session) drives.
//!
//! Flows are single-threaded polling loops over an [`EngineContext`]: sample
//! a frame, update state, push display updates, sleep one period. Waiting on
//! narration and timed pauses also keep sampling, so the analyzer never
//! misses frames.

use std::time::Duration;

use crate::analysis::AnalysisFrame;
use crate::config::AppConfig;
use crate::display::{DebugMetrics, DisplaySink, DisplayUpdate};
use crate::engine::stream::{FrameStream, StopSignal};
use crate::narration::{estimated_duration, Completion, Narrator};

/// Cadence at which narration completion is polled
pub const NARRATION_POLL_MS: u64 = 50;

pub struct EngineContext {
    pub config: AppConfig,
    pub stream: FrameStream,
    pub narrator: Box<dyn Narrator>,
    pub display: Box<dyn DisplaySink>,
    pub stop: StopSignal,
}

impl EngineContext {
    pub fn new(
        config: AppConfig,
        stream: FrameStream,
        narrator: Box<dyn Narrator>,
        display: Box<dyn DisplaySink>,
    ) -> Self {
        Self {
            config,
            stream,
            narrator,
            display,
            stop: StopSignal::new(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.stream.now_ms()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Analyse the frame at the current time and publish its debug metrics
    pub fn sample(&mut self) -> AnalysisFrame {
        let frame = self.stream.sample();
        self.display
            .show(DisplayUpdate::Debug(DebugMetrics::from(&frame)));
        frame
    }

    /// Sleep one period; false once a stop was requested
    pub fn tick(&mut self, period: Duration) -> bool {
        if self.is_stopped() {
            return false;
        }
        self.stream.sleep(period);
        !self.is_stopped()
    }

    /// Keep sampling for `duration`
    ///
    /// # Returns
    /// false if stopped before the time elapsed
    pub fn wait(&mut self, duration: Duration) -> bool {
        let period = self.config.calibration.poll_period();
        let deadline = self.stream.now() + duration;
        loop {
            if self.is_stopped() {
                return false;
            }
            let now = self.stream.now();
            if now >= deadline {
                return true;
            }
            self.sample();
            self.stream.sleep(period.min(deadline - now));
        }
    }

    /// Speak `text` and wait until the narrator finishes
    ///
    /// The wait is bounded by the estimated speaking time, so a narrator
    /// that never completes delays the flow but never stalls it.
    ///
    /// # Returns
    /// false if stopped while waiting
    pub fn narrate(&mut self, text: &str) -> bool {
        if self.is_stopped() {
            return false;
        }
        self.show(DisplayUpdate::Instruction(text.to_string()));
        let (done, handle) = Completion::new();
        self.narrator.speak(text, done);

        let timeout = estimated_duration(text);
        let period = Duration::from_millis(NARRATION_POLL_MS);
        let started = self.stream.now();
        while !handle.is_complete() {
            if self.is_stopped() {
                return false;
            }
            if self.stream.now() - started >= timeout {
                log::warn!(
                    "[EngineContext] Narration did not complete within {:?}, continuing",
                    timeout
                );
                break;
            }
            self.sample();
            self.stream.sleep(period);
        }
        !self.is_stopped()
    }

    /// Speak `text` without waiting
    pub fn announce(&mut self, text: &str) {
        self.show(DisplayUpdate::Instruction(text.to_string()));
        self.narrator.speak(text, Completion::detached());
    }

    pub fn show(&mut self, update: DisplayUpdate) {
        self.display.show(update);
    }
}
