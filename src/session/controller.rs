//! SessionController: guided rounds with adaptive pacing.
//!
//! A round is inhale, hold, exhale, hold. During each breathing phase the
//! guide indicator follows the target duration and the user indicator
//! follows the user's adapted duration; a 50 ms monitor scores how closely
//! the two track. After every round the user duration moves toward the
//! target by the adaptation rate.

use std::time::Duration;

use crate::calibration::report::initial_durations;
use crate::calibration::CalibrationProfile;
use crate::config::SessionConfig;
use crate::display::{DisplayUpdate, Indicator};
use crate::engine::context::EngineContext;

use super::state::{PhaseKind, SessionState, SessionSummary, TALKING_WARNING};
use super::sync::{SyncFeedback, SyncTracker};
use super::timing::AdaptiveTiming;

pub const INTRO_PROMPT: &str = "Let's begin. Find a comfortable position and relax.";
pub const CLOSING_PROMPT: &str =
    "Wonderful. You've completed your meditation session. Take a moment to notice how you feel.";

/// Runs one guided session against a calibration profile
pub struct SessionController {
    config: SessionConfig,
    profile: CalibrationProfile,
}

impl SessionController {
    pub fn new(config: &SessionConfig, profile: &CalibrationProfile) -> Self {
        Self {
            config: config.clone(),
            profile: profile.clone(),
        }
    }

    /// Pacing the session starts from
    pub fn initial_timing(&self) -> AdaptiveTiming {
        AdaptiveTiming::new(
            self.config.target_inhale_ms as f64,
            self.config.target_exhale_ms as f64,
            initial_durations(&self.profile, &self.config),
            self.config.adaptation_rate,
        )
    }

    /// Run every round, or until the context is stopped
    ///
    /// A stop is not an error: the summary covers whatever was completed
    /// and is marked `stopped_early`.
    pub fn run(&mut self, ctx: &mut EngineContext) -> SessionSummary {
        let total = self.config.total_rounds;
        let span = tracing::info_span!("session", rounds = total);
        let _guard = span.enter();

        ctx.stream.set_profile(self.profile.clone());
        ctx.stream.reset_detectors();

        let mut state = SessionState::new(total, self.initial_timing(), ctx.now_ms());
        log::info!(
            "[Session] Starting {} rounds (user pace {:.0}/{:.0} ms, target {}/{} ms)",
            total,
            state.timing.inhale_ms,
            state.timing.exhale_ms,
            self.config.target_inhale_ms,
            self.config.target_exhale_ms
        );

        for indicator in [Indicator::Guide, Indicator::User] {
            ctx.show(DisplayUpdate::SphereFill {
                indicator,
                percent: 0.0,
            });
        }
        ctx.show(DisplayUpdate::TalkingWarning(None));

        let completed = ctx.narrate(INTRO_PROMPT)
            && ctx.wait(Duration::from_millis(self.config.intro_pause_ms))
            && self.run_rounds(ctx, &mut state);

        if completed {
            ctx.narrate(CLOSING_PROMPT);
        }

        let summary = state.summarize(ctx.now_ms(), !completed);
        log::info!(
            "[Session] {} after {} of {} rounds, average sync {}",
            if completed { "Finished" } else { "Stopped" },
            summary.rounds_completed,
            total,
            summary.average_sync
        );
        ctx.show(DisplayUpdate::Summary(summary.clone()));
        summary
    }

    fn run_rounds(&mut self, ctx: &mut EngineContext, state: &mut SessionState) -> bool {
        let round_pause = Duration::from_millis(self.config.round_pause_ms);
        for round in 1..=state.total_rounds {
            state.current_round = round;
            let span = tracing::debug_span!("round", round);
            let _guard = span.enter();
            ctx.show(DisplayUpdate::Round {
                current: round,
                total: state.total_rounds,
            });

            for phase in [
                PhaseKind::Inhale,
                PhaseKind::HoldIn,
                PhaseKind::Exhale,
                PhaseKind::HoldOut,
            ] {
                let finished = if phase.is_breathing() {
                    self.run_breathing_phase(ctx, state, phase)
                } else {
                    self.run_hold(ctx, phase)
                };
                if !finished {
                    return false;
                }
            }

            state.complete_round();
            log::debug!(
                "[Session] Round {} done, next pace {:.0}/{:.0} ms",
                round,
                state.timing.inhale_ms,
                state.timing.exhale_ms
            );

            if !ctx.wait(round_pause) {
                return false;
            }
        }
        true
    }

    /// Guide and user spheres plus the synchrony monitor for one phase
    fn run_breathing_phase(
        &mut self,
        ctx: &mut EngineContext,
        state: &mut SessionState,
        phase: PhaseKind,
    ) -> bool {
        let (guide_ms, user_ms) = match phase {
            PhaseKind::Inhale => (self.config.target_inhale_ms, state.timing.inhale_ms),
            _ => (self.config.target_exhale_ms, state.timing.exhale_ms),
        };
        let filling = phase == PhaseKind::Inhale;
        let fill = |progress: f64| {
            if filling {
                progress * 100.0
            } else {
                (1.0 - progress) * 100.0
            }
        };

        ctx.show(DisplayUpdate::PhaseLabel(phase.label().to_string()));
        ctx.announce(phase.cue());

        let mut tracker = SyncTracker::new(guide_ms as f64, user_ms);
        let mut talking = false;
        let mut last_countdown: Option<u64> = None;
        let period = self.config.monitor_period();
        let start = ctx.now_ms();

        loop {
            if ctx.is_stopped() {
                return false;
            }
            let elapsed = ctx.now_ms().saturating_sub(start);
            if elapsed >= guide_ms {
                break;
            }

            let frame = ctx.sample();
            if frame.talking && !talking {
                talking = true;
                log::debug!("[Session] Talking detected in round {}", state.current_round);
                ctx.show(DisplayUpdate::TalkingWarning(Some(TALKING_WARNING.to_string())));
            }

            let sample = tracker.record(elapsed as f64);
            ctx.show(DisplayUpdate::SphereFill {
                indicator: Indicator::Guide,
                percent: fill(sample.guide_progress),
            });
            ctx.show(DisplayUpdate::SphereFill {
                indicator: Indicator::User,
                percent: fill(sample.user_progress),
            });

            if last_countdown.map_or(true, |at| elapsed - at >= self.config.countdown_period_ms) {
                last_countdown = Some(elapsed);
                let remaining = (guide_ms - elapsed) as f64 / 1000.0;
                ctx.show(DisplayUpdate::Countdown(Some(remaining.ceil() as u32)));
            }

            if !ctx.tick(period) {
                return false;
            }
        }

        let score = tracker.score();
        state.record_phase(phase, score, talking);
        let feedback = SyncFeedback::from_score(score);
        ctx.show(DisplayUpdate::Feedback {
            score,
            message: feedback.message().to_string(),
        });
        log::debug!(
            "[Session] {:?} scored {:.1} over {} samples",
            phase,
            score,
            tracker.samples()
        );
        true
    }

    fn run_hold(&mut self, ctx: &mut EngineContext, phase: PhaseKind) -> bool {
        ctx.show(DisplayUpdate::PhaseLabel(phase.label().to_string()));
        ctx.show(DisplayUpdate::Countdown(None));
        ctx.show(DisplayUpdate::TalkingWarning(None));
        ctx.wait(Duration::from_millis(self.config.hold_ms))
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
