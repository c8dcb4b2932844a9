use super::*;
use crate::audio::{AudioInput, SignalKind, SignalPlan, SyntheticInput};
use crate::calibration::SubProfile;
use crate::config::AppConfig;
use crate::display::{DisplaySink, RecordingDisplay};
use crate::engine::clock::VirtualScheduler;
use crate::engine::stream::{FrameStream, StopSignal};
use crate::narration::SilentNarrator;

fn profile(inhale_ms: u64, exhale_ms: u64) -> CalibrationProfile {
    CalibrationProfile {
        silence: SubProfile {
            envelope: 0.05,
            spectral_centroid: 316.0,
            zero_crossing_rate: 0.008,
            ..SubProfile::default()
        },
        talking: SubProfile {
            envelope: 0.45,
            spectral_centroid: 380.0,
            zero_crossing_rate: 0.125,
            envelope_slope_variance: Some(0.0025),
            ..SubProfile::default()
        },
        breathing_in: SubProfile {
            envelope: 0.2,
            spectral_centroid: 254.0,
            zero_crossing_rate: 0.0125,
            duration_ms: Some(inhale_ms),
            ..SubProfile::default()
        },
        breathing_out: SubProfile {
            envelope: 0.2,
            spectral_centroid: 230.0,
            zero_crossing_rate: 0.0125,
            duration_ms: Some(exhale_ms),
            ..SubProfile::default()
        },
    }
}

fn context(plan: SignalPlan, display: Box<dyn DisplaySink>) -> EngineContext {
    let config = AppConfig::default();
    let mut input = SyntheticInput::new(plan, config.audio.fft_size);
    input.start().unwrap();
    let stream = FrameStream::new(
        Box::new(input),
        Box::new(VirtualScheduler::new()),
        &config,
    );
    EngineContext::new(config, stream, Box::new(SilentNarrator), display)
}

/// Requests a stop once the given round is announced
struct StopAtRound {
    round: u32,
    stop: StopSignal,
}

impl DisplaySink for StopAtRound {
    fn show(&mut self, update: DisplayUpdate) {
        if let DisplayUpdate::Round { current, .. } = update {
            if current == self.round {
                self.stop.stop();
            }
        }
    }
}

#[test]
fn test_matched_pace_session_scores_100() {
    let display = RecordingDisplay::new();
    let mut ctx = context(SignalPlan::silence(), Box::new(display.clone()));
    let config = ctx.config.session.clone();
    let mut controller = SessionController::new(&config, &profile(4000, 4000));

    let summary = controller.run(&mut ctx);

    assert_eq!(summary.rounds_completed, 5);
    assert_eq!(summary.total_breaths, 5);
    assert_eq!(summary.average_sync, 100);
    assert_eq!(summary.phase_scores.len(), 10);
    assert!(summary.phase_scores.iter().all(|p| p.score == 100.0));
    assert_eq!(summary.talking_phases, 0);
    assert!(!summary.stopped_early);
    // 2 s intro pause plus 5 rounds of 4 + 1 + 4 + 1 + 0.5 s
    assert_eq!(summary.elapsed_ms, 54_500);
    assert_eq!(summary.elapsed_label, "0:54");

    assert_eq!(display.count("summary"), 1);
    assert_eq!(display.count("round"), 5);
    assert_eq!(display.count("feedback"), 10);
}

#[test]
fn test_session_displays_countdown_and_holds() {
    let display = RecordingDisplay::new();
    let mut ctx = context(SignalPlan::silence(), Box::new(display.clone()));
    let mut config = ctx.config.session.clone();
    config.total_rounds = 1;
    SessionController::new(&config, &profile(4000, 4000)).run(&mut ctx);

    let updates = display.updates();
    let countdowns: Vec<Option<u32>> = updates
        .iter()
        .filter_map(|u| match u {
            DisplayUpdate::Countdown(c) => Some(*c),
            _ => None,
        })
        .collect();
    assert_eq!(countdowns.first(), Some(&Some(4)));
    assert!(countdowns.contains(&Some(1)));
    assert_eq!(countdowns.iter().filter(|c| c.is_none()).count(), 2);

    let labels: Vec<&str> = updates
        .iter()
        .filter_map(|u| match u {
            DisplayUpdate::PhaseLabel(label) => Some(label.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(labels, vec!["Breathe In...", "Hold...", "Breathe Out...", "Hold..."]);
}

#[test]
fn test_slow_user_adapts_toward_target() {
    let mut ctx = context(SignalPlan::silence(), Box::new(RecordingDisplay::new()));
    let config = ctx.config.session.clone();
    let mut controller = SessionController::new(&config, &profile(3000, 5000));
    assert_eq!(controller.initial_timing().inhale_ms, 3500.0);
    assert_eq!(controller.initial_timing().exhale_ms, 4500.0);

    let summary = controller.run(&mut ctx);

    assert!(summary.average_sync < 100);
    assert!(summary.average_sync > 60);
    assert_eq!(summary.final_inhale_ms, 3984.375);
    assert_eq!(summary.final_exhale_ms, 4015.625);
    // Later rounds track the guide more closely
    let first = summary.phase_scores[0].score;
    let last = summary.phase_scores[8].score;
    assert!(last > first, "first {} last {}", first, last);
}

#[test]
fn test_stop_returns_partial_summary() {
    let mut ctx = context(SignalPlan::silence(), Box::new(RecordingDisplay::new()));
    let stop = ctx.stop.clone();
    ctx.display = Box::new(StopAtRound { round: 2, stop });
    let config = ctx.config.session.clone();

    let summary = SessionController::new(&config, &profile(4000, 4000)).run(&mut ctx);

    assert!(summary.stopped_early);
    assert_eq!(summary.rounds_completed, 1);
    assert_eq!(summary.total_breaths, 1);
    assert_eq!(summary.phase_scores.len(), 2);
    assert_eq!(summary.average_sync, 100);
}

#[test]
fn test_talking_raises_sticky_warning() {
    let display = RecordingDisplay::new();
    let plan = SignalPlan::new().then(SignalKind::Speech, 60_000);
    let mut ctx = context(plan, Box::new(display.clone()));
    let mut config = ctx.config.session.clone();
    config.total_rounds = 1;

    let summary = SessionController::new(&config, &profile(4000, 4000)).run(&mut ctx);

    assert_eq!(summary.talking_phases, 2);
    assert!(summary.phase_scores.iter().all(|p| p.talking));
    let warnings = display
        .updates()
        .into_iter()
        .filter(|u| matches!(u, DisplayUpdate::TalkingWarning(Some(_))))
        .count();
    // Raised once per breathing phase, cleared by each hold
    assert_eq!(warnings, 2);
}
