use super::*;
use crate::audio::{SignalPlan, SyntheticInput};
use crate::calibration::SubProfile;
use crate::display::RecordingDisplay;
use crate::engine::clock::VirtualScheduler;
use crate::narration::SilentNarrator;

fn engine(input: SyntheticInput) -> (BreathEngine, RecordingDisplay) {
    let display = RecordingDisplay::new();
    let engine = BreathEngine::new(
        AppConfig::default(),
        Box::new(input),
        Box::new(VirtualScheduler::new()),
        Box::new(SilentNarrator),
        Box::new(display.clone()),
    );
    (engine, display)
}

fn silent_input() -> SyntheticInput {
    SyntheticInput::new(SignalPlan::silence(), 2048)
}

#[test]
fn test_start_audio_resumes_suspended_input() {
    let (mut engine, _) = engine(silent_input().start_suspended());
    assert_eq!(engine.audio_state(), InputState::Stopped);
    engine.start_audio().unwrap();
    assert_eq!(engine.audio_state(), InputState::Running);
    // Starting again is a no-op
    engine.start_audio().unwrap();
    engine.stop_audio().unwrap();
    assert_eq!(engine.audio_state(), InputState::Stopped);
    assert_eq!(engine.stop_audio(), Err(AudioError::NotRunning));
}

#[test]
fn test_session_requires_calibration() {
    let (mut engine, _) = engine(silent_input());
    engine.start_audio().unwrap();
    assert_eq!(engine.run_session(), Err(CalibrationError::NotComplete));

    let mut profile = CalibrationProfile::default();
    profile.silence = SubProfile {
        envelope: 0.05,
        ..SubProfile::default()
    };
    engine.set_profile(profile);
    assert_eq!(engine.run_session(), Err(CalibrationError::NotComplete));
}

#[test]
fn test_reset_calibration_clears_profile() {
    let (mut engine, _) = engine(silent_input());
    let mut profile = CalibrationProfile::default();
    profile.silence.envelope = 0.05;
    profile.talking.envelope = 0.4;
    engine.set_profile(profile);
    assert!(engine.profile().is_calibrated());
    engine.reset_calibration();
    assert!(!engine.profile().is_calibrated());
    assert!(!engine.profile().has_talking_reference());
}

#[test]
fn test_monitor_samples_at_refresh_rate() {
    let (mut engine, display) = engine(silent_input());
    engine.start_audio().unwrap();
    let frames = engine.monitor(Duration::from_secs(1));
    assert!((60..=61).contains(&frames), "frames {}", frames);
    assert_eq!(display.count("debug"), frames);
}

#[test]
fn test_stopped_calibration_is_cancelled() {
    let (mut engine, _) = engine(silent_input());
    engine.start_audio().unwrap();
    // Narration sees the stop before the first capture tick
    struct StopOnSpeak(StopSignal);
    impl Narrator for StopOnSpeak {
        fn speak(&mut self, _text: &str, done: crate::narration::Completion) {
            self.0.stop();
            done.complete();
        }
    }
    let stop = engine.stop_signal();
    engine.ctx.narrator = Box::new(StopOnSpeak(stop));
    match engine.calibrate() {
        Err(CalibrationError::Cancelled { stage }) => assert_eq!(stage, "SILENCE"),
        other => panic!("Expected Cancelled, got {:?}", other),
    }
    assert!(!engine.profile().is_calibrated());
}
