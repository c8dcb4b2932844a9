use std::time::Duration;

use breathsync::audio::{SignalPlan, SyntheticInput};
use breathsync::calibration::{CalibrationStage, SubProfile};
use breathsync::display::{DisplaySink, DisplayUpdate, RecordingDisplay};
use breathsync::engine::{BreathEngine, Scheduler, StopSignal, VirtualScheduler};
use breathsync::error::CalibrationError;
use breathsync::narration::SilentNarrator;
use breathsync::AppConfig;

fn engine(plan: SignalPlan) -> (BreathEngine, VirtualScheduler, RecordingDisplay) {
    let config = AppConfig::default();
    let clock = VirtualScheduler::new();
    let display = RecordingDisplay::new();
    let mut engine = BreathEngine::new(
        config.clone(),
        Box::new(SyntheticInput::new(plan, config.audio.fft_size)),
        Box::new(clock.clone()),
        Box::new(SilentNarrator),
        Box::new(display.clone()),
    );
    engine.start_audio().unwrap();
    (engine, clock, display)
}

#[test]
fn test_scripted_calibration_measures_every_stage() {
    let (mut engine, _, display) = engine(SignalPlan::calibration_script());

    let report = engine.calibrate().unwrap();
    let profile = &report.profile;

    assert!(profile.is_calibrated());
    assert!(profile.has_talking_reference());
    assert!(
        profile.talking.envelope > profile.silence.envelope * 3.0,
        "talking {} silence {}",
        profile.talking.envelope,
        profile.silence.envelope
    );
    assert!(profile.talking.zero_crossing_rate > profile.silence.zero_crossing_rate);
    assert!(profile.talking.envelope_slope_variance.is_some());
    assert!(profile.silence.envelope_slope_variance.is_none());

    for (name, breath) in [("inhale", &profile.breathing_in), ("exhale", &profile.breathing_out)] {
        let duration = breath.duration_ms.unwrap();
        assert!(
            (2500..=4500).contains(&duration),
            "{} lasted {} ms",
            name,
            duration
        );
        assert!(!breath.envelope_pattern.is_empty(), "{} used defaults", name);
        assert!(breath.envelope > profile.silence.envelope);
    }

    assert_eq!(engine.profile(), profile);
    assert_eq!(display.count("calibration_report"), 1);

    let stages: Vec<CalibrationStage> = display
        .updates()
        .iter()
        .filter_map(|u| match u {
            DisplayUpdate::CalibrationProgress(p) if p.percent == 100.0 => Some(p.stage),
            _ => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![
            CalibrationStage::Silence,
            CalibrationStage::Talking,
            CalibrationStage::BreathingIn,
            CalibrationStage::BreathingOut,
        ]
    );
}

#[test]
fn test_silent_room_falls_back_to_default_breaths() {
    let (mut engine, clock, _) = engine(SignalPlan::silence());

    let report = engine.calibrate().unwrap();

    assert_eq!(
        report.profile.breathing_in,
        SubProfile {
            envelope: 0.1,
            spectral_centroid: 250.0,
            zero_crossing_rate: 0.05,
            envelope_slope_variance: None,
            duration_ms: Some(4000),
            envelope_pattern: Vec::new(),
        }
    );
    assert_eq!(report.profile.breathing_out.spectral_centroid, 200.0);
    assert_eq!(report.profile.breathing_out.duration_ms, Some(4000));
    assert_eq!(report.measured_inhale_secs, 4.0);
    assert_eq!(report.initial_inhale_ms, 4000.0);
    assert_eq!(
        report.hint,
        "Your breathing pace is close to the target. Great!"
    );
    // Two 6 s windows after their settle delays, then two 12 s ceilings
    assert_eq!(clock.now(), Duration::from_millis(37_000));
}

/// Raises the stop signal halfway through the talking window
struct StopMidTalking {
    stop: StopSignal,
}

impl DisplaySink for StopMidTalking {
    fn show(&mut self, update: DisplayUpdate) {
        if let DisplayUpdate::CalibrationProgress(progress) = update {
            if progress.stage == CalibrationStage::Talking && progress.percent >= 50.0 {
                self.stop.stop();
            }
        }
    }
}

#[test]
fn test_stop_during_capture_keeps_previous_profile() {
    let config = AppConfig::default();
    let clock = VirtualScheduler::new();
    let stop = StopSignal::new();
    let mut engine = BreathEngine::new(
        config.clone(),
        Box::new(SyntheticInput::new(
            SignalPlan::calibration_script(),
            config.audio.fft_size,
        )),
        Box::new(clock.clone()),
        Box::new(SilentNarrator),
        Box::new(StopMidTalking { stop: stop.clone() }),
    )
    .with_stop_signal(stop);
    engine.start_audio().unwrap();

    match engine.calibrate() {
        Err(CalibrationError::Cancelled { stage }) => assert_eq!(stage, "TALKING"),
        other => panic!("Expected Cancelled, got {:?}", other),
    }
    assert!(!engine.profile().is_calibrated());
}
