use super::*;
use crate::calibration::SubProfile;
use proptest::prelude::*;

fn calibrated_profile() -> CalibrationProfile {
    CalibrationProfile {
        silence: SubProfile {
            envelope: 0.02,
            spectral_centroid: 150.0,
            zero_crossing_rate: 0.03,
            ..SubProfile::default()
        },
        talking: SubProfile {
            envelope: 0.5,
            spectral_centroid: 450.0,
            zero_crossing_rate: 0.12,
            envelope_slope_variance: Some(0.01),
            ..SubProfile::default()
        },
        breathing_in: SubProfile {
            envelope: 0.2,
            spectral_centroid: 250.0,
            zero_crossing_rate: 0.05,
            duration_ms: Some(3000),
            ..SubProfile::default()
        },
        breathing_out: SubProfile {
            envelope: 0.18,
            spectral_centroid: 200.0,
            zero_crossing_rate: 0.04,
            duration_ms: Some(3500),
            ..SubProfile::default()
        },
    }
}

fn scorer() -> BreathScorer {
    BreathScorer::new(ScoreWeights::default())
}

#[test]
fn test_uncalibrated_profile_scores_zero() {
    let frame = FeatureFrame::unscored(0.1, 0.0, 225.0, 0.06);
    let score = scorer().score(&frame, 0.0, &CalibrationProfile::default());
    assert_eq!(score, 0.0);
}

#[test]
fn test_breath_like_frame() {
    let frame = FeatureFrame::unscored(0.1, 0.001, 225.0, 0.06);
    let breakdown = scorer().breakdown(&frame, 0.002, &calibrated_profile());

    assert!((breakdown.envelope - 0.35 * 0.1 / 0.21).abs() < 1e-12);
    assert!((breakdown.envelope_slope - 0.2).abs() < 1e-12);
    assert!((breakdown.spectral_centroid - 0.1).abs() < 1e-12);
    assert!((breakdown.zero_crossing_rate - 0.1).abs() < 1e-12);
    assert!((breakdown.total - 0.566_666_666_666).abs() < 1e-9);
}

#[test]
fn test_speech_like_frame_scores_zero() {
    let frame = FeatureFrame::unscored(0.5, 0.05, 450.0, 0.15);
    let score = scorer().score(&frame, 0.02, &calibrated_profile());
    assert_eq!(score, 0.0);
}

#[test]
fn test_envelope_term_needs_margin_over_silence() {
    // 0.025 < 0.02 * 1.3
    let frame = FeatureFrame::unscored(0.025, 0.0, 0.0, 0.2);
    let breakdown = scorer().breakdown(&frame, 0.01, &calibrated_profile());
    assert_eq!(breakdown.envelope, 0.0);
    assert_eq!(breakdown.spectral_centroid, 0.0);
    assert_eq!(breakdown.total, 0.0);
}

#[test]
fn test_missing_talking_reference_uses_defaults() {
    let mut profile = calibrated_profile();
    profile.talking = SubProfile::default();

    let frame = FeatureFrame::unscored(0.1, 0.0, 250.0, 0.075);
    let breakdown = scorer().breakdown(&frame, 0.0, &profile);

    // envelope ceiling is 0 without a talking reference
    assert_eq!(breakdown.envelope, 0.0);
    assert!((breakdown.envelope_slope - 0.25).abs() < 1e-12);
    assert!((breakdown.spectral_centroid - 0.1).abs() < 1e-12);
    assert!((breakdown.zero_crossing_rate - 0.1).abs() < 1e-12);
}

#[test]
fn test_zero_zcr_earns_full_weight() {
    let frame = FeatureFrame::unscored(0.0, 0.0, 0.0, 0.0);
    let breakdown = scorer().breakdown(&frame, 0.0, &calibrated_profile());
    assert!((breakdown.zero_crossing_rate - 0.2).abs() < 1e-12);
    assert_eq!(breakdown.spectral_centroid, 0.0);
}

#[test]
fn test_breath_references_are_reported() {
    let breakdown = scorer().breakdown(&FeatureFrame::default(), 0.0, &calibrated_profile());
    assert_eq!(breakdown.breath_centroid_reference, 250.0);
    assert_eq!(breakdown.breath_zcr_reference, 0.05);

    let mut profile = calibrated_profile();
    profile.breathing_in = SubProfile::default();
    profile.breathing_out = SubProfile::default();
    let breakdown = scorer().breakdown(&FeatureFrame::default(), 0.0, &profile);
    assert_eq!(breakdown.breath_centroid_reference, DEFAULT_BREATH_CENTROID);
    assert_eq!(breakdown.breath_zcr_reference, DEFAULT_BREATH_ZCR);
}

proptest! {
    #[test]
    fn prop_score_stays_in_unit_range(
        envelope in 0.0f64..2.0,
        slope in -0.5f64..0.5,
        centroid in 0.0f64..2000.0,
        zcr in 0.0f64..1.0,
        variance in 0.0f64..1.0,
        silence in 0.0f64..0.5,
        talking in 0.0f64..2.0,
        talking_variance in 0.0f64..0.1,
    ) {
        let mut profile = calibrated_profile();
        profile.silence.envelope = silence;
        profile.talking.envelope = talking;
        profile.talking.envelope_slope_variance = Some(talking_variance);

        let frame = FeatureFrame::unscored(envelope, slope, centroid, zcr);
        let score = scorer().score(&frame, variance, &profile);
        prop_assert!((0.0..=1.0).contains(&score));
        if silence == 0.0 {
            prop_assert_eq!(score, 0.0);
        }
    }
}
