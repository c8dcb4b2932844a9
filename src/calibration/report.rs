// CalibrationReport - measured pace vs target pace
//
// Built once calibration completes. Besides the numbers it carries the
// starting durations for the guided session: halfway between what the user
// did and the target, so the first round is neither a jump nor a no-op.

use serde::Serialize;

use crate::calibration::state::CalibrationProfile;
use crate::config::SessionConfig;

/// Differences below this many seconds count as on target
pub const PACE_TOLERANCE_SECS: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    pub measured_inhale_secs: f64,
    pub measured_exhale_secs: f64,
    pub target_inhale_secs: f64,
    pub target_exhale_secs: f64,
    /// Starting user-indicator duration for inhales
    pub initial_inhale_ms: f64,
    /// Starting user-indicator duration for exhales
    pub initial_exhale_ms: f64,
    pub hint: String,
    pub profile: CalibrationProfile,
}

impl CalibrationReport {
    pub fn new(profile: &CalibrationProfile, session: &SessionConfig) -> Self {
        let target_inhale = session.target_inhale_ms as f64;
        let target_exhale = session.target_exhale_ms as f64;
        let measured_inhale = measured_or(profile.breathing_in.duration_ms, target_inhale);
        let measured_exhale = measured_or(profile.breathing_out.duration_ms, target_exhale);

        let (initial_inhale_ms, initial_exhale_ms) = initial_durations(profile, session);

        Self {
            measured_inhale_secs: measured_inhale / 1000.0,
            measured_exhale_secs: measured_exhale / 1000.0,
            target_inhale_secs: target_inhale / 1000.0,
            target_exhale_secs: target_exhale / 1000.0,
            initial_inhale_ms,
            initial_exhale_ms,
            hint: pace_hint(
                target_inhale / 1000.0 - measured_inhale / 1000.0,
                target_exhale / 1000.0 - measured_exhale / 1000.0,
            ),
            profile: profile.clone(),
        }
    }
}

fn measured_or(duration_ms: Option<u64>, fallback: f64) -> f64 {
    duration_ms.map(|ms| ms as f64).unwrap_or(fallback)
}

/// Starting user durations: `(measured + target) / 2`, or the target when
/// the breath was never measured
pub fn initial_durations(profile: &CalibrationProfile, session: &SessionConfig) -> (f64, f64) {
    let midpoint = |measured: Option<u64>, target: u64| match measured {
        Some(ms) => (ms as f64 + target as f64) / 2.0,
        None => target as f64,
    };
    (
        midpoint(profile.breathing_in.duration_ms, session.target_inhale_ms),
        midpoint(profile.breathing_out.duration_ms, session.target_exhale_ms),
    )
}

/// Advice for matching the target pace
///
/// # Arguments
/// * `inhale_diff` - target minus measured inhale, in seconds
/// * `exhale_diff` - target minus measured exhale, in seconds
pub fn pace_hint(inhale_diff: f64, exhale_diff: f64) -> String {
    let mut parts = Vec::new();
    if let Some(part) = adjustment("in", inhale_diff) {
        parts.push(part);
    }
    if let Some(part) = adjustment("out", exhale_diff) {
        parts.push(part);
    }

    if parts.is_empty() {
        "Your breathing pace is close to the target. Great!".to_string()
    } else {
        format!("To match the target, try to {}.", parts.join(" and "))
    }
}

fn adjustment(direction: &str, diff: f64) -> Option<String> {
    if diff > PACE_TOLERANCE_SECS {
        Some(format!("breathe {} {:.1}s slower", direction, diff))
    } else if diff < -PACE_TOLERANCE_SECS {
        Some(format!("breathe {} {:.1}s faster", direction, diff.abs()))
    } else {
        None
    }
}
