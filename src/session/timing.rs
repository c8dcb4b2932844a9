//! Adaptive pacing.
//!
//! The user indicator starts near the user's own calibrated pace and is
//! pulled toward the target after every round:
//! `current += (target - current) * rate`.

use serde::Serialize;

/// Symmetric quadratic ease-in-out on [0, 1]
pub fn ease_in_out(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    if p < 0.5 {
        2.0 * p * p
    } else {
        1.0 - (-2.0 * p + 2.0).powi(2) / 2.0
    }
}

/// One adaptation step toward `target`
///
/// For `rate` in (0, 1] the result lies between `current` and `target`.
pub fn adapt_toward(current: f64, target: f64, rate: f64) -> f64 {
    current + (target - current) * rate
}

/// Current and target durations for both breath directions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdaptiveTiming {
    pub target_inhale_ms: f64,
    pub target_exhale_ms: f64,
    pub inhale_ms: f64,
    pub exhale_ms: f64,
    pub rate: f64,
}

impl AdaptiveTiming {
    pub fn new(target_inhale_ms: f64, target_exhale_ms: f64, initial: (f64, f64), rate: f64) -> Self {
        Self {
            target_inhale_ms,
            target_exhale_ms,
            inhale_ms: initial.0,
            exhale_ms: initial.1,
            rate,
        }
    }

    /// Apply one round of adaptation to both directions
    pub fn adapt(&mut self) {
        self.inhale_ms = adapt_toward(self.inhale_ms, self.target_inhale_ms, self.rate);
        self.exhale_ms = adapt_toward(self.exhale_ms, self.target_exhale_ms, self.rate);
    }
}
