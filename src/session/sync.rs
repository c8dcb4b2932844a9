//! Synchrony scoring for one breathing phase.
//!
//! Every monitor tick compares where the user indicator is against where the
//! guide is, both as eased elapsed-time ratios. The phase score is
//! `clamp(0, 100, 100 - 200 * mean divergence)`.

use serde::Serialize;

use super::timing::ease_in_out;

/// Divergence of one monitor tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SyncSample {
    pub guide_progress: f64,
    pub user_progress: f64,
    pub divergence: f64,
}

/// Collects divergences over one phase
#[derive(Debug, Clone)]
pub struct SyncTracker {
    guide_ms: f64,
    user_ms: f64,
    divergences: Vec<f64>,
}

impl SyncTracker {
    pub fn new(guide_ms: f64, user_ms: f64) -> Self {
        Self {
            guide_ms,
            user_ms,
            divergences: Vec::new(),
        }
    }

    /// Record the tick at `elapsed_ms` into the phase
    pub fn record(&mut self, elapsed_ms: f64) -> SyncSample {
        let guide_progress = ease_in_out(ratio(elapsed_ms, self.guide_ms));
        let user_progress = ease_in_out(ratio(elapsed_ms, self.user_ms));
        let divergence = (user_progress - guide_progress).abs();
        self.divergences.push(divergence);
        SyncSample {
            guide_progress,
            user_progress,
            divergence,
        }
    }

    pub fn samples(&self) -> usize {
        self.divergences.len()
    }

    /// Mean divergence; 0.0 before any tick
    pub fn mean_divergence(&self) -> f64 {
        if self.divergences.is_empty() {
            return 0.0;
        }
        self.divergences.iter().sum::<f64>() / self.divergences.len() as f64
    }

    pub fn score(&self) -> f64 {
        sync_score(self.mean_divergence())
    }
}

fn ratio(elapsed_ms: f64, duration_ms: f64) -> f64 {
    if duration_ms <= 0.0 {
        return 1.0;
    }
    (elapsed_ms / duration_ms).min(1.0)
}

/// Phase score in [0, 100] from a mean divergence
pub fn sync_score(mean_divergence: f64) -> f64 {
    if !mean_divergence.is_finite() {
        return 0.0;
    }
    (100.0 - mean_divergence * 200.0).clamp(0.0, 100.0)
}

/// Feedback tier shown after each phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncFeedback {
    Excellent,
    Good,
    Fair,
    OffPace,
}

impl SyncFeedback {
    pub fn from_score(score: f64) -> Self {
        if score > 80.0 {
            SyncFeedback::Excellent
        } else if score > 60.0 {
            SyncFeedback::Good
        } else if score > 40.0 {
            SyncFeedback::Fair
        } else {
            SyncFeedback::OffPace
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SyncFeedback::Excellent => "Excellent! Keep it up!",
            SyncFeedback::Good => "Good rhythm!",
            SyncFeedback::Fair => "Try to match the guide",
            SyncFeedback::OffPace => "Follow the guide",
        }
    }
}
