//! Bounded history of recent feature frames
//!
//! Holds the last N frames (oldest first) and derives the short-horizon
//! statistics the scorer and the talking classifier need.

use std::collections::VecDeque;

use super::features::FeatureFrame;

/// Number of most recent slopes the slope variance looks at
pub const SLOPE_VARIANCE_WINDOW: usize = 10;

/// Below this many frames the slope variance is reported as 0.0
pub const SLOPE_VARIANCE_MIN_FRAMES: usize = 5;

/// Fixed-capacity FIFO of feature frames
#[derive(Debug, Clone)]
pub struct FeatureHistory {
    frames: VecDeque<FeatureFrame>,
    capacity: usize,
}

impl FeatureHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a frame, evicting the oldest one when full
    pub fn push(&mut self, frame: FeatureFrame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&FeatureFrame> {
        self.frames.back()
    }

    /// Frames from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &FeatureFrame> {
        self.frames.iter()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Population variance of the last [`SLOPE_VARIANCE_WINDOW`] slopes
    pub fn recent_slope_variance(&self) -> f64 {
        let slopes: Vec<f64> = self.recent_slopes(SLOPE_VARIANCE_WINDOW).collect();
        windowed_variance(&slopes)
    }

    /// Slope variance as it will read once a frame with `pending_slope` is pushed
    ///
    /// Lets a frame be scored before it enters the history, so stored frames
    /// never change after insertion.
    pub fn slope_variance_with(&self, pending_slope: f64) -> f64 {
        let keep = SLOPE_VARIANCE_WINDOW.min(self.capacity) - 1;
        let mut slopes: Vec<f64> = self.recent_slopes(keep).collect();
        slopes.push(pending_slope);
        windowed_variance(&slopes)
    }

    fn recent_slopes(&self, count: usize) -> impl Iterator<Item = f64> + '_ {
        let skip = self.frames.len().saturating_sub(count);
        self.frames.iter().skip(skip).map(|f| f.envelope_slope)
    }
}

fn windowed_variance(values: &[f64]) -> f64 {
    if values.len() < SLOPE_VARIANCE_MIN_FRAMES {
        return 0.0;
    }
    population_variance(values)
}

/// Population variance (divides by n); 0.0 for an empty slice
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slope_frame(slope: f64) -> FeatureFrame {
        FeatureFrame::unscored(0.1, slope, 200.0, 0.05)
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = FeatureHistory::new(3);
        for i in 0..5 {
            history.push(slope_frame(i as f64));
        }
        assert_eq!(history.len(), 3);
        let slopes: Vec<f64> = history.iter().map(|f| f.envelope_slope).collect();
        assert_eq!(slopes, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_slope_variance_needs_five_frames() {
        let mut history = FeatureHistory::new(30);
        for slope in [1.0, -1.0, 1.0, -1.0] {
            history.push(slope_frame(slope));
        }
        assert_eq!(history.recent_slope_variance(), 0.0);

        history.push(slope_frame(1.0));
        assert!(history.recent_slope_variance() > 0.0);
    }

    #[test]
    fn test_slope_variance_uses_last_ten() {
        let mut history = FeatureHistory::new(30);
        for _ in 0..10 {
            history.push(slope_frame(5.0));
        }
        for _ in 0..10 {
            history.push(slope_frame(0.0));
        }
        assert_eq!(history.recent_slope_variance(), 0.0);
    }

    #[test]
    fn test_pending_variance_matches_after_push() {
        let mut history = FeatureHistory::new(30);
        for i in 0..12 {
            history.push(slope_frame((i % 3) as f64 * 0.01));
        }
        let predicted = history.slope_variance_with(0.05);
        history.push(slope_frame(0.05));
        assert!((predicted - history.recent_slope_variance()).abs() < 1e-15);
    }

    #[test]
    fn test_pending_variance_with_small_capacity() {
        let mut history = FeatureHistory::new(6);
        for i in 0..6 {
            history.push(slope_frame(i as f64));
        }
        let predicted = history.slope_variance_with(10.0);
        history.push(slope_frame(10.0));
        assert!((predicted - history.recent_slope_variance()).abs() < 1e-12);
    }

    #[test]
    fn test_population_variance() {
        assert_eq!(population_variance(&[]), 0.0);
        assert!((population_variance(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
    }
}
