// Progress tracking for the calibration workflow
//
// Four stages run in a fixed order. Each tick of a stage reports how far the
// stage has come (0-100) so the display can draw a progress bar next to the
// "Step n of 4" counter.

use serde::{Deserialize, Serialize};

/// Calibration stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStage {
    /// Step 1: ambient noise floor (user stays quiet)
    Silence,
    /// Step 2: normal speech reference
    Talking,
    /// Step 3: one slow inhale, timed from onset
    BreathingIn,
    /// Step 4: one slow exhale, timed from onset
    BreathingOut,
}

impl CalibrationStage {
    pub const TOTAL_STEPS: u8 = 4;

    pub fn first() -> Self {
        CalibrationStage::Silence
    }

    /// Get the next stage in the calibration sequence
    ///
    /// # Returns
    /// * `Some(CalibrationStage)` - Next stage to run
    /// * `None` - Calibration sequence complete
    pub fn next(&self) -> Option<CalibrationStage> {
        match self {
            CalibrationStage::Silence => Some(CalibrationStage::Talking),
            CalibrationStage::Talking => Some(CalibrationStage::BreathingIn),
            CalibrationStage::BreathingIn => Some(CalibrationStage::BreathingOut),
            CalibrationStage::BreathingOut => None,
        }
    }

    /// 1-based position in the sequence
    pub fn step(&self) -> u8 {
        match self {
            CalibrationStage::Silence => 1,
            CalibrationStage::Talking => 2,
            CalibrationStage::BreathingIn => 3,
            CalibrationStage::BreathingOut => 4,
        }
    }

    /// Get human-readable name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            CalibrationStage::Silence => "SILENCE",
            CalibrationStage::Talking => "TALKING",
            CalibrationStage::BreathingIn => "BREATHE IN",
            CalibrationStage::BreathingOut => "BREATHE OUT",
        }
    }

    /// Whether the stage waits for a breath onset instead of a fixed window
    pub fn is_onset_based(&self) -> bool {
        matches!(
            self,
            CalibrationStage::BreathingIn | CalibrationStage::BreathingOut
        )
    }

    /// Spoken prompt opening the stage
    pub fn prompt(&self) -> &'static str {
        match self {
            CalibrationStage::Silence => {
                "Let's start by calibrating silence. Please remain quiet and still for a few seconds."
            }
            CalibrationStage::Talking => {
                "Now, please speak normally for a few seconds. Count from one to ten, or say anything you like."
            }
            CalibrationStage::BreathingIn => {
                "Take a slow, deep breath in through your nose. Start when you're ready and breathe in completely."
            }
            CalibrationStage::BreathingOut => {
                "Now slowly breathe out through your mouth. Start when you're ready."
            }
        }
    }

    /// On-screen instruction shown while capturing
    pub fn instruction(&self) -> &'static str {
        match self {
            CalibrationStage::Silence => "Stay quiet and still...",
            CalibrationStage::Talking => "Please speak now... (count 1 to 10)",
            CalibrationStage::BreathingIn => "Breathe IN slowly... (we're measuring)",
            CalibrationStage::BreathingOut => "Breathe OUT slowly... (we're measuring)",
        }
    }
}

/// Progress information for the current calibration stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProgress {
    pub stage: CalibrationStage,
    /// 1-based stage number
    pub step: u8,
    pub total_steps: u8,
    /// Progress through the current stage (0-100)
    pub percent: f64,
}

impl CalibrationProgress {
    pub fn new(stage: CalibrationStage, percent: f64) -> Self {
        Self {
            stage,
            step: stage.step(),
            total_steps: CalibrationStage::TOTAL_STEPS,
            percent: percent.clamp(0.0, 100.0),
        }
    }

    pub fn step_label(&self) -> String {
        format!("Step {} of {}", self.step, self.total_steps)
    }
}
