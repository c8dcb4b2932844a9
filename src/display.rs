//! Display updates emitted by calibration and sessions.
//!
//! Every visual change is a [`DisplayUpdate`] pushed into a [`DisplaySink`].
//! Updates serialize as `{"type": ..., "payload": ...}` so a front-end can
//! consume the same stream the CLI prints.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::analysis::phase::BreathPhase;
use crate::analysis::AnalysisFrame;
use crate::calibration::{CalibrationProgress, CalibrationReport};
use crate::session::SessionSummary;

/// Which sphere an update refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// Follows the target pace
    Guide,
    /// Follows the user's adapted pace
    User,
    /// Single sphere shown during calibration
    Calibration,
}

/// Live detector readings for the debug panel
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DebugMetrics {
    pub envelope: f64,
    pub envelope_slope: f64,
    pub spectral_centroid: f64,
    pub zero_crossing_rate: f64,
    pub breath_score: f64,
    pub slope_variance: f64,
    pub talking: bool,
    pub phase: BreathPhase,
}

impl From<&AnalysisFrame> for DebugMetrics {
    fn from(frame: &AnalysisFrame) -> Self {
        Self {
            envelope: frame.features.envelope,
            envelope_slope: frame.features.envelope_slope,
            spectral_centroid: frame.features.spectral_centroid,
            zero_crossing_rate: frame.features.zero_crossing_rate,
            breath_score: frame.features.breath_score,
            slope_variance: frame.slope_variance,
            talking: frame.talking,
            phase: frame.phase,
        }
    }
}

/// One visual change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DisplayUpdate {
    /// Sphere fill level, 0-100
    SphereFill { indicator: Indicator, percent: f64 },
    PhaseLabel(String),
    /// Seconds remaining; `None` shows an ellipsis
    Countdown(Option<u32>),
    /// Talking warning text; `None` hides it
    TalkingWarning(Option<String>),
    Round { current: u32, total: u32 },
    CalibrationProgress(CalibrationProgress),
    Instruction(String),
    Feedback { score: f64, message: String },
    Debug(DebugMetrics),
    CalibrationReport(CalibrationReport),
    Summary(SessionSummary),
}

impl DisplayUpdate {
    /// Compact label for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            DisplayUpdate::SphereFill { .. } => "sphere_fill",
            DisplayUpdate::PhaseLabel(_) => "phase_label",
            DisplayUpdate::Countdown(_) => "countdown",
            DisplayUpdate::TalkingWarning(_) => "talking_warning",
            DisplayUpdate::Round { .. } => "round",
            DisplayUpdate::CalibrationProgress(_) => "calibration_progress",
            DisplayUpdate::Instruction(_) => "instruction",
            DisplayUpdate::Feedback { .. } => "feedback",
            DisplayUpdate::Debug(_) => "debug",
            DisplayUpdate::CalibrationReport(_) => "calibration_report",
            DisplayUpdate::Summary(_) => "summary",
        }
    }
}

/// Receives display updates
pub trait DisplaySink: Send {
    fn show(&mut self, update: DisplayUpdate);
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn show(&mut self, _update: DisplayUpdate) {}
}

/// Logs every update except the per-tick debug metrics
#[derive(Debug, Default)]
pub struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn show(&mut self, update: DisplayUpdate) {
        match &update {
            DisplayUpdate::Debug(_) | DisplayUpdate::SphereFill { .. } => {
                log::trace!("[Display] {:?}", update)
            }
            _ => log::info!("[Display] {:?}", update),
        }
    }
}

/// Keeps every update in memory; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    updates: Arc<Mutex<Vec<DisplayUpdate>>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all updates so far
    pub fn updates(&self) -> Vec<DisplayUpdate> {
        self.updates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.updates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|u| u.kind() == kind)
            .count()
    }
}

impl DisplaySink for RecordingDisplay {
    fn show(&mut self, update: DisplayUpdate) {
        self.updates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(update);
    }
}

/// Fans updates out over a tokio broadcast channel
///
/// Sending never blocks; updates are dropped when nobody subscribes and
/// slow receivers observe `Lagged`.
#[derive(Debug, Clone)]
pub struct ChannelDisplay {
    tx: broadcast::Sender<DisplayUpdate>,
}

impl ChannelDisplay {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DisplayUpdate> {
        self.tx.subscribe()
    }
}

impl DisplaySink for ChannelDisplay {
    fn show(&mut self, update: DisplayUpdate) {
        let _ = self.tx.send(update);
    }
}
