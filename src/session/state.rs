// Session state - round bookkeeping and the end-of-session summary

use serde::Serialize;

use super::timing::AdaptiveTiming;

/// Message shown while talking is detected during a breathing phase
pub const TALKING_WARNING: &str = "Talking detected - please concentrate on breathing";

/// One breathing or hold phase of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Inhale,
    HoldIn,
    Exhale,
    HoldOut,
}

impl PhaseKind {
    pub fn label(&self) -> &'static str {
        match self {
            PhaseKind::Inhale => "Breathe In...",
            PhaseKind::Exhale => "Breathe Out...",
            PhaseKind::HoldIn | PhaseKind::HoldOut => "Hold...",
        }
    }

    /// Spoken cue at the start of the phase
    pub fn cue(&self) -> &'static str {
        match self {
            PhaseKind::Inhale => "Breathe in",
            PhaseKind::Exhale => "Breathe out",
            PhaseKind::HoldIn | PhaseKind::HoldOut => "Hold",
        }
    }

    pub fn is_breathing(&self) -> bool {
        matches!(self, PhaseKind::Inhale | PhaseKind::Exhale)
    }
}

/// Score of one completed breathing phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseScore {
    pub round: u32,
    pub phase: PhaseKind,
    pub score: f64,
    pub talking: bool,
}

/// Mutable state of a running session
#[derive(Debug, Clone)]
pub struct SessionState {
    pub current_round: u32,
    pub total_rounds: u32,
    pub rounds_completed: u32,
    pub total_breaths: u32,
    pub timing: AdaptiveTiming,
    pub phase_scores: Vec<PhaseScore>,
    pub talking_phases: u32,
    pub started_ms: u64,
}

impl SessionState {
    pub fn new(total_rounds: u32, timing: AdaptiveTiming, started_ms: u64) -> Self {
        Self {
            current_round: 0,
            total_rounds,
            rounds_completed: 0,
            total_breaths: 0,
            timing,
            phase_scores: Vec::new(),
            talking_phases: 0,
            started_ms,
        }
    }

    pub fn record_phase(&mut self, phase: PhaseKind, score: f64, talking: bool) {
        if talking {
            self.talking_phases += 1;
        }
        self.phase_scores.push(PhaseScore {
            round: self.current_round,
            phase,
            score,
            talking,
        });
    }

    /// Close the current round and adapt the user pace
    pub fn complete_round(&mut self) {
        self.total_breaths += 1;
        self.rounds_completed = self.current_round;
        self.timing.adapt();
    }

    /// Mean phase score rounded to an integer; 0 when nothing was scored
    pub fn average_sync(&self) -> u32 {
        if self.phase_scores.is_empty() {
            return 0;
        }
        let sum: f64 = self.phase_scores.iter().map(|p| p.score).sum();
        (sum / self.phase_scores.len() as f64).round() as u32
    }

    pub fn summarize(&self, now_ms: u64, stopped_early: bool) -> SessionSummary {
        let elapsed_ms = now_ms.saturating_sub(self.started_ms);
        SessionSummary {
            rounds_completed: self.rounds_completed,
            total_rounds: self.total_rounds,
            total_breaths: self.total_breaths,
            average_sync: self.average_sync(),
            elapsed_ms,
            elapsed_label: format_elapsed(elapsed_ms),
            talking_phases: self.talking_phases,
            phase_scores: self.phase_scores.clone(),
            final_inhale_ms: self.timing.inhale_ms,
            final_exhale_ms: self.timing.exhale_ms,
            stopped_early,
        }
    }
}

/// Statistics shown when a session ends
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub rounds_completed: u32,
    pub total_rounds: u32,
    pub total_breaths: u32,
    /// Mean phase score, 0-100
    pub average_sync: u32,
    pub elapsed_ms: u64,
    /// Elapsed time as m:ss
    pub elapsed_label: String,
    /// Breathing phases during which talking was detected
    pub talking_phases: u32,
    pub phase_scores: Vec<PhaseScore>,
    pub final_inhale_ms: f64,
    pub final_exhale_ms: f64,
    pub stopped_early: bool,
}

/// Format milliseconds as `m:ss`
pub fn format_elapsed(elapsed_ms: u64) -> String {
    let secs = elapsed_ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}
