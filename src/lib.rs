// BreathSync Core - breath detection and paced-breathing engine
// Per-tick spectral analysis, per-user calibration and synchrony scoring

// Module declarations
pub mod analysis;
pub mod audio;
pub mod calibration;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod narration;
pub mod session;

// Re-exports for convenience
pub use analysis::{AnalysisFrame, BreathAnalyzer};
pub use calibration::{CalibrationProfile, CalibrationReport};
pub use config::AppConfig;
pub use display::{DisplaySink, DisplayUpdate};
pub use engine::{BreathEngine, StopSignal};
pub use narration::Narrator;
pub use session::SessionSummary;
