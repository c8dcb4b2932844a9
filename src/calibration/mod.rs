// Calibration module - per-user reference profiles
//
// Components:
// 1. CalibrationProfile: reference features per stage (state)
// 2. Stage captures: fixed windows and onset-timed breaths (capture)
// 3. CalibrationProcedure: the four-stage workflow (procedure)
// 4. CalibrationReport: measured pace vs target and session start values
//
// The calibration workflow:
// 1. Silence window → noise floor
// 2. Talking window → speech reference and slope variance
// 3. One inhale, timed from onset (defaults after 12 s)
// 4. One exhale, timed from onset (defaults after 12 s)

pub mod capture;
pub mod procedure;
pub mod progress;
pub mod report;
pub mod state;

pub use capture::{BreathDirection, CaptureStatus, StageOutcome};
pub use procedure::{completion_prompt, CalibrationProcedure};
pub use progress::{CalibrationProgress, CalibrationStage};
pub use report::CalibrationReport;
pub use state::{CalibrationProfile, SubProfile};
