// Session module - guided paced-breathing rounds
//
// SessionController drives the rounds over an EngineContext; timing holds
// the adaptive pacing math, sync the per-phase synchrony score and state the
// round bookkeeping plus the final summary.

pub mod controller;
pub mod state;
pub mod sync;
pub mod timing;

pub use controller::SessionController;
pub use state::{PhaseKind, PhaseScore, SessionState, SessionSummary};
pub use sync::{SyncFeedback, SyncTracker};
pub use timing::AdaptiveTiming;
