//! Engine module housing the runtime around the analysis core.
//!
//! `clock` abstracts time, `stream` pulls audio through the analyzer one
//! tick at a time, `context` bundles everything a flow drives, `calibrate`
//! runs the calibration stages and `core` exposes the `BreathEngine` facade.

pub mod calibrate;
pub mod clock;
pub mod context;
pub mod core;
pub mod stream;

pub use clock::{Scheduler, SystemScheduler, VirtualScheduler};
pub use context::EngineContext;
pub use self::core::BreathEngine;
pub use stream::{FrameStream, StopSignal};
