// Audio module - input sources feeding the analysis loop

pub mod source;
pub mod synthetic;
pub mod wav;

#[cfg(feature = "microphone")]
pub mod microphone;

// Re-export commonly used types for convenience
pub use source::{AudioFrame, AudioInput, InputState, SampleWindow};
pub use synthetic::{SignalKind, SignalPlan, SignalSegment, SyntheticInput};
pub use wav::WavInput;

#[cfg(feature = "microphone")]
pub use microphone::MicrophoneInput;
