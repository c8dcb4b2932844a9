//! Audio input abstraction.
//!
//! Every input hands the analysis loop the same thing on request: the current
//! analyser magnitudes for fft_size / 2 bins plus the latest block of
//! time-domain samples. Inputs are pulled, never pushed; the frame stream asks
//! for a frame once per tick.

use std::collections::VecDeque;
use std::time::Duration;

use crate::analysis::features::SpectrumAnalyser;
use crate::config::AudioConfig;
use crate::error::AudioError;

/// One analyser snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Normalized magnitudes (0.0 to 1.0), one per FFT bin
    pub magnitudes: Vec<f32>,
    /// Most recent time-domain samples (up to fft_size)
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioFrame {
    /// Frame with no energy in any bin
    pub fn silent(bins: usize, sample_rate: u32) -> Self {
        Self {
            magnitudes: vec![0.0; bins],
            samples: vec![0.0; bins * 2],
            sample_rate,
        }
    }
}

/// Lifecycle state of an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    Stopped,
    /// Opened but not delivering audio until resumed
    Suspended,
    Running,
}

/// Trait implemented by every audio source (synthetic, file, microphone).
pub trait AudioInput: Send {
    /// Open the input
    fn start(&mut self) -> Result<(), AudioError>;
    /// Close the input and release the device
    fn stop(&mut self) -> Result<(), AudioError>;
    /// Resume a suspended input
    fn resume(&mut self) -> Result<(), AudioError>;
    fn state(&self) -> InputState;
    fn sample_rate(&self) -> u32;
    /// Snapshot the analyser at scheduler time `now`
    ///
    /// Fails with [`AudioError::NotRunning`] unless the input is running.
    fn read_frame(&mut self, now: Duration) -> Result<AudioFrame, AudioError>;
}

/// Sliding window of the most recent samples plus the analyser that turns it
/// into magnitudes. Shared by the file and microphone inputs.
pub struct SampleWindow {
    samples: VecDeque<f32>,
    capacity: usize,
    analyser: SpectrumAnalyser,
}

impl SampleWindow {
    pub fn new(config: &AudioConfig) -> Self {
        let analyser = SpectrumAnalyser::new(config);
        let capacity = analyser.fft_size();
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            analyser,
        }
    }

    /// Append mono samples, keeping only the newest fft_size
    pub fn extend<I: IntoIterator<Item = f32>>(&mut self, samples: I) {
        for sample in samples {
            if self.samples.len() == self.capacity {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
        }
    }

    /// Run the analyser over the current window
    pub fn snapshot(&mut self, sample_rate: u32) -> AudioFrame {
        let samples: Vec<f32> = self.samples.iter().copied().collect();
        let magnitudes = self.analyser.analyse(&samples);
        AudioFrame {
            magnitudes,
            samples,
            sample_rate,
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.analyser.reset();
    }
}
