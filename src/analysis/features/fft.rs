// FFT module - Analyser-style magnitude spectra
//
// Turns a block of time-domain samples into normalized magnitudes the way a
// browser AnalyserNode does: Blackman window, forward FFT, magnitude scaled
// by 1/N, temporal smoothing against the previous frame, conversion to dB
// and a linear map of [min_decibels, max_decibels] onto [0.0, 1.0].

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::config::AudioConfig;

/// Stateful spectrum analyser (owns the smoothing memory)
pub struct SpectrumAnalyser {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    /// Blackman window (pre-computed)
    window: Vec<f32>,
    /// Smoothed linear magnitudes from the previous frame
    smoothed: Vec<f64>,
    smoothing: f64,
    min_decibels: f64,
    max_decibels: f64,
    buffer: Vec<Complex<f32>>,
}

impl SpectrumAnalyser {
    /// Create an analyser from the audio configuration
    pub fn new(config: &AudioConfig) -> Self {
        let fft_size = config.fft_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        let n = fft_size as f32;
        let window = (0..fft_size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / n;
                0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
            })
            .collect();

        Self {
            fft,
            fft_size,
            window,
            smoothed: vec![0.0; fft_size / 2],
            smoothing: config.analyser_smoothing,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of magnitude bins produced per frame
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Analyse the most recent `fft_size` samples
    ///
    /// Shorter input is zero-padded at the front so the newest sample always
    /// sits at the end of the window.
    ///
    /// # Returns
    /// Normalized magnitudes (size = fft_size / 2), each in [0.0, 1.0]
    pub fn analyse(&mut self, samples: &[f32]) -> Vec<f32> {
        let start = samples.len().saturating_sub(self.fft_size);
        let recent = &samples[start..];
        let pad = self.fft_size - recent.len();

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { recent[i - pad] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        let scale = 1.0 / self.fft_size as f64;
        let range = self.max_decibels - self.min_decibels;
        let mut magnitudes = Vec::with_capacity(self.bin_count());

        for (bin, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.buffer[bin].norm() as f64 * scale;
            *smoothed = self.smoothing * *smoothed + (1.0 - self.smoothing) * magnitude;

            let normalized = if *smoothed > 0.0 {
                let decibels = 20.0 * smoothed.log10();
                ((decibels - self.min_decibels) / range).clamp(0.0, 1.0)
            } else {
                0.0
            };
            magnitudes.push(normalized as f32);
        }

        magnitudes
    }

    /// Forget the smoothing memory
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|s| *s = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / 48000.0).sin())
            .collect()
    }

    #[test]
    fn test_silence_maps_to_zero() {
        let mut analyser = SpectrumAnalyser::new(&AudioConfig::default());
        let magnitudes = analyser.analyse(&vec![0.0; 2048]);
        assert_eq!(magnitudes.len(), 1024);
        assert!(magnitudes.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let mut analyser = SpectrumAnalyser::new(&AudioConfig::default());
        let magnitudes = analyser.analyse(&sine(1000.0, 0.01, 2048));

        let peak = magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        // 1000 Hz / 23.4375 Hz per bin = 42.67
        assert!(peak == 42 || peak == 43, "peak at bin {}", peak);
        assert!(magnitudes.iter().all(|&m| (0.0..=1.0).contains(&m)));
    }

    #[test]
    fn test_smoothing_carries_over_between_frames() {
        let mut analyser = SpectrumAnalyser::new(&AudioConfig::default());
        analyser.analyse(&sine(1000.0, 0.01, 2048));
        let after_silence = analyser.analyse(&vec![0.0; 2048]);
        assert!(after_silence[43] > 0.0 || after_silence[42] > 0.0);

        analyser.reset();
        let fresh = analyser.analyse(&vec![0.0; 2048]);
        assert!(fresh.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_short_input_is_padded() {
        let mut analyser = SpectrumAnalyser::new(&AudioConfig::default());
        let magnitudes = analyser.analyse(&sine(500.0, 0.5, 300));
        assert_eq!(magnitudes.len(), analyser.bin_count());
    }
}
