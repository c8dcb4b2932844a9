//! Deterministic procedural audio source.
//!
//! Produces analyser frames directly (no FFT) from a timeline of signal
//! segments. Each kind has its own spectral shape inside the 80-600 Hz
//! breath band and its own carrier for the time-domain block:
//!
//! | kind    | band magnitudes                        | carrier       |
//! |---------|----------------------------------------|---------------|
//! | silence | flat floor 0.05                        | 200 Hz, faint |
//! | inhale  | floor + bump at 230 Hz, sin-shaped     | 300 Hz        |
//! | exhale  | floor + bump at 190 Hz, sin-shaped     | 300 Hz        |
//! | speech  | rising tilt, formant peaks, syllables  | 3 kHz         |
//!
//! Bin jitter comes from a seeded `StdRng`, so identical plans and seeds
//! yield identical frames.

use std::f64::consts::PI;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::source::{AudioFrame, AudioInput, InputState};
use crate::error::AudioError;

pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_SEED: u64 = 0x5eed_b4ea;

const NOISE_FLOOR: f64 = 0.05;
const FLOOR_JITTER: f64 = 0.01;
const BREATH_PEAK: f64 = 0.3;
const BREATH_WIDTH_HZ: f64 = 120.0;
const INHALE_CENTRE_HZ: f64 = 230.0;
const EXHALE_CENTRE_HZ: f64 = 190.0;
const SPEECH_FORMANTS_HZ: [f64; 3] = [350.0, 450.0, 550.0];
const SYLLABLE_RATE_HZ: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Silence,
    Inhale,
    Exhale,
    Speech,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSegment {
    pub kind: SignalKind,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl SignalSegment {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Position of `t_ms` within the segment (0.0 to 1.0)
    pub fn progress(&self, t_ms: u64) -> f64 {
        let duration = self.duration_ms();
        if duration == 0 {
            return 1.0;
        }
        (t_ms.saturating_sub(self.start_ms) as f64 / duration as f64).clamp(0.0, 1.0)
    }
}

/// Timeline of back-to-back segments; silence before and after
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalPlan {
    segments: Vec<SignalSegment>,
}

impl SignalPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Silence forever
    pub fn silence() -> Self {
        Self::default()
    }

    /// Append a segment starting where the previous one ends
    pub fn then(mut self, kind: SignalKind, duration_ms: u64) -> Self {
        let start_ms = self.end_ms();
        self.segments.push(SignalSegment {
            kind,
            start_ms,
            end_ms: start_ms + duration_ms,
        });
        self
    }

    /// End of the last segment
    pub fn end_ms(&self) -> u64 {
        self.segments.last().map(|s| s.end_ms).unwrap_or(0)
    }

    pub fn segments(&self) -> &[SignalSegment] {
        &self.segments
    }

    /// Segment covering `t_ms`, if any
    pub fn segment_at(&self, t_ms: u64) -> Option<&SignalSegment> {
        self.segments
            .iter()
            .find(|s| s.start_ms <= t_ms && t_ms < s.end_ms)
    }

    /// A user following the calibration prompts with instant narration
    ///
    /// Silence and talking cover their 6 s capture windows plus the settle
    /// delay; the inhale and exhale start shortly after their prompts.
    pub fn calibration_script() -> Self {
        Self::new()
            .then(SignalKind::Silence, 6500)
            .then(SignalKind::Speech, 6500)
            .then(SignalKind::Silence, 1000)
            .then(SignalKind::Inhale, 4000)
            .then(SignalKind::Silence, 1500)
            .then(SignalKind::Exhale, 4000)
            .then(SignalKind::Silence, 1000)
    }

    /// Append `rounds` breaths of the given timing
    pub fn breathing(mut self, rounds: u32, inhale_ms: u64, exhale_ms: u64, hold_ms: u64) -> Self {
        for _ in 0..rounds {
            self = self
                .then(SignalKind::Inhale, inhale_ms)
                .then(SignalKind::Silence, hold_ms)
                .then(SignalKind::Exhale, exhale_ms)
                .then(SignalKind::Silence, hold_ms);
        }
        self
    }
}

/// Procedural input following a [`SignalPlan`]
pub struct SyntheticInput {
    plan: SignalPlan,
    state: InputState,
    sample_rate: u32,
    fft_size: usize,
    rng: StdRng,
    start_suspended: bool,
}

impl SyntheticInput {
    pub fn new(plan: SignalPlan, fft_size: usize) -> Self {
        Self::with_seed(plan, fft_size, DEFAULT_SEED)
    }

    pub fn with_seed(plan: SignalPlan, fft_size: usize, seed: u64) -> Self {
        Self {
            plan,
            state: InputState::Stopped,
            sample_rate: DEFAULT_SAMPLE_RATE,
            fft_size: fft_size.max(2),
            rng: StdRng::seed_from_u64(seed),
            start_suspended: false,
        }
    }

    /// Open in the suspended state, like a browser audio context
    pub fn start_suspended(mut self) -> Self {
        self.start_suspended = true;
        self
    }

    pub fn plan(&self) -> &SignalPlan {
        &self.plan
    }

    /// Generate the frame heard at `t_ms`
    pub fn render(&mut self, t_ms: u64) -> AudioFrame {
        let (kind, progress) = match self.plan.segment_at(t_ms) {
            Some(segment) => (segment.kind, segment.progress(t_ms)),
            None => (SignalKind::Silence, 0.0),
        };

        let bins = self.fft_size / 2;
        let bin_width = self.sample_rate as f64 / self.fft_size as f64;
        let syllable = self.syllable_gain(t_ms);

        let magnitudes = (0..bins)
            .map(|bin| {
                let freq = bin as f64 * bin_width;
                let jitter = self.rng.gen_range(-FLOOR_JITTER..FLOOR_JITTER);
                let level = match kind {
                    SignalKind::Silence => NOISE_FLOOR + jitter,
                    SignalKind::Inhale => {
                        NOISE_FLOOR + jitter + breath_bump(freq, INHALE_CENTRE_HZ, progress)
                    }
                    SignalKind::Exhale => {
                        NOISE_FLOOR + jitter + breath_bump(freq, EXHALE_CENTRE_HZ, progress)
                    }
                    SignalKind::Speech => speech_level(freq) * syllable + jitter,
                };
                level.clamp(0.0, 1.0) as f32
            })
            .collect();

        let (carrier_hz, amplitude) = match kind {
            SignalKind::Silence => (200.0, 0.002),
            SignalKind::Inhale | SignalKind::Exhale => {
                (300.0, 0.01 + 0.1 * (PI * progress).sin())
            }
            SignalKind::Speech => (3000.0, 0.2 * syllable),
        };
        let offset = self.rng.gen_range(0.0..(2.0 * PI));
        let samples = (0..self.fft_size)
            .map(|i| {
                let t = i as f64 / self.sample_rate as f64;
                (amplitude * (2.0 * PI * carrier_hz * t + offset).sin()) as f32
            })
            .collect();

        AudioFrame {
            magnitudes,
            samples,
            sample_rate: self.sample_rate,
        }
    }

    fn syllable_gain(&mut self, t_ms: u64) -> f64 {
        let t = t_ms as f64 / 1000.0;
        let envelope = 0.6 + 0.4 * (2.0 * PI * SYLLABLE_RATE_HZ * t).sin().abs();
        envelope * self.rng.gen_range(0.85..1.15)
    }
}

fn breath_bump(freq: f64, centre: f64, progress: f64) -> f64 {
    let intensity = (PI * progress).sin().max(0.0);
    let distance = (freq - centre) / BREATH_WIDTH_HZ;
    BREATH_PEAK * intensity * (-0.5 * distance * distance).exp()
}

fn speech_level(freq: f64) -> f64 {
    let tilt = 0.25 + 0.5 * (freq / 600.0).min(1.0);
    let formants: f64 = SPEECH_FORMANTS_HZ
        .iter()
        .map(|centre| {
            let distance = (freq - centre) / 25.0;
            0.4 * (-0.5 * distance * distance).exp()
        })
        .sum();
    tilt + formants
}

impl AudioInput for SyntheticInput {
    fn start(&mut self) -> Result<(), AudioError> {
        if self.state != InputState::Stopped {
            return Err(AudioError::AlreadyRunning);
        }
        self.state = if self.start_suspended {
            InputState::Suspended
        } else {
            InputState::Running
        };
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        if self.state == InputState::Stopped {
            return Err(AudioError::NotRunning);
        }
        self.state = InputState::Stopped;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        match self.state {
            InputState::Stopped => Err(AudioError::NotRunning),
            _ => {
                self.state = InputState::Running;
                Ok(())
            }
        }
    }

    fn state(&self) -> InputState {
        self.state
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_frame(&mut self, now: Duration) -> Result<AudioFrame, AudioError> {
        if self.state != InputState::Running {
            return Err(AudioError::NotRunning);
        }
        Ok(self.render(now.as_millis() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::features::{compute_zcr, SpectralFeatures};

    fn band_rms(frame: &AudioFrame) -> f64 {
        SpectralFeatures::new(frame.sample_rate, 2048).compute_band_rms(&frame.magnitudes)
    }

    fn centroid(frame: &AudioFrame) -> f64 {
        SpectralFeatures::new(frame.sample_rate, 2048).compute_centroid(&frame.magnitudes)
    }

    #[test]
    fn test_plan_segments_are_contiguous() {
        let plan = SignalPlan::calibration_script();
        for pair in plan.segments().windows(2) {
            assert_eq!(pair[0].end_ms, pair[1].start_ms);
        }
        assert_eq!(plan.segment_at(7000).map(|s| s.kind), Some(SignalKind::Speech));
        assert_eq!(plan.segment_at(plan.end_ms()), None);
    }

    #[test]
    fn test_same_seed_same_frames() {
        let plan = SignalPlan::new().then(SignalKind::Speech, 1000);
        let mut a = SyntheticInput::new(plan.clone(), 2048);
        let mut b = SyntheticInput::new(plan, 2048);
        assert_eq!(a.render(500), b.render(500));
    }

    #[test]
    fn test_silence_floor() {
        let mut input = SyntheticInput::new(SignalPlan::silence(), 2048);
        let frame = input.render(0);
        assert_eq!(frame.magnitudes.len(), 1024);
        assert_eq!(frame.samples.len(), 2048);
        assert!((band_rms(&frame) - NOISE_FLOOR).abs() < 0.01);
        assert!(compute_zcr(&frame.samples) < 0.02);
    }

    #[test]
    fn test_breath_sits_between_silence_and_speech() {
        let plan = SignalPlan::new()
            .then(SignalKind::Inhale, 4000)
            .then(SignalKind::Speech, 4000);
        let mut input = SyntheticInput::new(plan, 2048);

        let breath = input.render(2000);
        let speech = input.render(6000);

        assert!(band_rms(&breath) > NOISE_FLOOR * 2.0);
        assert!(band_rms(&breath) < band_rms(&speech));
        assert!(centroid(&breath) < centroid(&speech));
        assert!(compute_zcr(&breath.samples) < compute_zcr(&speech.samples));
    }

    #[test]
    fn test_lifecycle() {
        let mut input = SyntheticInput::new(SignalPlan::silence(), 2048).start_suspended();
        assert!(matches!(input.read_frame(Duration::ZERO), Err(AudioError::NotRunning)));

        input.start().unwrap();
        assert_eq!(input.state(), InputState::Suspended);
        assert!(input.read_frame(Duration::ZERO).is_err());

        input.resume().unwrap();
        assert!(input.read_frame(Duration::from_millis(50)).is_ok());
        assert!(matches!(input.start(), Err(AudioError::AlreadyRunning)));

        input.stop().unwrap();
        assert_eq!(input.state(), InputState::Stopped);
    }
}
