//! WAV file playback as an audio input.
//!
//! The whole file is decoded and downmixed to mono when the input starts.
//! Each read advances a cursor to the scheduler time, feeds the newly
//! elapsed samples into the rolling analyser window and snapshots it.
//! Past the end of the file the input keeps delivering silence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::source::{AudioFrame, AudioInput, InputState, SampleWindow};
use crate::config::AudioConfig;
use crate::error::AudioError;

pub struct WavInput {
    path: PathBuf,
    config: AudioConfig,
    samples: Vec<f32>,
    sample_rate: u32,
    cursor: usize,
    window: SampleWindow,
    state: InputState,
}

impl WavInput {
    pub fn new<P: AsRef<Path>>(path: P, config: &AudioConfig) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config: config.clone(),
            samples: Vec::new(),
            sample_rate: 0,
            cursor: 0,
            window: SampleWindow::new(config),
            state: InputState::Stopped,
        }
    }

    /// Length of the decoded file
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    fn decode(&mut self) -> Result<(), AudioError> {
        let mut reader = hound::WavReader::open(&self.path)?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()?
            }
        };

        self.samples = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();
        self.sample_rate = spec.sample_rate;

        log::info!(
            "[WavInput] Loaded {:?}: {} Hz, {} channel(s), {:.1}s",
            self.path,
            spec.sample_rate,
            channels,
            self.duration().as_secs_f64()
        );
        Ok(())
    }
}

impl AudioInput for WavInput {
    fn start(&mut self) -> Result<(), AudioError> {
        if self.state != InputState::Stopped {
            return Err(AudioError::AlreadyRunning);
        }
        self.decode()?;
        self.cursor = 0;
        self.window = SampleWindow::new(&self.config);
        self.state = InputState::Running;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        if self.state == InputState::Stopped {
            return Err(AudioError::NotRunning);
        }
        self.state = InputState::Stopped;
        self.samples.clear();
        self.window.clear();
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

        let target = (now.as_secs_f64() * self.sample_rate as f64) as usize;
        if target > self.cursor {
            let available = self.samples.len();
            let from = self.cursor.min(available);
            let to = target.min(available);
            self.window.extend(self.samples[from..to].iter().copied());
            // past the end of the file
            self.window
                .extend(std::iter::repeat(0.0).take(target - self.cursor - (to - from)));
            self.cursor = target;
        }

        Ok(self.window.snapshot(self.sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_sine(path: &Path, freq: f32, secs: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let total = (16_000.0 * secs) as usize;
        for i in 0..total {
            let t = i as f32 / 16_000.0;
            let sample = (0.5 * (2.0 * std::f32::consts::PI * freq * t).sin() * i16::MAX as f32) as i16;
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_missing_file_fails_to_start() {
        let mut input = WavInput::new("/definitely/not/here.wav", &AudioConfig::default());
        assert!(input.start().is_err());
        assert_eq!(input.state(), InputState::Stopped);
    }

    #[test]
    fn test_playback_follows_clock() {
        let path = std::env::temp_dir().join(format!("breathsync_wav_{}.wav", std::process::id()));
        write_sine(&path, 250.0, 1.0);

        let mut input = WavInput::new(&path, &AudioConfig::default());
        input.start().unwrap();
        assert_eq!(input.sample_rate(), 16_000);
        assert!((input.duration().as_secs_f64() - 1.0).abs() < 1e-3);

        let early = input.read_frame(Duration::from_millis(500)).unwrap();
        assert_eq!(early.samples.len(), 2048);
        assert!(early.magnitudes.iter().any(|&m| m > 0.5));

        // two seconds past the end: the window holds silence only
        let late = input.read_frame(Duration::from_millis(3000)).unwrap();
        assert!(late.samples.iter().all(|&s| s == 0.0));

        input.stop().unwrap();
        let _ = std::fs::remove_file(&path);
    }
}
