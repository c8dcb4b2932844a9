//! Live capture from the default input device (cpal + rtrb).
//!
//! The cpal stream lives on its own thread because streams are not `Send`
//! on every platform. The input callback downmixes to mono and pushes into a
//! lock-free SPSC ring; each `read_frame` drains the ring into the rolling
//! analyser window. Device failures surface once from `start`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, RingBuffer};

use super::source::{AudioFrame, AudioInput, InputState, SampleWindow};
use crate::config::AudioConfig;
use crate::error::AudioError;

/// Seconds of audio the ring can hold between two reads
const RING_SECONDS: usize = 2;

struct CaptureThread {
    handle: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
}

pub struct MicrophoneInput {
    config: AudioConfig,
    window: SampleWindow,
    consumer: Option<Consumer<f32>>,
    capture: Option<CaptureThread>,
    sample_rate: u32,
    state: InputState,
}

impl MicrophoneInput {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            config: config.clone(),
            window: SampleWindow::new(config),
            consumer: None,
            capture: None,
            sample_rate: 0,
            state: InputState::Stopped,
        }
    }
}

fn open_device() -> Result<(cpal::Device, cpal::SupportedStreamConfig), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| AudioError::StreamOpenFailed {
            reason: "No default input device found".to_string(),
        })?;
    let config = device
        .default_input_config()
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Failed to get default input config: {}", e),
        })?;
    Ok((device, config))
}

fn push_mono(producer: &mut Producer<f32>, data: &[f32], channels: usize) {
    for frame in data.chunks(channels) {
        let mono = frame.iter().sum::<f32>() / frame.len() as f32;
        // analysis fell behind: drop the newest samples
        if producer.push(mono).is_err() {
            break;
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    supported: &cpal::SupportedStreamConfig,
    mut producer: Producer<f32>,
) -> Result<cpal::Stream, AudioError> {
    let stream_config: cpal::StreamConfig = supported.clone().into();
    let channels = stream_config.channels.max(1) as usize;
    let err_fn = |err| log::error!("[MicrophoneInput] Stream error: {}", err);

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                push_mono(&mut producer, data, channels);
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let converted: Vec<f32> =
                    data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                push_mono(&mut producer, &converted, channels);
            },
            err_fn,
            None,
        ),
        other => {
            return Err(AudioError::UnsupportedFormat {
                details: format!("{:?}", other),
            })
        }
    };

    stream.map_err(|e| AudioError::StreamOpenFailed {
        reason: e.to_string(),
    })
}

impl AudioInput for MicrophoneInput {
    fn start(&mut self) -> Result<(), AudioError> {
        if self.state != InputState::Stopped {
            return Err(AudioError::AlreadyRunning);
        }

        let (device, supported) = open_device()?;
        let sample_rate = supported.sample_rate().0;
        let (producer, consumer) = RingBuffer::new(sample_rate as usize * RING_SECONDS);

        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), AudioError>>();

        let handle = thread::Builder::new()
            .name("breathsync-capture".to_string())
            .spawn(move || {
                let stream = match build_stream(&device, &supported, producer) {
                    Ok(stream) => stream,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(AudioError::HardwareError {
                        details: e.to_string(),
                    }));
                    return;
                }
                let _ = ready_tx.send(Ok(()));
                while !thread_shutdown.load(Ordering::Acquire) {
                    thread::park_timeout(Duration::from_millis(100));
                }
                drop(stream);
            })
            .map_err(|e| AudioError::HardwareError {
                details: e.to_string(),
            })?;

        let ready = ready_rx.recv().unwrap_or_else(|_| {
            Err(AudioError::HardwareError {
                details: "capture thread exited".to_string(),
            })
        });
        if let Err(err) = ready {
            let _ = handle.join();
            return Err(err);
        }

        log::info!("[MicrophoneInput] Capturing at {} Hz", sample_rate);
        self.sample_rate = sample_rate;
        self.consumer = Some(consumer);
        self.window = SampleWindow::new(&self.config);
        self.capture = Some(CaptureThread { handle, shutdown });
        self.state = InputState::Running;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        let capture = self.capture.take().ok_or(AudioError::NotRunning)?;
        capture.shutdown.store(true, Ordering::Release);
        capture.handle.thread().unpark();
        let _ = capture.handle.join();
        self.consumer = None;
        self.window.clear();
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

    fn read_frame(&mut self, _now: Duration) -> Result<AudioFrame, AudioError> {
        if self.state != InputState::Running {
            return Err(AudioError::NotRunning);
        }
        let consumer = self.consumer.as_mut().ok_or(AudioError::NotRunning)?;
        let available = consumer.slots();
        if let Ok(chunk) = consumer.read_chunk(available) {
            self.window.extend(chunk.into_iter());
        }
        Ok(self.window.snapshot(self.sample_rate))
    }
}

impl Drop for MicrophoneInput {
    fn drop(&mut self) {
        if self.capture.is_some() {
            let _ = self.stop();
        }
    }
}
