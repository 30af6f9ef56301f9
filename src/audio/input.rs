use crate::audio::{downmix, samples_for, AudioCapture};
use crate::{Result, SentioError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, StreamConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

/// Fixed-length recording from the default input device
pub struct MicrophoneCapture {
    device: Device,
}

impl MicrophoneCapture {
    /// Create a capture on the default input device
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| SentioError::Capture("No input device available".into()))?;

        info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        Ok(Self { device })
    }

    /// Find an f32 stream configuration running at `sample_rate`
    fn stream_config(&self, sample_rate: u32) -> Result<StreamConfig> {
        let supported = self
            .device
            .supported_input_configs()
            .map_err(|e| SentioError::Capture(format!("Failed to query input configs: {}", e)))?
            .filter(|range| range.sample_format() == SampleFormat::F32)
            .find(|range| {
                range.min_sample_rate().0 <= sample_rate && sample_rate <= range.max_sample_rate().0
            })
            .ok_or_else(|| {
                SentioError::Capture(format!(
                    "Input device cannot record f32 audio at {} Hz",
                    sample_rate
                ))
            })?;

        Ok(supported.with_sample_rate(SampleRate(sample_rate)).into())
    }
}

impl AudioCapture for MicrophoneCapture {
    fn capture(&mut self, duration: Duration, sample_rate: u32) -> Result<Vec<f32>> {
        let config = self.stream_config(sample_rate)?;
        let channels = config.channels as usize;
        let wanted = samples_for(duration, sample_rate);

        let recorded = Arc::new(Mutex::new(Vec::with_capacity(wanted)));
        let sink = Arc::clone(&recorded);

        let stream = self
            .device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mut buffer = sink.lock();
                    if buffer.len() < wanted {
                        buffer.extend(downmix(data, channels));
                    }
                },
                |err| error!("Audio input stream error: {}", err),
                None,
            )
            .map_err(|e| SentioError::Capture(format!("Failed to build input stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| SentioError::Capture(format!("Failed to start input stream: {}", e)))?;

        info!("Recording {:.1}s from microphone", duration.as_secs_f32());
        thread::sleep(duration);
        drop(stream);

        let mut samples = std::mem::take(&mut *recorded.lock());
        if samples.is_empty() {
            return Err(SentioError::Capture("Input device produced no audio".into()));
        }
        samples.resize(wanted, 0.0);

        info!("Recording complete: {} samples", samples.len());
        Ok(samples)
    }
}
