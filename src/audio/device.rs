//! Live capture from an input device through cpal.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use tracing::{error, info, warn};

use super::source::{AudioChunk, AudioSource, SourceInfo};
use crate::error::{ObliqueError, Result};

/// Seconds of audio retained when the consumer falls behind
const MAX_BUFFERED_SECS: usize = 2;

/// Names of all capture devices on the default host
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| ObliqueError::AudioSource(format!("Failed to enumerate devices: {}", e)))?;
    Ok(devices
        .map(|d| d.name().unwrap_or_else(|_| "Unknown".to_string()))
        .collect())
}

/// Live input device. The cpal stream is created in `start` so the source
/// can be opened on the thread that drives it.
pub struct DeviceSource {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
    info: SourceInfo,
    buffer: Arc<Mutex<VecDeque<f32>>>,
    stream: Option<cpal::Stream>,
    frames_read: u64,
    last: Option<AudioChunk>,
}

impl DeviceSource {
    /// Open the named input device, or the default one when `name` is `None`
    pub fn open(name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = match name {
            Some(wanted) => host
                .input_devices()
                .map_err(|e| ObliqueError::AudioSource(format!("Failed to enumerate devices: {}", e)))?
                .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
                .ok_or_else(|| {
                    ObliqueError::AudioSource(format!("No input device named '{}'", wanted))
                })?,
            None => host
                .default_input_device()
                .ok_or_else(|| ObliqueError::AudioSource("No audio input device found".into()))?,
        };

        let config = device
            .default_input_config()
            .map_err(|e| ObliqueError::AudioSource(format!("Failed to get input config: {}", e)))?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        info!(
            "Audio input: {} @ {}Hz, {} ch",
            device_name,
            config.sample_rate().0,
            config.channels()
        );

        let info = SourceInfo {
            name: device_name,
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
            duration_secs: None,
            paced: false,
        };

        Ok(Self {
            device,
            config,
            info,
            buffer: Arc::new(Mutex::new(VecDeque::new())),
            stream: None,
            frames_read: 0,
            last: None,
        })
    }

    fn build_stream<T>(&self) -> Result<cpal::Stream>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        let buffer = Arc::clone(&self.buffer);
        let capacity =
            MAX_BUFFERED_SECS * self.info.sample_rate as usize * self.info.channels as usize;

        self.device
            .build_input_stream(
                &self.config.clone().into(),
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(data.iter().map(|s| s.to_sample::<f32>()));
                        let excess = buf.len().saturating_sub(capacity);
                        if excess > 0 {
                            buf.drain(..excess);
                        }
                    }
                },
                |err| error!("Audio input stream error: {}", err),
                None,
            )
            .map_err(|e| ObliqueError::AudioSource(format!("Failed to build input stream: {}", e)))
    }
}

impl AudioSource for DeviceSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn start(&mut self) -> Result<()> {
        let stream = match self.config.sample_format() {
            cpal::SampleFormat::F32 => self.build_stream::<f32>()?,
            cpal::SampleFormat::I16 => self.build_stream::<i16>()?,
            cpal::SampleFormat::U16 => self.build_stream::<u16>()?,
            cpal::SampleFormat::I32 => self.build_stream::<i32>()?,
            other => {
                return Err(ObliqueError::AudioSource(format!(
                    "Unsupported input sample format {:?}",
                    other
                )))
            }
        };
        stream
            .play()
            .map_err(|e| ObliqueError::AudioSource(format!("Failed to start input stream: {}", e)))?;
        self.stream = Some(stream);
        self.frames_read = 0;
        Ok(())
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            info!("Audio input stopped: {}", self.info.name);
        }
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
        self.last = None;
    }

    fn read(&mut self, frames: usize) -> Option<AudioChunk> {
        self.stream.as_ref()?;
        let wanted = frames * self.info.channels as usize;
        let samples: Vec<f32> = {
            let mut buf = match self.buffer.lock() {
                Ok(buf) => buf,
                Err(_) => {
                    warn!("Audio input buffer poisoned");
                    return None;
                }
            };
            if buf.len() < wanted {
                return None;
            }
            buf.drain(..wanted).collect()
        };
        let chunk = AudioChunk {
            samples,
            channels: self.info.channels,
            sample_rate: self.info.sample_rate,
            position_secs: self.frames_read as f64 / self.info.sample_rate as f64,
        };
        self.frames_read += frames as u64;
        self.last = Some(chunk.clone());
        Some(chunk)
    }

    fn peek(&self) -> Option<&AudioChunk> {
        self.last.as_ref()
    }

    fn is_exhausted(&self) -> bool {
        self.stream.is_none()
    }
}
