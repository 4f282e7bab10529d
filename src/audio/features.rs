//! Per-tick audio feature extraction.

use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::bands::BandMapper;
use super::envelope::EnvelopeFollower;
use super::hann_window;
use super::onset::{zero_crossing_rate, OnsetDetector};
use super::source::{AudioChunk, SourceInfo};
use crate::error::{ObliqueError, Result};
use crate::params::AnalysisConfig;

/// Immutable snapshot of the audio analysis for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFeatureFrame {
    /// Log-spaced band magnitudes, each in [0, 1]
    pub bands: Vec<f32>,
    /// Smoothed amplitude follower
    pub envelope: f32,
    /// Maximum absolute sample of the audio drained this tick
    pub peak: f32,
    /// Root-mean-square amplitude of the audio drained this tick
    pub rms: f32,
    /// Mean band value
    pub energy: f32,
    /// Band mean weighted toward high frequencies
    pub brightness: f32,
    /// Rectified spectral change since the previous analysis
    pub flux: f32,
    /// Energy onset detected this tick
    pub beat: bool,
    /// Sign changes per sample, in [0, 1]
    pub zcr: f32,
    /// Playback position (seconds)
    pub position_secs: f64,
    /// Total length (seconds), 0 for live input
    pub duration_secs: f64,
    pub is_playing: bool,
}

impl AudioFeatureFrame {
    /// All-zero frame used before any audio has arrived
    pub fn silent(band_count: usize) -> Self {
        Self {
            bands: vec![0.0; band_count],
            envelope: 0.0,
            peak: 0.0,
            rms: 0.0,
            energy: 0.0,
            brightness: 0.0,
            flux: 0.0,
            beat: false,
            zcr: 0.0,
            position_secs: 0.0,
            duration_secs: 0.0,
            is_playing: false,
        }
    }
}

/// Turns drained audio chunks into [`AudioFeatureFrame`]s.
///
/// The only state carried between ticks is the analysis ring buffer, the band
/// smoothing, the running maxima, the onset history and the envelope follower.
pub struct FeatureExtractor {
    config: AnalysisConfig,
    sample_rate: u32,
    duration_secs: f64,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    ring: VecDeque<f32>,
    spectrum: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
    mapper: BandMapper,
    smoothed: Option<Vec<f32>>,
    envelope: EnvelopeFollower,
    onset: OnsetDetector,
    last: AudioFeatureFrame,
}

impl FeatureExtractor {
    pub fn new(config: AnalysisConfig, source: &SourceInfo) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ObliqueError::Config(format!("Invalid analysis config: {}", e)))?;
        if source.sample_rate == 0 {
            return Err(ObliqueError::Config("Sample rate must be > 0".to_string()));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let window = (0..config.fft_size)
            .map(|i| hann_window(i, config.fft_size))
            .collect();
        let mapper = BandMapper::new(
            config.band_count,
            config.fft_size,
            source.sample_rate,
            config.min_frequency_hz,
            config.normalization,
        );
        let mut last = AudioFeatureFrame::silent(config.band_count);
        last.duration_secs = source.duration_secs.unwrap_or(0.0);

        Ok(Self {
            sample_rate: source.sample_rate,
            duration_secs: source.duration_secs.unwrap_or(0.0),
            fft,
            window,
            ring: VecDeque::from(vec![0.0; config.fft_size]),
            spectrum: vec![Complex::new(0.0, 0.0); config.fft_size],
            magnitudes: vec![0.0; config.fft_size / 2 + 1],
            mapper,
            smoothed: None,
            envelope: EnvelopeFollower::new(config.attack_ms, config.release_ms),
            onset: OnsetDetector::new(
                config.fft_size / 2 + 1,
                config.beat_threshold,
                config.min_beat_interval_ms,
            ),
            last,
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Frame produced by the most recent call to [`process`](Self::process)
    pub fn last_frame(&self) -> &AudioFeatureFrame {
        &self.last
    }

    /// Analyse every chunk drained this tick. With no new audio the previous
    /// frame's features are held and only `is_playing` is refreshed.
    pub fn process(&mut self, chunks: &[AudioChunk], is_playing: bool) -> AudioFeatureFrame {
        let mono: Vec<f32> = chunks
            .iter()
            .flat_map(|chunk| chunk.mono(self.config.channel))
            .collect();
        if mono.is_empty() {
            self.last.is_playing = is_playing;
            return self.last.clone();
        }

        let peak = mono.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        let mean_square = mono.iter().map(|s| s * s).sum::<f32>() / mono.len() as f32;
        let rms = mean_square.sqrt();
        let zcr = zero_crossing_rate(&mono);

        let fft_size = self.config.fft_size;
        let fresh = &mono[mono.len().saturating_sub(fft_size)..];
        self.ring.drain(..fresh.len());
        self.ring.extend(fresh.iter().copied());

        let bands = self.analyse_spectrum();
        let energy = bands.iter().sum::<f32>() / bands.len() as f32;
        let brightness = brightness(&bands);

        let scale = 2.0 / fft_size as f32;
        let amplitudes: Vec<f32> = self.magnitudes.iter().map(|m| m * scale).collect();
        let flux = self.onset.flux(&amplitudes);

        let dt = mono.len() as f32 / self.sample_rate as f32;
        let envelope = self.envelope.process(peak, dt);
        let beat = self.onset.beat(mean_square, dt);

        let position_secs = chunks
            .last()
            .map(|c| c.end_secs())
            .unwrap_or(self.last.position_secs);

        self.last = AudioFeatureFrame {
            bands,
            envelope,
            peak,
            rms,
            energy,
            brightness,
            flux,
            beat,
            zcr,
            position_secs,
            duration_secs: self.duration_secs,
            is_playing,
        };
        self.last.clone()
    }

    fn analyse_spectrum(&mut self) -> Vec<f32> {
        for ((slot, &sample), &w) in self.spectrum.iter_mut().zip(&self.ring).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.spectrum);
        for (mag, bin) in self.magnitudes.iter_mut().zip(&self.spectrum) {
            *mag = bin.norm();
        }

        let bands = self.mapper.map(&self.magnitudes);
        let alpha = self.config.band_smoothing;
        let smoothed = match self.smoothed.take() {
            Some(previous) => bands
                .iter()
                .zip(&previous)
                .map(|(new, old)| alpha * new + (1.0 - alpha) * old)
                .collect(),
            None => bands,
        };
        self.smoothed = Some(smoothed.clone());
        smoothed
    }
}

fn brightness(bands: &[f32]) -> f32 {
    let n = bands.len() as f32;
    let (weighted, weights) = bands
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(acc, total), (i, &b)| {
            let w = (i as f32 + 1.0) / n;
            (acc + b * w, total + w)
        });
    weighted / weights
}
