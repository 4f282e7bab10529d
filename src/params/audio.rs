//! Audio analysis configuration.

use serde::{Deserialize, Serialize};

/// How raw band magnitudes are mapped into [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BandNormalization {
    /// Magnitude in decibels mapped linearly from `floor_db..ceil_db` and clamped
    Fixed { floor_db: f32, ceil_db: f32 },

    /// Magnitude divided by a per-band running maximum that decays each analysis
    /// (multiplier per analysis, 0..1, closer to 1 = longer memory)
    RunningMax { decay: f32 },
}

impl Default for BandNormalization {
    fn default() -> Self {
        Self::Fixed {
            floor_db: -60.0,
            ceil_db: 60.0,
        }
    }
}

/// Spectral analysis and envelope configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Frames pulled from the source per read (at 44.1 kHz, 1024 ≈ 23 ms)
    pub chunk_frames: usize,

    /// FFT window size (must be power of 2); analysed over the most recent samples
    pub fft_size: usize,

    /// Number of log-spaced output bands
    pub band_count: usize,

    /// Lowest band edge (Hz); the highest edge is always Nyquist
    pub min_frequency_hz: f32,

    /// EMA factor applied to bands (1.0 = no smoothing, 0.3 = default)
    pub band_smoothing: f32,

    /// Envelope rise time constant (milliseconds)
    pub attack_ms: f32,

    /// Envelope fall time constant (milliseconds)
    pub release_ms: f32,

    /// Band normalisation mode
    pub normalization: BandNormalization,

    /// Analyse a single channel instead of the mono downmix
    pub channel: Option<usize>,

    /// Energy ratio over the previous analysis that counts as a beat
    pub beat_threshold: f32,

    /// Shortest gap between two beats (milliseconds of audio)
    pub min_beat_interval_ms: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            chunk_frames: 1024,
            fft_size: 2048,
            band_count: 64,
            min_frequency_hz: 20.0,
            band_smoothing: 0.3,
            attack_ms: 5.0,
            release_ms: 300.0,
            normalization: BandNormalization::default(),
            channel: None,
            beat_threshold: 1.5,
            min_beat_interval_ms: 100.0,
        }
    }
}

impl AnalysisConfig {
    /// Validate configuration (FFT size must be power of 2, attack not slower than release, etc.)
    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() {
            return Err(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            ));
        }
        if self.chunk_frames == 0 {
            return Err("Chunk size must be > 0".to_string());
        }
        if self.band_count == 0 || self.band_count > self.fft_size / 2 {
            return Err(format!(
                "Band count must be in 1..={}, got {}",
                self.fft_size / 2,
                self.band_count
            ));
        }
        if !(self.min_frequency_hz > 0.0) {
            return Err("Minimum band frequency must be > 0 Hz".to_string());
        }
        if !(self.band_smoothing > 0.0 && self.band_smoothing <= 1.0) {
            return Err(format!(
                "Band smoothing must be in (0, 1], got {}",
                self.band_smoothing
            ));
        }
        if !(self.attack_ms > 0.0 && self.release_ms > 0.0) {
            return Err("Envelope time constants must be > 0".to_string());
        }
        if self.attack_ms > self.release_ms {
            return Err(format!(
                "Envelope attack ({} ms) must not be slower than release ({} ms)",
                self.attack_ms, self.release_ms
            ));
        }
        if !(self.beat_threshold > 1.0) {
            return Err(format!(
                "Beat threshold must be > 1, got {}",
                self.beat_threshold
            ));
        }
        if !(self.min_beat_interval_ms >= 0.0) {
            return Err("Minimum beat interval must be >= 0 ms".to_string());
        }
        match self.normalization {
            BandNormalization::Fixed { floor_db, ceil_db } if floor_db >= ceil_db => Err(format!(
                "Normalisation floor ({} dB) must be below ceiling ({} dB)",
                floor_db, ceil_db
            )),
            BandNormalization::RunningMax { decay } if !(0.0..=1.0).contains(&decay) => {
                Err(format!("Running-max decay must be in [0, 1], got {}", decay))
            }
            _ => Ok(()),
        }
    }

    /// Width of one FFT bin at the given sample rate (Hz)
    pub fn bin_width_hz(&self, sample_rate_hz: u32) -> f32 {
        sample_rate_hz as f32 / self.fft_size as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_slow_attack() {
        let config = AnalysisConfig {
            attack_ms: 500.0,
            release_ms: 100.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_power_of_two_fft() {
        let config = AnalysisConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_beat_threshold_at_unity() {
        let config = AnalysisConfig {
            beat_threshold: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bin_width() {
        let config = AnalysisConfig::default();
        // 44100 / 2048 ≈ 21.5 Hz per bin
        assert!((config.bin_width_hz(44100) - 21.533).abs() < 0.01);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AnalysisConfig = serde_json::from_str(
            r#"{ "band_count": 16, "normalization": { "mode": "running_max", "decay": 0.99 } }"#,
        )
        .unwrap();
        assert_eq!(config.band_count, 16);
        assert_eq!(config.fft_size, 2048);
        assert_eq!(
            config.normalization,
            BandNormalization::RunningMax { decay: 0.99 }
        );
    }
}
