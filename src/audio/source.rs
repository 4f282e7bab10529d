//! The audio source collaborator contract.

use crate::error::Result;

/// Static description of an opened source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    /// Human-readable name (file path or device name)
    pub name: String,

    /// Sample rate (Hz)
    pub sample_rate: u32,

    /// Interleaved channel count
    pub channels: u16,

    /// Total playback length (seconds); `None` for live sources
    pub duration_secs: Option<f64>,

    /// Whether the producer must pace reads to wall-clock time.
    /// Pre-recorded sources are paced, live devices pace themselves.
    pub paced: bool,
}

/// A block of interleaved PCM samples normalised to [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
    /// Playback position of the first frame (seconds)
    pub position_secs: f64,
}

impl AudioChunk {
    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Playback position just after the last frame (seconds)
    pub fn end_secs(&self) -> f64 {
        self.position_secs + self.duration_secs()
    }

    /// Single-channel view: the selected channel, or the average of all channels.
    /// An out-of-range channel index falls back to the average.
    pub fn mono(&self, channel: Option<usize>) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        if channels == 1 {
            return self.samples.clone();
        }
        match channel {
            Some(c) if c < channels => self
                .samples
                .chunks_exact(channels)
                .map(|frame| frame[c])
                .collect(),
            _ => self
                .samples
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect(),
        }
    }
}

/// Audio source collaborator.
///
/// `read` never blocks: it returns `None` when no complete chunk is available
/// yet (live input) or the source has ended (`is_exhausted` tells which).
pub trait AudioSource {
    fn info(&self) -> &SourceInfo;

    /// Begin (or restart) delivery
    fn start(&mut self) -> Result<()>;

    /// Stop delivery and release the underlying stream or buffer
    fn stop(&mut self);

    /// Next chunk of up to `frames` frames, advancing the read position
    fn read(&mut self, frames: usize) -> Option<AudioChunk>;

    /// Most recently read chunk, without advancing
    fn peek(&self) -> Option<&AudioChunk>;

    /// True once a finite source has delivered its last sample or was stopped
    fn is_exhausted(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_chunk() -> AudioChunk {
        AudioChunk {
            samples: vec![1.0, 0.0, 0.5, -0.5],
            channels: 2,
            sample_rate: 48_000,
            position_secs: 1.0,
        }
    }

    #[test]
    fn test_mono_downmix_averages_channels() {
        assert_eq!(stereo_chunk().mono(None), vec![0.5, 0.0]);
    }

    #[test]
    fn test_mono_selects_channel() {
        assert_eq!(stereo_chunk().mono(Some(1)), vec![0.0, -0.5]);
        // Out of range falls back to the downmix
        assert_eq!(stereo_chunk().mono(Some(7)), vec![0.5, 0.0]);
    }

    #[test]
    fn test_chunk_timing() {
        let chunk = stereo_chunk();
        assert_eq!(chunk.frames(), 2);
        assert!((chunk.end_secs() - (1.0 + 2.0 / 48_000.0)).abs() < 1e-12);
    }
}
