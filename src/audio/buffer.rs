//! In-memory audio source.

use super::source::{AudioChunk, AudioSource, SourceInfo};
use crate::error::Result;

/// Plays back a fixed block of interleaved samples
pub struct BufferSource {
    info: SourceInfo,
    samples: Vec<f32>,
    position: usize,
    running: bool,
    last: Option<AudioChunk>,
}

impl BufferSource {
    pub fn new(name: impl Into<String>, samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels as usize;
        Self {
            info: SourceInfo {
                name: name.into(),
                sample_rate,
                channels,
                duration_secs: Some(frames as f64 / sample_rate as f64),
                paced: false,
            },
            samples,
            position: 0,
            running: false,
            last: None,
        }
    }

    /// Mono silence of the given length
    pub fn silence(duration_secs: f64, sample_rate: u32) -> Self {
        let frames = (duration_secs * sample_rate as f64).round() as usize;
        Self::new("silence", vec![0.0; frames], 1, sample_rate)
    }

    /// Mono full-scale impulse at frame 0 followed by silence
    pub fn impulse(duration_secs: f64, sample_rate: u32) -> Self {
        let frames = ((duration_secs * sample_rate as f64).round() as usize).max(1);
        let mut samples = vec![0.0; frames];
        samples[0] = 1.0;
        Self::new("impulse", samples, 1, sample_rate)
    }

    /// Pace delivery to wall-clock time like a pre-recorded file
    pub fn paced(mut self, paced: bool) -> Self {
        self.info.paced = paced;
        self
    }
}

impl AudioSource for BufferSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn start(&mut self) -> Result<()> {
        self.position = 0;
        self.running = true;
        self.last = None;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
        self.last = None;
    }

    fn read(&mut self, frames: usize) -> Option<AudioChunk> {
        if !self.running || self.position >= self.samples.len() {
            return None;
        }
        let channels = self.info.channels as usize;
        let end = (self.position + frames * channels).min(self.samples.len());
        let chunk = AudioChunk {
            samples: self.samples[self.position..end].to_vec(),
            channels: self.info.channels,
            sample_rate: self.info.sample_rate,
            position_secs: (self.position / channels) as f64 / self.info.sample_rate as f64,
        };
        self.position = end;
        self.last = Some(chunk.clone());
        Some(chunk)
    }

    fn peek(&self) -> Option<&AudioChunk> {
        self.last.as_ref()
    }

    fn is_exhausted(&self) -> bool {
        !self.running || self.position >= self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_until_exhausted() {
        let mut source = BufferSource::new("ramp", (0..10).map(|i| i as f32).collect(), 1, 10);
        source.start().unwrap();

        let first = source.read(4).unwrap();
        assert_eq!(first.samples, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(source.peek(), Some(&first));

        let second = source.read(4).unwrap();
        assert!((second.position_secs - 0.4).abs() < 1e-9);

        let tail = source.read(4).unwrap();
        assert_eq!(tail.samples.len(), 2);
        assert!(source.is_exhausted());
        assert!(source.read(4).is_none());
    }

    #[test]
    fn test_read_before_start_is_empty() {
        let mut source = BufferSource::silence(1.0, 100);
        assert!(source.read(10).is_none());
        assert!(source.is_exhausted());
    }

    #[test]
    fn test_stop_releases_peek() {
        let mut source = BufferSource::impulse(0.1, 100);
        source.start().unwrap();
        assert_eq!(source.read(5).unwrap().samples[0], 1.0);
        source.stop();
        assert!(source.peek().is_none());
        assert!(source.read(5).is_none());
    }
}
