//! WAV file source (decoding delegated to `hound`).

use std::path::{Path, PathBuf};

use tracing::info;

use super::buffer::BufferSource;
use super::source::{AudioChunk, AudioSource, SourceInfo};
use crate::error::{ObliqueError, Result};

/// File extensions this source can decode
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "wave"];

/// Pre-recorded audio decoded fully into memory, paced to wall-clock time
pub struct WavFileSource {
    path: PathBuf,
    inner: BufferSource,
}

impl WavFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if !supported {
            return Err(ObliqueError::AudioSource(format!(
                "Unsupported audio file format for '{}'. Supported formats are: {}",
                path.display(),
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }
        if !path.exists() {
            return Err(ObliqueError::AudioSource(format!(
                "Audio file '{}' was not found",
                path.display()
            )));
        }

        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        info!(
            "Audio file: {} ({} Hz, {} ch, {} bit)",
            path.display(),
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample
        );

        let inner = BufferSource::new(
            path.display().to_string(),
            samples,
            spec.channels,
            spec.sample_rate,
        )
        .paced(true);

        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioSource for WavFileSource {
    fn info(&self) -> &SourceInfo {
        self.inner.info()
    }

    fn start(&mut self) -> Result<()> {
        self.inner.start()
    }

    fn stop(&mut self) {
        self.inner.stop()
    }

    fn read(&mut self, frames: usize) -> Option<AudioChunk> {
        self.inner.read(frames)
    }

    fn peek(&self) -> Option<&AudioChunk> {
        self.inner.peek()
    }

    fn is_exhausted(&self) -> bool {
        self.inner.is_exhausted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, samples: &[i16], channels: u16) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decodes_int_samples_to_unit_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, &[i16::MAX, 0, i16::MIN, 0], 2);

        let mut source = WavFileSource::open(&path).unwrap();
        assert_eq!(source.info().channels, 2);
        assert_eq!(source.info().sample_rate, 8000);
        assert!(source.info().paced);

        source.start().unwrap();
        let chunk = source.read(16).unwrap();
        assert_eq!(chunk.frames(), 2);
        assert!((chunk.samples[0] - 1.0).abs() < 1e-4);
        assert!((chunk.samples[2] + 1.0).abs() < 1e-6);
        assert!(source.is_exhausted());
    }

    #[test]
    fn test_rejects_unsupported_extension() {
        let result = WavFileSource::open("song.mp3");
        assert!(matches!(result, Err(ObliqueError::AudioSource(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = WavFileSource::open(dir.path().join("absent.wav"));
        assert!(matches!(result, Err(ObliqueError::AudioSource(_))));
    }
}
