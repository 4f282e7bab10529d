//! Audio acquisition and feature extraction.
//!
//! Sources (file, device, in-memory buffer) are driven by a producer thread
//! ([`AudioFeed`]) that pushes chunks into a bounded queue. The render thread
//! drains that queue once per tick and hands the chunks to a
//! [`FeatureExtractor`], which turns them into an immutable
//! [`AudioFeatureFrame`] for every module in that tick.

mod bands;
mod buffer;
mod device;
mod envelope;
mod feed;
mod features;
mod file;
mod onset;
mod source;

use std::f32::consts::PI;

pub use bands::BandMapper;
pub use buffer::BufferSource;
pub use device::{list_input_devices, DeviceSource};
pub use envelope::EnvelopeFollower;
pub use feed::AudioFeed;
pub use features::{AudioFeatureFrame, FeatureExtractor};
pub use file::{WavFileSource, SUPPORTED_EXTENSIONS};
pub use onset::{zero_crossing_rate, OnsetDetector};
pub use source::{AudioChunk, AudioSource, SourceInfo};

/// Hann window function for FFT analysis
pub fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let size = 1024;

        // Hann window should be 0 at edges, 1 at center
        assert!((hann_window(0, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size - 1, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 0.01);
    }
}
