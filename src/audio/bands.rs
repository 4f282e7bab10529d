//! Log-spaced grouping of FFT bins into perceptual bands.

use std::ops::Range;

use crate::params::BandNormalization;

/// Smallest magnitude before conversion to decibels (avoids log(0))
const MAGNITUDE_FLOOR: f32 = 1e-9;

/// Maps an FFT magnitude spectrum onto N log-spaced bands in [0, 1]
#[derive(Debug, Clone)]
pub struct BandMapper {
    bins: Vec<Range<usize>>,
    normalization: BandNormalization,
    running_max: Vec<f32>,
}

impl BandMapper {
    /// Band edges are log-spaced from `min_frequency_hz` to Nyquist (N + 1 edges).
    /// A band narrower than one bin uses the bin nearest its geometric centre.
    pub fn new(
        band_count: usize,
        fft_size: usize,
        sample_rate: u32,
        min_frequency_hz: f32,
        normalization: BandNormalization,
    ) -> Self {
        let nyquist = sample_rate as f32 / 2.0;
        let bin_width = sample_rate as f32 / fft_size as f32;
        let bin_count = fft_size / 2 + 1;
        let f_min = min_frequency_hz.min(nyquist);

        let edges: Vec<f32> = (0..=band_count)
            .map(|i| f_min * (nyquist / f_min).powf(i as f32 / band_count as f32))
            .collect();

        let bins = edges
            .windows(2)
            .enumerate()
            .map(|(band, edge)| {
                // bins whose centre frequency lies in [lo, hi); the top band keeps Nyquist
                let first = (edge[0] / bin_width).ceil() as usize;
                let end = if band + 1 == band_count {
                    bin_count
                } else {
                    ((edge[1] / bin_width).ceil() as usize).min(bin_count)
                };
                if first < end {
                    first..end
                } else {
                    let centre = (edge[0] * edge[1]).sqrt();
                    let nearest = ((centre / bin_width).round() as usize).min(bin_count - 1);
                    nearest..nearest + 1
                }
            })
            .collect();

        Self {
            bins,
            normalization,
            running_max: vec![0.0; band_count],
        }
    }

    pub fn band_count(&self) -> usize {
        self.bins.len()
    }

    /// FFT bin range averaged into each band
    pub fn bin_ranges(&self) -> &[Range<usize>] {
        &self.bins
    }

    /// Mean magnitude per band, normalised into [0, 1]
    pub fn map(&mut self, magnitudes: &[f32]) -> Vec<f32> {
        let raw = self.bins.iter().map(|range| {
            let slice = &magnitudes[range.start.min(magnitudes.len())..range.end.min(magnitudes.len())];
            if slice.is_empty() {
                0.0
            } else {
                slice.iter().sum::<f32>() / slice.len() as f32
            }
        });

        match self.normalization {
            BandNormalization::Fixed { floor_db, ceil_db } => raw
                .map(|mag| {
                    let db = 20.0 * mag.max(MAGNITUDE_FLOOR).log10();
                    ((db - floor_db) / (ceil_db - floor_db)).clamp(0.0, 1.0)
                })
                .collect(),
            BandNormalization::RunningMax { decay } => raw
                .zip(self.running_max.iter_mut())
                .map(|(mag, max)| {
                    *max = mag.max(*max * decay);
                    if *max > MAGNITUDE_FLOOR {
                        (mag / *max).clamp(0.0, 1.0)
                    } else {
                        0.0
                    }
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(bands: usize) -> BandMapper {
        BandMapper::new(bands, 2048, 44100, 20.0, BandNormalization::default())
    }

    #[test]
    fn test_bands_are_non_empty_and_ordered() {
        let mapper = mapper(64);
        let ranges = mapper.bin_ranges();
        assert_eq!(ranges.len(), 64);
        for pair in ranges.windows(2) {
            assert!(!pair[0].is_empty());
            assert!(pair[0].start <= pair[1].start);
        }
        // Highest band reaches Nyquist
        assert_eq!(ranges[63].end, 1025);
    }

    #[test]
    fn test_low_bands_are_narrower_than_high_bands() {
        let mapper = mapper(16);
        let ranges = mapper.bin_ranges();
        assert!(ranges[0].len() < ranges[15].len());
    }

    #[test]
    fn test_silence_maps_to_zero() {
        let mut mapper = mapper(32);
        let bands = mapper.map(&vec![0.0; 1025]);
        assert!(bands.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_fixed_scale_maps_decibels_linearly() {
        let mut mapper = mapper(8);
        // 0 dB sits halfway between -60 and +60
        let bands = mapper.map(&vec![1.0; 1025]);
        assert!(bands.iter().all(|&b| (b - 0.5).abs() < 1e-5));
    }

    #[test]
    fn test_running_max_tracks_loudest_band_value() {
        let mut mapper =
            BandMapper::new(4, 2048, 44100, 20.0, BandNormalization::RunningMax { decay: 0.5 });
        let loud = mapper.map(&vec![4.0; 1025]);
        assert!(loud.iter().all(|&b| (b - 1.0).abs() < 1e-6));

        // Max decays to 2.0, so a magnitude of 1.0 reads as half scale
        let quiet = mapper.map(&vec![1.0; 1025]);
        assert!(quiet.iter().all(|&b| (b - 0.5).abs() < 1e-6));
    }
}
