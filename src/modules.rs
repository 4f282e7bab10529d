//! Built-in visuals.

mod echo_trails;
mod pulse;
mod spectrum;

pub use echo_trails::EchoTrails;
pub use pulse::Pulse;
pub use spectrum::Spectrum;

/// Average `bands` down (or repeat up) to exactly `count` values
pub fn resample_bands(bands: &[f32], count: usize) -> Vec<f32> {
    if bands.is_empty() {
        return vec![0.0; count];
    }
    (0..count)
        .map(|i| {
            let start = i * bands.len() / count;
            let end = ((i + 1) * bands.len() / count).max(start + 1);
            let group = &bands[start..end.min(bands.len())];
            group.iter().sum::<f32>() / group.len() as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_averages_groups() {
        let bands: Vec<f32> = (0..8).map(|i| i as f32).collect();
        assert_eq!(resample_bands(&bands, 4), vec![0.5, 2.5, 4.5, 6.5]);
    }

    #[test]
    fn test_resample_repeats_when_upsampling() {
        assert_eq!(resample_bands(&[1.0, 3.0], 4), vec![1.0, 1.0, 3.0, 3.0]);
    }

    #[test]
    fn test_resample_empty() {
        assert_eq!(resample_bands(&[], 3), vec![0.0; 3]);
    }
}
