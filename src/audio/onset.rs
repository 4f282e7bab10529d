//! Onset features: spectral flux, energy beats and zero-crossing rate.

/// Mean-square floor used as the previous energy after silence (-60 dBFS)
const ENERGY_FLOOR: f32 = 1e-6;

/// Tracks the state onset detection needs between analyses
#[derive(Debug, Clone)]
pub struct OnsetDetector {
    threshold: f32,
    min_interval_secs: f32,
    previous_spectrum: Vec<f32>,
    previous_energy: f32,
    // Audio time since the last beat; `None` before the first
    since_beat: Option<f32>,
}

impl OnsetDetector {
    /// `threshold` is the energy ratio over the previous analysis that counts
    /// as a beat; beats closer than `min_interval_ms` are suppressed.
    pub fn new(bins: usize, threshold: f32, min_interval_ms: f32) -> Self {
        Self {
            threshold,
            min_interval_secs: min_interval_ms / 1000.0,
            previous_spectrum: vec![0.0; bins],
            previous_energy: 0.0,
            since_beat: None,
        }
    }

    /// Half-wave rectified spectral flux between `spectrum` and the previous
    /// call. Magnitudes are expected in amplitude units (a full-scale sine
    /// peaks near 0.5 under a Hann window).
    pub fn flux(&mut self, spectrum: &[f32]) -> f32 {
        let sum: f32 = spectrum
            .iter()
            .zip(&self.previous_spectrum)
            .map(|(&now, &before)| (now - before).max(0.0).powi(2))
            .sum();
        self.previous_spectrum.clear();
        self.previous_spectrum.extend_from_slice(spectrum);
        sum.sqrt()
    }

    /// Feed the mean-square energy of `dt_secs` of audio; true on a beat
    pub fn beat(&mut self, energy: f32, dt_secs: f32) -> bool {
        let since = self.since_beat.map(|s| s + dt_secs);
        let rising = energy > self.threshold * self.previous_energy.max(ENERGY_FLOOR);
        let ready = since.map_or(true, |s| s >= self.min_interval_secs);
        self.previous_energy = energy;

        if rising && ready {
            self.since_beat = Some(0.0);
            true
        } else {
            self.since_beat = since;
            false
        }
    }
}

/// Fraction of adjacent sample pairs whose sign bit differs, in [0, 1]
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|pair| pair[0].is_sign_negative() != pair[1].is_sign_negative())
        .count();
    crossings as f32 / samples.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1024.0 / 44100.0;

    #[test]
    fn test_flux_ignores_falling_bins() {
        let mut onset = OnsetDetector::new(3, 1.5, 100.0);
        assert_eq!(onset.flux(&[0.0, 0.0, 0.0]), 0.0);
        assert!((onset.flux(&[0.3, 0.0, 0.4]) - 0.5).abs() < 1e-6);
        assert_eq!(onset.flux(&[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(onset.flux(&[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_beat_on_energy_jump() {
        let mut onset = OnsetDetector::new(1, 1.5, 0.0);
        assert!(!onset.beat(0.0, DT));
        assert!(onset.beat(0.1, DT));
        assert!(!onset.beat(0.1, DT));
        assert!(!onset.beat(0.14, DT));
        assert!(onset.beat(0.5, DT));
    }

    #[test]
    fn test_beats_respect_min_interval() {
        let mut onset = OnsetDetector::new(1, 1.5, 100.0);
        assert!(onset.beat(0.1, DT));
        // 23 ms later: rising, but too soon
        assert!(!onset.beat(1.0, DT));
        assert!(!onset.beat(0.0, DT));
        assert!(!onset.beat(0.0, DT));
        assert!(onset.beat(1.0, DT * 2.0));
    }

    #[test]
    fn test_silence_never_beats() {
        let mut onset = OnsetDetector::new(1, 1.5, 100.0);
        for _ in 0..10 {
            assert!(!onset.beat(0.0, DT));
        }
    }

    #[test]
    fn test_zero_crossing_rate() {
        assert_eq!(zero_crossing_rate(&[]), 0.0);
        assert_eq!(zero_crossing_rate(&[0.5, 0.2, 0.1]), 0.0);
        assert_eq!(zero_crossing_rate(&[1.0, -1.0, 1.0, -1.0]), 0.75);
    }
}
