//! Attack/release envelope follower.

/// Values below this snap to exactly zero so silence converges in finite time
const SILENCE_THRESHOLD: f32 = 1e-4;

/// Exponential moving average of a rectified level with separate rise and fall
/// time constants. Coefficients are derived from the elapsed audio time, so the
/// response is independent of how audio is chunked.
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    attack_secs: f32,
    release_secs: f32,
    value: f32,
}

impl EnvelopeFollower {
    pub fn new(attack_ms: f32, release_ms: f32) -> Self {
        Self {
            attack_secs: attack_ms / 1000.0,
            release_secs: release_ms / 1000.0,
            value: 0.0,
        }
    }

    /// Advance by `dt_secs` of audio whose rectified level is `input`
    pub fn process(&mut self, input: f32, dt_secs: f32) -> f32 {
        let input = input.abs();
        let tau = if input > self.value {
            self.attack_secs
        } else {
            self.release_secs
        };
        let coeff = 1.0 - (-dt_secs / tau).exp();
        self.value += coeff * (input - self.value);
        if self.value < SILENCE_THRESHOLD {
            self.value = 0.0;
        }
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1024.0 / 44100.0;

    #[test]
    fn test_attack_is_faster_than_release() {
        let mut env = EnvelopeFollower::new(5.0, 300.0);
        let risen = env.process(1.0, DT);
        assert!(risen > 0.9);

        let fallen = env.process(0.0, DT);
        assert!(fallen > 0.8 * risen);
        assert!(fallen < risen);
    }

    #[test]
    fn test_decay_is_monotonic_until_zero() {
        let mut env = EnvelopeFollower::new(5.0, 300.0);
        env.process(1.0, DT);
        let mut previous = env.value();
        let mut ticks = 0;
        while env.value() > 0.0 {
            let next = env.process(0.0, DT);
            assert!(next < previous);
            previous = next;
            ticks += 1;
            assert!(ticks < 1000, "envelope never converged");
        }
    }

    #[test]
    fn test_rectifies_negative_input() {
        let mut env = EnvelopeFollower::new(5.0, 300.0);
        assert!(env.process(-1.0, DT) > 0.9);
    }

    #[test]
    fn test_chunking_independence() {
        let mut whole = EnvelopeFollower::new(5.0, 300.0);
        let mut split = EnvelopeFollower::new(5.0, 300.0);
        whole.process(0.5, 0.02);
        split.process(0.5, 0.01);
        split.process(0.5, 0.01);
        assert!((whole.value() - split.value()).abs() < 1e-5);
    }
}
