//! Band-driven rings that leave decaying trails through a feedback buffer.
//!
//! The GPU side reads the previous output and fades it by `decay`. On the
//! host side an `echo` level holds recent envelope peaks and releases them
//! by `echo_decay` per tick; it is the module's only retained state.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::Deserialize;

use super::resample_bands;
use crate::audio::AudioFeatureFrame;
use crate::engine::TickTime;
use crate::error::Result;
use crate::module::Visual;
use crate::uniforms::{ModuleParameters, TextureBinding, UniformContract};

/// Bands the shader reads (`array<vec4<f32>, 4>`)
pub const ECHO_BANDS: usize = 16;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EchoTrails {
    /// Number of concentric rings (1..=16)
    pub ring_count: i32,
    /// Fraction of the previous frame kept each tick
    pub decay: f32,
    /// Host-side echo release per tick
    pub echo_decay: f32,
    /// Ring colour (linear RGB)
    pub tint: [f32; 3],
    #[serde(skip)]
    echo: f32,
    #[serde(skip)]
    aspect: f32,
    #[serde(skip)]
    shader: PathBuf,
}

impl Default for EchoTrails {
    fn default() -> Self {
        Self {
            ring_count: 6,
            decay: 0.92,
            echo_decay: 0.85,
            tint: [0.9, 0.6, 0.3],
            echo: 0.0,
            aspect: 1.0,
            shader: PathBuf::from("modules/echo_trails.wgsl"),
        }
    }
}

impl Visual for EchoTrails {
    fn name(&self) -> &str {
        "echo_trails"
    }

    fn shader_path(&self) -> &Path {
        &self.shader
    }

    fn feedback(&self) -> bool {
        true
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    fn contract(&self) -> UniformContract {
        UniformContract::new()
            .with("tint", Vec3::from_array(self.tint))
            .with("time", 0.0f32)
            .with("level", 0.0f32)
            .with("peak", 0.0f32)
            .with("echo", 0.0f32)
            .with("decay", self.decay.clamp(0.0, 1.0))
            .with("aspect", 1.0f32)
            .with("ring_count", self.ring_count.clamp(1, ECHO_BANDS as i32))
            .with("bands", vec![0.0f32; ECHO_BANDS])
            .with("previous_frame", TextureBinding::PreviousFrame)
    }

    fn update(
        &mut self,
        features: &AudioFeatureFrame,
        time: &TickTime,
        params: &mut ModuleParameters,
    ) -> Result<()> {
        self.echo = features.envelope.max(self.echo * self.echo_decay);

        params.set("time", time.seconds as f32)?;
        params.set("level", features.envelope)?;
        params.set("peak", features.peak)?;
        params.set("echo", self.echo)?;
        params.set("aspect", self.aspect)?;
        params.set("bands", resample_bands(&features.bands, ECHO_BANDS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniforms::UniformValue;
    use std::sync::Arc;

    fn time(frame: u64) -> TickTime {
        TickTime {
            seconds: frame as f64 / 60.0,
            delta: 1.0 / 60.0,
            frame,
        }
    }

    #[test]
    fn test_echo_holds_then_releases() {
        let mut echo = EchoTrails::default();
        let contract = Arc::new(echo.contract());

        let mut loud = AudioFeatureFrame::silent(64);
        loud.envelope = 1.0;
        let silent = AudioFeatureFrame::silent(64);

        let mut params = contract.parameters();
        echo.update(&loud, &time(0), &mut params).unwrap();
        assert_eq!(params.get("echo"), Some(&UniformValue::Float(1.0)));

        let mut params = contract.parameters();
        echo.update(&silent, &time(1), &mut params).unwrap();
        assert_eq!(params.get("echo"), Some(&UniformValue::Float(0.85)));
        assert_eq!(params.get("level"), Some(&UniformValue::Float(0.0)));
    }

    #[test]
    fn test_bands_are_resampled_to_shader_capacity() {
        let mut echo = EchoTrails::default();
        let contract = Arc::new(echo.contract());
        let mut frame = AudioFeatureFrame::silent(64);
        frame.bands = vec![1.0; 64];

        let mut params = contract.parameters();
        echo.update(&frame, &time(0), &mut params).unwrap();
        assert_eq!(
            params.get("bands"),
            Some(&UniformValue::FloatArray(vec![1.0; ECHO_BANDS]))
        );
    }

    #[test]
    fn test_reads_previous_frame() {
        let echo = EchoTrails::default();
        assert!(echo.feedback());
        assert_eq!(
            echo.contract().get("previous_frame").unwrap().default,
            UniformValue::Texture(TextureBinding::PreviousFrame)
        );
    }
}
