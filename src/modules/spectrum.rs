//! Spectrum bars.

use std::path::{Path, PathBuf};

use glam::{Mat3, Vec2, Vec3};
use serde::Deserialize;

use crate::audio::AudioFeatureFrame;
use crate::engine::TickTime;
use crate::error::Result;
use crate::module::Visual;
use crate::uniforms::{ModuleParameters, UniformContract};

/// Bands the shader can display (`array<vec4<f32>, 16>`)
pub const SPECTRUM_CAPACITY: usize = 64;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Spectrum {
    /// Colour at the bottom of each bar
    pub color_low: [f32; 3],
    /// Colour at the top of each bar
    pub color_high: [f32; 3],
    /// Rotation of the whole display about the centre (degrees)
    pub rotation_deg: f32,
    /// Rotation speed (degrees per second)
    pub spin_deg_per_s: f32,
    #[serde(skip)]
    shader: PathBuf,
}

impl Default for Spectrum {
    fn default() -> Self {
        Self {
            color_low: [0.1, 0.9, 0.6],
            color_high: [1.0, 0.2, 0.5],
            rotation_deg: 0.0,
            spin_deg_per_s: 0.0,
            shader: PathBuf::from("modules/spectrum.wgsl"),
        }
    }
}

impl Spectrum {
    fn uv_transform(&self, seconds: f64) -> Mat3 {
        let angle = (self.rotation_deg + self.spin_deg_per_s * seconds as f32).to_radians();
        let centre = Vec2::splat(0.5);
        Mat3::from_translation(centre) * Mat3::from_angle(angle) * Mat3::from_translation(-centre)
    }
}

impl Visual for Spectrum {
    fn name(&self) -> &str {
        "spectrum"
    }

    fn shader_path(&self) -> &Path {
        &self.shader
    }

    fn contract(&self) -> UniformContract {
        UniformContract::new()
            .with("bands", vec![0.0f32; SPECTRUM_CAPACITY])
            .with("band_count", 0i32)
            .with("uv_transform", Mat3::IDENTITY)
            .with("color_low", Vec3::from_array(self.color_low))
            .with("color_high", Vec3::from_array(self.color_high))
            .with("level", 0.0f32)
    }

    fn update(
        &mut self,
        features: &AudioFeatureFrame,
        time: &TickTime,
        params: &mut ModuleParameters,
    ) -> Result<()> {
        // more bands than the shader holds are truncated (with a warning) when packed
        params.set("bands", features.bands.clone())?;
        params.set(
            "band_count",
            features.bands.len().min(SPECTRUM_CAPACITY) as i32,
        )?;
        params.set("uv_transform", self.uv_transform(time.seconds))?;
        params.set("level", features.envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_rotates_about_centre() {
        let spectrum = Spectrum {
            rotation_deg: 90.0,
            ..Default::default()
        };
        let m = spectrum.uv_transform(0.0);
        let centre = m.transform_point2(Vec2::splat(0.5));
        assert!((centre - Vec2::splat(0.5)).length() < 1e-6);
        let corner = m.transform_point2(Vec2::new(1.0, 0.5));
        assert!((corner - Vec2::new(0.5, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_band_count_is_capped() {
        let mut spectrum = Spectrum::default();
        let contract = std::sync::Arc::new(spectrum.contract());
        let mut params = contract.parameters();
        let frame = AudioFeatureFrame::silent(128);
        let time = TickTime {
            seconds: 0.0,
            delta: 0.0,
            frame: 0,
        };
        spectrum.update(&frame, &time, &mut params).unwrap();
        assert_eq!(
            params.get("band_count"),
            Some(&crate::uniforms::UniformValue::Int(64))
        );
    }
}
