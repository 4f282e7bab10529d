//! Flat colour field brightened by the envelope and flashed on beats.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::Deserialize;

use crate::audio::AudioFeatureFrame;
use crate::engine::TickTime;
use crate::error::Result;
use crate::module::Visual;
use crate::uniforms::{ModuleParameters, UniformContract};

/// With silent input this renders its static base image every tick
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pulse {
    /// Base colour (linear RGB)
    pub color: [f32; 3],
    /// Brightness added per unit of envelope
    pub gain: f32,
    /// Per-tick multiplier applied to the beat flash
    pub flash_decay: f32,
    #[serde(skip)]
    flash: f32,
    #[serde(skip)]
    shader: PathBuf,
}

impl Default for Pulse {
    fn default() -> Self {
        Self {
            color: [0.15, 0.35, 0.75],
            gain: 1.5,
            flash_decay: 0.8,
            flash: 0.0,
            shader: PathBuf::from("modules/pulse.wgsl"),
        }
    }
}

impl Visual for Pulse {
    fn name(&self) -> &str {
        "pulse"
    }

    fn shader_path(&self) -> &Path {
        &self.shader
    }

    fn contract(&self) -> UniformContract {
        UniformContract::new()
            .with("base_color", Vec3::from_array(self.color))
            .with("level", 0.0f32)
            .with("gain", self.gain)
            .with("flash", 0.0f32)
    }

    fn update(
        &mut self,
        features: &AudioFeatureFrame,
        _time: &TickTime,
        params: &mut ModuleParameters,
    ) -> Result<()> {
        self.flash = if features.beat {
            1.0
        } else {
            self.flash * self.flash_decay.clamp(0.0, 1.0)
        };
        params.set("level", features.envelope)?;
        params.set("flash", self.flash)
    }
}
