//! Modules: audio-reactive visual units pairing parameters with a shader.
//!
//! [`Module`] is the capability the engine drives (update, render, dispose).
//! [`Visual`] is the content side: what a module declares and how it maps
//! audio features onto its parameters. [`ShaderModule`] hosts a `Visual`
//! and owns its GPU resources.

mod host;
mod registry;
mod state;

use std::path::Path;

pub use host::ShaderModule;
pub use registry::{ModuleRegistry, VisualFactory};
pub use state::{ModuleState, Transition};

use crate::audio::AudioFeatureFrame;
use crate::engine::{EngineContext, TickTime};
use crate::error::Result;
use crate::gpu::RenderTarget;
use crate::uniforms::{ModuleParameters, UniformContract};

/// A unit the engine ticks once per frame
pub trait Module {
    fn name(&self) -> &str;

    fn state(&self) -> ModuleState;

    /// Compute this tick's parameters. No GPU calls, no blocking I/O.
    fn update(&mut self, features: &AudioFeatureFrame, time: &TickTime) -> Result<ModuleParameters>;

    /// Record this tick's draw(s) and return the finished output.
    /// Feedback modules swap their ping-pong pair before returning.
    fn render(
        &mut self,
        ctx: &EngineContext,
        encoder: &mut wgpu::CommandEncoder,
        params: &ModuleParameters,
    ) -> Result<&RenderTarget>;

    /// Release every GPU resource exactly once; further calls do nothing
    fn dispose(&mut self, ctx: &EngineContext);
}

/// Content of a shader module
pub trait Visual {
    fn name(&self) -> &str;

    /// Fragment shader path, relative to the shader root
    fn shader_path(&self) -> &Path;

    /// Uniforms this visual writes; validated against the shader at registration
    fn contract(&self) -> UniformContract;

    /// Whether the module reads its own previous output
    fn feedback(&self) -> bool {
        false
    }

    /// Output resolution, reported once before the first update
    fn resize(&mut self, _width: u32, _height: u32) {}

    /// Fill `params` (fresh contract defaults) from this tick's inputs
    fn update(
        &mut self,
        features: &AudioFeatureFrame,
        time: &TickTime,
        params: &mut ModuleParameters,
    ) -> Result<()>;
}
