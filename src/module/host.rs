//! Hosts a [`Visual`] as a GPU-backed [`Module`].

use std::sync::Arc;

use tracing::{debug, info};

use super::state::{ModuleState, Transition};
use super::{Module, Visual};
use crate::audio::AudioFeatureFrame;
use crate::engine::{EngineContext, TickTime};
use crate::error::{ObliqueError, Result};
use crate::gpu::{PingPong, RenderTarget};
use crate::shader::{ParsedShader, ShaderLibrary, ShaderProgram};
use crate::uniforms::{
    validate_contract, ModuleParameters, ShaderReflection, TextureBinding, UniformBlock,
    UniformContract, UniformValue,
};

enum Output {
    Single(RenderTarget),
    Feedback(PingPong),
}

impl Output {
    fn current(&self) -> &RenderTarget {
        match self {
            Output::Single(target) => target,
            Output::Feedback(pair) => pair.front(),
        }
    }
}

struct GpuResources {
    program: ShaderProgram,
    reflection: ShaderReflection,
    uniforms: Option<(wgpu::Buffer, UniformBlock)>,
    output: Output,
}

/// A [`Visual`] paired with its compiled program, uniform buffer and output target(s)
pub struct ShaderModule {
    visual: Box<dyn Visual>,
    contract: Arc<UniformContract>,
    state: ModuleState,
    prepared: Option<ParsedShader>,
    resources: Option<GpuResources>,
}

impl ShaderModule {
    pub fn new(visual: Box<dyn Visual>) -> Self {
        let contract = Arc::new(visual.contract());
        Self {
            visual,
            contract,
            state: ModuleState::Uninitialized,
            prepared: None,
            resources: None,
        }
    }

    pub fn contract(&self) -> &UniformContract {
        &self.contract
    }

    pub fn is_feedback(&self) -> bool {
        self.visual.feedback()
    }

    /// CPU half of initialisation: expand includes, parse, reflect and
    /// validate the contract. Fails listing every uniform mismatch.
    pub fn prepare(&mut self, library: &ShaderLibrary) -> Result<&ShaderReflection> {
        if self.state != ModuleState::Uninitialized {
            return Err(self.invalid(Transition::Initialize));
        }
        let path = library.resolve(self.visual.shader_path());
        let body = library.load(self.visual.shader_path())?;
        let parsed = ParsedShader::parse(&path.display().to_string(), &body)?;
        validate_contract(self.visual.name(), &self.contract, &parsed.reflection)?;
        debug!(
            "Module '{}': {} uniforms validated against {}",
            self.visual.name(),
            self.contract.len(),
            parsed.path
        );
        Ok(&self.prepared.insert(parsed).reflection)
    }

    /// Compile the program and allocate targets; Uninitialized → Ready
    pub fn initialize(&mut self, ctx: &EngineContext, library: &ShaderLibrary) -> Result<()> {
        if self.prepared.is_none() {
            self.prepare(library)?;
        }
        let parsed = self
            .prepared
            .take()
            .ok_or_else(|| self.invalid(Transition::Initialize))?;

        let program = ShaderProgram::compile(&ctx.gpu, &ctx.ledger, &parsed, ctx.format())?;

        let uniforms = parsed.reflection.block.clone().map(|layout| {
            let block = UniformBlock::new(self.visual.name(), layout);
            let buffer = ctx.gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.visual.name()),
                size: block.size(),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            (buffer, block)
        });

        let (width, height) = ctx.resolution();
        self.visual.resize(width, height);
        let output = if self.visual.feedback() {
            Output::Feedback(PingPong::new(&ctx.gpu, &ctx.ledger, width, height, self.visual.name()))
        } else {
            Output::Single(RenderTarget::new(&ctx.gpu, &ctx.ledger, width, height, self.visual.name()))
        };

        self.resources = Some(GpuResources {
            program,
            reflection: parsed.reflection,
            uniforms,
            output,
        });
        self.transition(Transition::Initialize)?;
        info!("Module '{}' ready", self.visual.name());
        Ok(())
    }

    fn transition(&mut self, transition: Transition) -> Result<()> {
        match self.state.apply(transition) {
            Some(next) => {
                self.state = next;
                Ok(())
            }
            None => Err(self.invalid(transition)),
        }
    }

    fn invalid(&self, transition: Transition) -> ObliqueError {
        ObliqueError::InvalidState {
            module: self.visual.name().to_string(),
            operation: transition.verb(),
            state: self.state.to_string(),
        }
    }

    fn draw(
        &mut self,
        ctx: &EngineContext,
        encoder: &mut wgpu::CommandEncoder,
        params: &ModuleParameters,
    ) -> Result<()> {
        let name = self.visual.name();
        let feedback = self.visual.feedback();
        let GpuResources {
            program,
            reflection,
            uniforms,
            output,
        } = self
            .resources
            .as_mut()
            .ok_or_else(|| ObliqueError::Gpu(format!("module '{}' has no GPU resources", name)))?;

        // Full overwrite every tick
        if let Some((buffer, block)) = uniforms.as_mut() {
            ctx.gpu.queue.write_buffer(buffer, 0, block.write(params));
        }

        let blank = ctx.blank_view()?;
        let previous = match &*output {
            Output::Feedback(pair) => pair.front().view(),
            Output::Single(_) => blank,
        };

        let mut entries = Vec::new();
        if let (Some(layout), Some((buffer, _))) = (&reflection.block, uniforms.as_ref()) {
            entries.push(wgpu::BindGroupEntry {
                binding: layout.binding,
                resource: buffer.as_entire_binding(),
            });
        }
        for slot in &reflection.textures {
            let view = match params.get(&slot.name) {
                Some(UniformValue::Texture(TextureBinding::PreviousFrame)) if feedback => previous,
                Some(UniformValue::Texture(TextureBinding::PreviousFrame))
                | Some(UniformValue::Texture(TextureBinding::Blank)) => blank,
                Some(other) => {
                    return Err(ObliqueError::ParameterType {
                        name: slot.name.clone(),
                        expected: "texture".to_string(),
                        actual: other.uniform_type().to_string(),
                    })
                }
                None => return Err(ObliqueError::UnknownParameter(slot.name.clone())),
            };
            entries.push(wgpu::BindGroupEntry {
                binding: slot.binding,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        for &binding in &reflection.samplers {
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::Sampler(ctx.sampler()),
            });
        }

        let bind_group = ctx.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(name),
            layout: program.bind_group_layout(),
            entries: &entries,
        });

        let target = match &*output {
            Output::Feedback(pair) => pair.back(),
            Output::Single(target) => target,
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(name),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(program.pipeline());
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1); // Fullscreen triangle
        }

        if let Output::Feedback(pair) = output {
            pair.swap();
        }
        Ok(())
    }
}

impl Module for ShaderModule {
    fn name(&self) -> &str {
        self.visual.name()
    }

    fn state(&self) -> ModuleState {
        self.state
    }

    fn update(&mut self, features: &AudioFeatureFrame, time: &TickTime) -> Result<ModuleParameters> {
        self.transition(Transition::BeginUpdate)?;
        let mut params = self.contract.parameters();
        if let Err(e) = self.visual.update(features, time, &mut params) {
            self.transition(Transition::Abort)?;
            return Err(e);
        }
        Ok(params)
    }

    fn render(
        &mut self,
        ctx: &EngineContext,
        encoder: &mut wgpu::CommandEncoder,
        params: &ModuleParameters,
    ) -> Result<&RenderTarget> {
        self.transition(Transition::BeginRender)?;
        if let Err(e) = self.draw(ctx, encoder, params) {
            self.transition(Transition::Abort)?;
            return Err(e);
        }
        self.transition(Transition::FinishRender)?;
        self.resources
            .as_ref()
            .map(|r| r.output.current())
            .ok_or_else(|| self.invalid(Transition::FinishRender))
    }

    fn dispose(&mut self, ctx: &EngineContext) {
        if self.state == ModuleState::Disposed {
            return;
        }
        if let Some(resources) = self.resources.take() {
            resources.program.release(&ctx.ledger);
            if let Some((buffer, _)) = resources.uniforms {
                buffer.destroy();
            }
            match resources.output {
                Output::Single(target) => target.release(&ctx.ledger),
                Output::Feedback(pair) => pair.release(&ctx.ledger),
            }
        }
        self.prepared = None;
        self.state = ModuleState::Disposed;
        debug!("Module '{}' disposed", self.visual.name());
    }
}
