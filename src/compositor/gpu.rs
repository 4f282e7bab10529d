//! GPU fold over module outputs.

use tracing::debug;
use wgpu::util::DeviceExt;

use super::blend::BlendOp;
use crate::engine::EngineContext;
use crate::error::{ObliqueError, Result};
use crate::gpu::{PingPong, RenderTarget};
use crate::shader::{ParsedShader, ShaderProgram};

const BLEND_SOURCE: &str = include_str!("blend.wgsl");

/// Runs `acc := blend(acc, layer, op)` for each layer in graph order.
///
/// The accumulator starts each tick as opaque black, so the first layer's
/// operation is applied like any other.
pub struct Compositor {
    program: ShaderProgram,
    params_binding: u32,
    bottom_binding: u32,
    top_binding: u32,
    // One buffer per graph slot; the graph does not change after startup
    slots: Vec<(BlendOp, wgpu::Buffer)>,
    accumulator: PingPong,
}

impl Compositor {
    pub fn new(ctx: &EngineContext, ops: &[BlendOp]) -> Result<Self> {
        let parsed = ParsedShader::parse("compositor/blend.wgsl", BLEND_SOURCE)?;
        let binding_of = |name: &str| {
            parsed
                .reflection
                .textures
                .iter()
                .find(|slot| slot.name == name)
                .map(|slot| slot.binding)
                .ok_or_else(|| ObliqueError::Gpu(format!("blend shader has no '{}' texture", name)))
        };
        let bottom_binding = binding_of("bottom_layer")?;
        let top_binding = binding_of("top_layer")?;
        let params_binding = parsed
            .reflection
            .block
            .as_ref()
            .map(|block| block.binding)
            .ok_or_else(|| ObliqueError::Gpu("blend shader has no uniform block".to_string()))?;

        let program = ShaderProgram::compile(&ctx.gpu, &ctx.ledger, &parsed, ctx.format())?;

        let slots = ops
            .iter()
            .enumerate()
            .map(|(i, &op)| {
                let words: [u32; 4] = [op.index(), 0, 0, 0];
                let buffer = ctx
                    .gpu
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("Blend Slot {} ({})", i, op)),
                        contents: bytemuck::cast_slice(&words),
                        usage: wgpu::BufferUsages::UNIFORM,
                    });
                (op, buffer)
            })
            .collect();

        let (width, height) = ctx.resolution();
        let accumulator = PingPong::new(&ctx.gpu, &ctx.ledger, width, height, "Compositor");
        debug!("Compositor ready with {} slots", ops.len());

        Ok(Self {
            program,
            params_binding,
            bottom_binding,
            top_binding,
            slots,
            accumulator,
        })
    }

    pub fn ops(&self) -> impl Iterator<Item = BlendOp> + '_ {
        self.slots.iter().map(|(op, _)| *op)
    }

    /// Record the fold of `layers` (output, graph slot) and return the final frame.
    ///
    /// Slots missing from `layers` (excluded modules) are skipped; the rest
    /// keep their declared order.
    pub fn compose(
        &mut self,
        ctx: &EngineContext,
        encoder: &mut wgpu::CommandEncoder,
        layers: &[(&RenderTarget, usize)],
    ) -> Result<&RenderTarget> {
        self.accumulator.front().clear(encoder, wgpu::Color::BLACK);

        for &(top, slot) in layers {
            let (op, buffer) = self
                .slots
                .get(slot)
                .ok_or_else(|| ObliqueError::Gpu(format!("no compositor slot {}", slot)))?;

            let bind_group = ctx.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Blend Bind Group"),
                layout: self.program.bind_group_layout(),
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: self.params_binding,
                        resource: buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: self.bottom_binding,
                        resource: wgpu::BindingResource::TextureView(self.accumulator.front().view()),
                    },
                    wgpu::BindGroupEntry {
                        binding: self.top_binding,
                        resource: wgpu::BindingResource::TextureView(top.view()),
                    },
                ],
            });

            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some(op.name()),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: self.accumulator.back().view(),
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
                pass.set_pipeline(self.program.pipeline());
                pass.set_bind_group(0, &bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
            self.accumulator.swap();
        }

        Ok(self.accumulator.front())
    }

    /// Last composed frame
    pub fn output(&self) -> &RenderTarget {
        self.accumulator.front()
    }

    pub fn release(self, ctx: &EngineContext) {
        for (_, buffer) in self.slots {
            buffer.destroy();
        }
        self.program.release(&ctx.ledger);
        self.accumulator.release(&ctx.ledger);
        debug!("Compositor released");
    }
}
