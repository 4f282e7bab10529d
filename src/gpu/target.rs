//! Offscreen color targets and ping-pong pairs.

use super::context::GpuContext;
use super::ledger::{ResourceKind, ResourceLedger};

/// Format of every offscreen target. Linear so blend math matches the CPU reference.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// An offscreen color buffer owned by one module or compositor stage
pub struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl RenderTarget {
    pub fn new(gpu: &GpuContext, ledger: &ResourceLedger, width: u32, height: u32, label: &str) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        ledger.acquire(ResourceKind::RenderTarget);
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Record a pass that fills the whole target with `color`
    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder, color: wgpu::Color) {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Clear Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }

    /// Free the GPU memory. Consuming `self` makes a second release impossible.
    pub fn release(self, ledger: &ResourceLedger) {
        self.texture.destroy();
        ledger.release(ResourceKind::RenderTarget);
    }
}

/// Two targets whose front/back roles swap once per tick.
///
/// The front holds the last completed output (read as "previous frame"),
/// the back is written this tick. [`swap`](Self::swap) is the only way the
/// roles change.
pub struct PingPong {
    targets: [RenderTarget; 2],
    front: usize,
}

impl PingPong {
    /// wgpu zero-initialises textures, so the first tick reads transparent black as its previous frame
    pub fn new(gpu: &GpuContext, ledger: &ResourceLedger, width: u32, height: u32, label: &str) -> Self {
        Self {
            targets: [
                RenderTarget::new(gpu, ledger, width, height, &format!("{} A", label)),
                RenderTarget::new(gpu, ledger, width, height, &format!("{} B", label)),
            ],
            front: 0,
        }
    }

    pub fn front(&self) -> &RenderTarget {
        &self.targets[self.front]
    }

    pub fn back(&self) -> &RenderTarget {
        &self.targets[1 - self.front]
    }

    pub fn swap(&mut self) {
        self.front = 1 - self.front;
    }

    pub fn release(self, ledger: &ResourceLedger) {
        let [a, b] = self.targets;
        a.release(ledger);
        b.release(ledger);
    }
}
