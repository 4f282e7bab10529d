//! Session-scoped resources passed by reference to every stage.

use crate::error::{ObliqueError, Result};
use crate::gpu::{GpuContext, RenderTarget, ResourceLedger, TARGET_FORMAT};

/// Everything a module, the compositor or a display needs from the session
pub struct EngineContext {
    pub gpu: GpuContext,
    pub ledger: ResourceLedger,
    width: u32,
    height: u32,
    sampler: wgpu::Sampler,
    blank: Option<RenderTarget>,
}

impl EngineContext {
    pub fn new(gpu: GpuContext, width: u32, height: u32) -> Self {
        let ledger = ResourceLedger::new();
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Frame Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let blank = RenderTarget::new(&gpu, &ledger, 1, 1, "Blank Texture");
        gpu.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: blank.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[0, 0, 0, 255],
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        Self {
            gpu,
            ledger,
            width,
            height,
            sampler,
            blank: Some(blank),
        }
    }

    /// Output resolution of every module and compositor target
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        TARGET_FORMAT
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// 1x1 opaque black
    pub fn blank_view(&self) -> Result<&wgpu::TextureView> {
        self.blank
            .as_ref()
            .map(|b| b.view())
            .ok_or_else(|| ObliqueError::Gpu("blank texture already released".to_string()))
    }

    /// Release session-owned targets; idempotent
    pub fn release_shared(&mut self) {
        if let Some(blank) = self.blank.take() {
            blank.release(&self.ledger);
        }
    }
}
