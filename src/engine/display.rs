//! Presentation of the composed frame: a window surface or headless capture.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use super::clock::TickTime;
use super::context::EngineContext;
use crate::compositor::CpuFrame;
use crate::error::{ObliqueError, Result};
use crate::gpu::RenderTarget;
use crate::params::RecordingConfig;
use crate::shader::{ParsedShader, ShaderProgram};

const PRESENT_SOURCE: &str = include_str!("present.wgsl");

/// Receives one finished frame per tick. Failures here are fatal to the session.
pub trait Display {
    fn present(&mut self, ctx: &EngineContext, frame: &RenderTarget, time: &TickTime) -> Result<()>;

    fn resize(&mut self, ctx: &EngineContext, width: u32, height: u32);

    /// Release GPU resources; idempotent
    fn dispose(&mut self, ctx: &EngineContext);
}

/// Presents to a window surface, scaling the frame to the surface size
pub struct SurfaceDisplay {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    program: Option<ShaderProgram>,
    frame_binding: u32,
    sampler_binding: u32,
}

impl SurfaceDisplay {
    pub fn new(
        ctx: &EngineContext,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let caps = surface.get_capabilities(&ctx.gpu.adapter);
        // Frames already hold display-ready values; avoid a second sRGB encode
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| ObliqueError::Surface("surface reports no formats".to_string()))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctx.gpu.device, &config);

        let parsed = ParsedShader::parse("engine/present.wgsl", PRESENT_SOURCE)?;
        let frame_binding = parsed
            .reflection
            .textures
            .first()
            .map(|slot| slot.binding)
            .ok_or_else(|| ObliqueError::Display("present shader has no texture".to_string()))?;
        let sampler_binding = parsed
            .reflection
            .samplers
            .first()
            .copied()
            .ok_or_else(|| ObliqueError::Display("present shader has no sampler".to_string()))?;
        let program = ShaderProgram::compile(&ctx.gpu, &ctx.ledger, &parsed, format)?;

        info!("Surface configured: {}x{} {:?}", config.width, config.height, format);
        Ok(Self {
            surface,
            config,
            program: Some(program),
            frame_binding,
            sampler_binding,
        })
    }
}

impl Display for SurfaceDisplay {
    fn present(&mut self, ctx: &EngineContext, frame: &RenderTarget, _time: &TickTime) -> Result<()> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| ObliqueError::Display("display already disposed".to_string()))?;

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // Skip this frame; the next one uses the reconfigured surface
                self.surface.configure(&ctx.gpu.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Surface timeout, frame dropped");
                return Ok(());
            }
            Err(e) => return Err(ObliqueError::Display(format!("cannot acquire frame: {}", e))),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = ctx.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Present Bind Group"),
            layout: program.bind_group_layout(),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: self.frame_binding,
                    resource: wgpu::BindingResource::TextureView(frame.view()),
                },
                wgpu::BindGroupEntry {
                    binding: self.sampler_binding,
                    resource: wgpu::BindingResource::Sampler(ctx.sampler()),
                },
            ],
        });

        let mut encoder = ctx
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Present Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Present Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
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
            pass.draw(0..3, 0..1);
        }
        ctx.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn resize(&mut self, ctx: &EngineContext, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&ctx.gpu.device, &self.config);
        debug!("Surface resized to {}x{}", width, height);
    }

    fn dispose(&mut self, ctx: &EngineContext) {
        if let Some(program) = self.program.take() {
            program.release(&ctx.ledger);
        }
    }
}

/// Frames read back by a [`CaptureDisplay`], shared with whoever created it
#[derive(Debug, Clone)]
pub struct CaptureLog {
    inner: Arc<Mutex<CaptureState>>,
}

#[derive(Debug, Default)]
struct CaptureState {
    count: u64,
    history: Vec<CpuFrame>,
    keep: usize,
}

impl CaptureLog {
    /// Keep up to `keep` most recent frames (at least the last one)
    pub fn new(keep: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CaptureState {
                count: 0,
                history: Vec::new(),
                keep: keep.max(1),
            })),
        }
    }

    pub(crate) fn push(&self, frame: CpuFrame) {
        let mut state = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        state.count += 1;
        if state.history.len() == state.keep {
            state.history.remove(0);
        }
        state.history.push(frame);
    }

    /// Frames captured since creation
    pub fn count(&self) -> u64 {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).count
    }

    pub fn last(&self) -> Option<CpuFrame> {
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .history
            .last()
            .cloned()
    }

    /// Retained frames, oldest first
    pub fn frames(&self) -> Vec<CpuFrame> {
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .history
            .clone()
    }
}

impl Default for CaptureLog {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Headless display: reads every frame back and optionally writes numbered PNGs
pub struct CaptureDisplay {
    recording: Option<RecordingConfig>,
    log: CaptureLog,
}

impl CaptureDisplay {
    pub fn new(recording: Option<RecordingConfig>, log: CaptureLog) -> Result<Self> {
        if let Some(config) = &recording {
            let dir = config.frames_dir();
            std::fs::create_dir_all(&dir).map_err(|e| ObliqueError::io(&dir, e))?;
            info!(
                "Recording {} frames to {}",
                config.total_frames(),
                dir.display()
            );
        }
        Ok(Self { recording, log })
    }

    pub fn log(&self) -> &CaptureLog {
        &self.log
    }
}

impl Display for CaptureDisplay {
    fn present(&mut self, ctx: &EngineContext, frame: &RenderTarget, time: &TickTime) -> Result<()> {
        let (width, height) = frame.size();
        let pixels = read_back(ctx, frame)?;

        if let Some(config) = &self.recording {
            let path = config.frame_path(time.frame);
            image::save_buffer(&path, &pixels, width, height, image::ColorType::Rgba8).map_err(
                |e| ObliqueError::Display(format!("failed to save {}: {}", path.display(), e)),
            )?;
        }

        self.log.push(CpuFrame::from_rgba8(width, height, &pixels)?);
        Ok(())
    }

    fn resize(&mut self, _ctx: &EngineContext, _width: u32, _height: u32) {}

    fn dispose(&mut self, _ctx: &EngineContext) {}
}

/// Copy `target` into tightly packed RGBA8 bytes
fn read_back(ctx: &EngineContext, target: &RenderTarget) -> Result<Vec<u8>> {
    let (width, height) = target.size();
    let bytes_per_pixel = 4; // RGBA8
    let unpadded_bytes_per_row = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

    let device = &ctx.gpu.device;
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Frame Capture Buffer"),
        size: (padded_bytes_per_row * height) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Frame Capture Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture: target.texture(),
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    ctx.gpu.queue.submit(std::iter::once(encoder.finish()));

    let (tx, rx) = crossbeam_channel::bounded(1);
    let slice = buffer.slice(..);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .map_err(|_| ObliqueError::Display("frame readback was cancelled".to_string()))?
        .map_err(|e| ObliqueError::Display(format!("frame readback failed: {}", e)))?;

    let data = slice.get_mapped_range();
    let mut pixels = vec![0u8; (unpadded_bytes_per_row * height) as usize];
    // Remove row padding
    for y in 0..height as usize {
        let padded = y * padded_bytes_per_row as usize;
        let unpadded = y * unpadded_bytes_per_row as usize;
        pixels[unpadded..unpadded + unpadded_bytes_per_row as usize]
            .copy_from_slice(&data[padded..padded + unpadded_bytes_per_row as usize]);
    }
    drop(data);
    buffer.unmap();
    buffer.destroy();
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_log_keeps_most_recent() {
        let log = CaptureLog::new(2);
        for shade in [0.0, 0.5, 1.0] {
            log.push(CpuFrame::filled(1, 1, [shade, shade, shade, 1.0]));
        }
        assert_eq!(log.count(), 3);
        let frames = log.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].pixel(0, 0), Some([0.5, 0.5, 0.5, 1.0]));
        assert_eq!(log.last().unwrap().pixel(0, 0), Some([1.0, 1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_capture_log_is_shared_between_clones() {
        let log = CaptureLog::new(1);
        let handle = log.clone();
        log.push(CpuFrame::black(1, 1));
        assert_eq!(handle.count(), 1);
    }
}
