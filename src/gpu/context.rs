//! Adapter and device acquisition.

use std::sync::Arc;

use tracing::{error, info};
use winit::window::Window;

use crate::error::{ObliqueError, Result};

/// Device and queue shared by every GPU stage of a session
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Device without a presentation surface (capture and tests)
    pub fn headless() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        pollster::block_on(Self::create(instance, None))
    }

    /// Device able to present to `window`
    pub fn with_surface(window: Arc<Window>) -> Result<(Self, wgpu::Surface<'static>)> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create surface (window must have 'static lifetime via Arc)
        let surface = instance
            .create_surface(window)
            .map_err(|e| ObliqueError::Surface(format!("Failed to create surface: {}", e)))?;

        let gpu = pollster::block_on(Self::create(instance, Some(&surface)))?;
        Ok((gpu, surface))
    }

    async fn create(instance: wgpu::Instance, surface: Option<&wgpu::Surface<'_>>) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| ObliqueError::Gpu("Failed to find suitable GPU adapter".to_string()))?;

        let adapter_info = adapter.get_info();
        info!(
            "GPU: {} ({:?}, {:?})",
            adapter_info.name, adapter_info.backend, adapter_info.device_type
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| ObliqueError::Gpu(format!("Failed to request device: {}", e)))?;

        // Errors outside an error scope are logged rather than aborting the process
        device.on_uncaptured_error(Box::new(|err| {
            error!("Uncaptured GPU error: {}", err);
        }));

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }
}
