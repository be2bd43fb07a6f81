//! GPU context management using wgpu

use std::sync::Arc;
use winit::window::Window;
use crate::core::error::Error;
use crate::generator::config::WORKGROUP_SIZE;

/// GPU device plus an optional presentation surface
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// None for headless contexts
    pub surface: Option<wgpu::Surface<'static>>,
    pub config: Option<wgpu::SurfaceConfiguration>,
}

fn instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

/// Limits the generator needs, taken from what the adapter offers.
///
/// Fails if the adapter cannot run one full field workgroup.
pub fn required_limits(adapter_limits: &wgpu::Limits) -> Result<wgpu::Limits, Error> {
    let invocations = WORKGROUP_SIZE * WORKGROUP_SIZE * WORKGROUP_SIZE;
    if adapter_limits.max_compute_invocations_per_workgroup < invocations
        || adapter_limits.max_compute_workgroup_size_z < WORKGROUP_SIZE
    {
        return Err(Error::Gpu(format!(
            "adapter allows {} invocations per workgroup (z {}), field kernels need {}",
            adapter_limits.max_compute_invocations_per_workgroup,
            adapter_limits.max_compute_workgroup_size_z,
            invocations
        )));
    }

    Ok(wgpu::Limits {
        max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
        max_buffer_size: adapter_limits.max_buffer_size,
        max_texture_dimension_3d: adapter_limits.max_texture_dimension_3d,
        max_compute_invocations_per_workgroup: adapter_limits.max_compute_invocations_per_workgroup,
        max_compute_workgroup_size_x: adapter_limits.max_compute_workgroup_size_x,
        max_compute_workgroup_size_y: adapter_limits.max_compute_workgroup_size_y,
        max_compute_workgroup_size_z: adapter_limits.max_compute_workgroup_size_z,
        ..Default::default()
    })
}

async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue), Error> {
    let adapter_limits = adapter.limits();

    let device_desc = wgpu::DeviceDescriptor {
        label: Some("rockforge_device"),
        required_features: wgpu::Features::empty(),
        required_limits: required_limits(&adapter_limits)?,
        memory_hints: wgpu::MemoryHints::Performance,
        experimental_features: Default::default(),
        trace: Default::default(),
    };

    let (device, queue) = adapter
        .request_device(&device_desc)
        .await
        .map_err(|e| Error::Gpu(e.to_string()))?;

    log::info!("GPU buffer limits: max_buffer_size={}MB, max_storage_binding={}MB",
        adapter_limits.max_buffer_size / 1024 / 1024,
        adapter_limits.max_storage_buffer_binding_size / 1024 / 1024);

    Ok((device, queue))
}

impl GpuContext {
    /// Create new GPU context from window
    pub async fn new(window: Arc<Window>) -> Result<Self, Error> {
        let instance = instance();

        let surface = instance.create_surface(window.clone())
            .map_err(|e| Error::Gpu(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| Error::Gpu(format!("No suitable adapter found: {:?}", e)))?;

        let (device, queue) = request_device(&adapter).await?;

        let size = window.inner_size();
        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities.formats.first().copied()
            .ok_or_else(|| Error::Gpu("Surface reports no formats".into()))?;
        let alpha_mode = capabilities.alpha_modes.first().copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface: Some(surface),
            config: Some(config),
        })
    }

    /// Create a context without a surface, for baking and tests
    pub async fn headless() -> Result<Self, Error> {
        let instance = instance();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| Error::Gpu(format!("No suitable adapter found: {:?}", e)))?;

        let (device, queue) = request_device(&adapter).await?;
        log::info!("Headless GPU context on {}", adapter.get_info().name);

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface: None,
            config: None,
        })
    }

    /// Resize the surface
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let (Some(surface), Some(config)) = (&self.surface, &mut self.config) {
            config.width = width;
            config.height = height;
            surface.configure(&self.device, config);
        }
    }

    /// Get current surface texture for rendering
    pub fn get_current_texture(&self) -> Result<wgpu::SurfaceTexture, Error> {
        let surface = self.surface.as_ref()
            .ok_or_else(|| Error::Gpu("Headless context has no surface".into()))?;
        surface
            .get_current_texture()
            .map_err(|e| Error::Gpu(e.to_string()))
    }

    /// Get surface format (Rgba8Unorm when headless)
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.as_ref().map_or(wgpu::TextureFormat::Rgba8Unorm, |c| c.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_limits_cover_field_workgroup() {
        let adapter = wgpu::Limits {
            max_compute_invocations_per_workgroup: 1024,
            max_compute_workgroup_size_z: 64,
            ..Default::default()
        };
        let limits = required_limits(&adapter).unwrap();
        assert!(limits.max_compute_invocations_per_workgroup >= WORKGROUP_SIZE.pow(3));
        assert!(limits.max_compute_workgroup_size_z >= WORKGROUP_SIZE);
    }

    #[test]
    fn test_required_limits_reject_small_workgroups() {
        // Default limits stop at 256 invocations, half a field workgroup
        let adapter = wgpu::Limits::default();
        assert!(adapter.max_compute_invocations_per_workgroup < WORKGROUP_SIZE.pow(3));
        assert!(matches!(required_limits(&adapter), Err(Error::Gpu(_))));
    }

    #[test]
    fn test_headless_device_runs_field_workgroups() {
        let ctx = pollster::block_on(GpuContext::headless()).expect("Failed to find adapter");
        assert!(ctx.device.limits().max_compute_invocations_per_workgroup >= WORKGROUP_SIZE.pow(3));
        assert_eq!(ctx.format(), wgpu::TextureFormat::Rgba8Unorm);
    }
}
