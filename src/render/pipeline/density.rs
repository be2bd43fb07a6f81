//! Density field compute pipeline

use bytemuck::{Pod, Zeroable};

use super::kernels::{buffer_entry, compute_pipeline, shader_module};
use crate::generator::config::FieldParameters;
use crate::render::texture::{GpuVolume, VOLUME_FORMAT};

/// Density kernel parameters (must match `DensityParams` in density.wgsl)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DensityParams {
    pub resolution: u32,
    pub steps: u32,
    pub smoothness: f32,
    pub seed: f32,
    pub displacement_scale: f32,
    pub displacement_spread: f32,
    pub _pad: [f32; 2],
}

impl From<&FieldParameters> for DensityParams {
    fn from(field: &FieldParameters) -> Self {
        Self {
            resolution: field.resolution,
            steps: field.steps,
            smoothness: field.smoothness,
            seed: field.seed,
            displacement_scale: field.displacement_scale,
            displacement_spread: field.displacement_spread,
            _pad: [0.0; 2],
        }
    }
}

/// Fills the density volume from [`FieldParameters`]
pub struct DensityPipeline {
    pipeline: wgpu::ComputePipeline,
    params_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    /// Bind group for the current volume, keyed by its allocation generation
    bind_group: Option<(u64, wgpu::BindGroup)>,
}

impl DensityPipeline {
    pub fn new(device: &wgpu::Device, source: &str) -> Self {
        let shader = shader_module(device, "density_shader", source);

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("density_params"),
            size: std::mem::size_of::<DensityParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("density_layout"),
            entries: &[
                buffer_entry(0, wgpu::ShaderStages::COMPUTE, wgpu::BufferBindingType::Uniform),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: VOLUME_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D3,
                    },
                    count: None,
                },
            ],
        });

        let pipeline = compute_pipeline(device, "density_pipeline", &bind_group_layout, &shader);
        log::info!("Density pipeline created");

        Self {
            pipeline,
            params_buffer,
            bind_group_layout,
            bind_group: None,
        }
    }

    /// Upload parameters and bind `volume` as the output.
    ///
    /// The bind group is rebuilt only when `generation` changes, i.e. after
    /// the volume was reallocated.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        field: &FieldParameters,
        volume: &GpuVolume,
        generation: u64,
    ) {
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&DensityParams::from(field)));

        if matches!(self.bind_group, Some((g, _)) if g == generation) {
            return;
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("density_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(volume.view()),
                },
            ],
        });
        self.bind_group = Some((generation, bind_group));
    }

    /// Record the density pass. Does nothing before [`prepare`](Self::prepare).
    pub fn dispatch(&self, encoder: &mut wgpu::CommandEncoder, workgroups: u32) {
        let Some((_, bind_group)) = &self.bind_group else {
            return;
        };

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("density_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(workgroups, workgroups, workgroups);
        log::debug!("Density dispatch {0}x{0}x{0} workgroups", workgroups);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_size() {
        // Two 16-byte rows in the uniform
        assert_eq!(std::mem::size_of::<DensityParams>(), 32);
    }

    #[test]
    fn test_params_from_field() {
        let field = FieldParameters {
            resolution: 64,
            steps: 30,
            seed: 12.0,
            ..Default::default()
        };
        let params = DensityParams::from(&field);
        assert_eq!(params.resolution, 64);
        assert_eq!(params.steps, 30);
        assert_eq!(params.seed, 12.0);
        assert_eq!(params.smoothness, field.smoothness);
        assert_eq!(params.displacement_spread, field.displacement_spread);
    }
}
