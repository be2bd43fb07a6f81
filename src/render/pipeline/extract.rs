//! Surface extraction: triangulates the density volume into the triangle buffer

use bytemuck::{Pod, Zeroable};

use super::kernels::{buffer_entry, compute_pipeline, shader_module};
use crate::render::buffer::TriangleBuffer;
use crate::render::texture::GpuVolume;

/// Triangulation kernel parameters (must match `ExtractParams` in triangulate.wgsl)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ExtractParams {
    pub resolution: u32,
    pub threshold: f32,
    pub max_triangles: u32,
    pub _pad: u32,
}

/// Owns the triangle buffer and counter and runs the triangulation kernel
pub struct SurfaceExtractor {
    pipeline: wgpu::ComputePipeline,
    params_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: Option<(u64, wgpu::BindGroup)>,
    triangles: TriangleBuffer,
}

impl SurfaceExtractor {
    pub fn new(device: &wgpu::Device, source: &str, max_vertex_count: u32) -> Self {
        let shader = shader_module(device, "triangulate_shader", source);
        let triangles = TriangleBuffer::new(device, max_vertex_count);

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("extract_params"),
            size: std::mem::size_of::<ExtractParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("extract_layout"),
            entries: &[
                buffer_entry(0, wgpu::ShaderStages::COMPUTE, wgpu::BufferBindingType::Uniform),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D3,
                        multisampled: false,
                    },
                    count: None,
                },
                buffer_entry(
                    2,
                    wgpu::ShaderStages::COMPUTE,
                    wgpu::BufferBindingType::Storage { read_only: false },
                ),
                buffer_entry(
                    3,
                    wgpu::ShaderStages::COMPUTE,
                    wgpu::BufferBindingType::Storage { read_only: false },
                ),
            ],
        });

        let pipeline = compute_pipeline(device, "extract_pipeline", &bind_group_layout, &shader);
        log::info!("Extraction pipeline created ({} triangle capacity)", triangles.max_triangles());

        Self {
            pipeline,
            params_buffer,
            bind_group_layout,
            bind_group: None,
            triangles,
        }
    }

    /// Upload parameters and bind `volume` as the input field
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        volume: &GpuVolume,
        generation: u64,
        threshold: f32,
    ) {
        let params = ExtractParams {
            resolution: volume.resolution(),
            threshold,
            max_triangles: self.triangles.max_triangles(),
            _pad: 0,
        };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        if matches!(self.bind_group, Some((g, _)) if g == generation) {
            return;
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("extract_bg"),
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
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.triangles.vertex_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.triangles.counter_buffer().as_entire_binding(),
                },
            ],
        });
        self.bind_group = Some((generation, bind_group));
    }

    /// Reset the counter and record the triangulation pass.
    ///
    /// Uses the same workgroup grid as the density pass.
    pub fn extract(&self, encoder: &mut wgpu::CommandEncoder, workgroups: u32) {
        let Some((_, bind_group)) = &self.bind_group else {
            return;
        };

        self.triangles.reset(encoder);

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("extract_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(workgroups, workgroups, workgroups);
        log::debug!("Extraction dispatch {0}x{0}x{0} workgroups", workgroups);
    }

    pub fn triangles(&self) -> &TriangleBuffer {
        &self.triangles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_size() {
        assert_eq!(std::mem::size_of::<ExtractParams>(), 16);
    }
}
