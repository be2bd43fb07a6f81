//! Device-side derivation of indirect draw arguments from the triangle counter

use bytemuck::{Pod, Zeroable};

use super::kernels::{buffer_entry, compute_pipeline, shader_module};
use crate::render::buffer::{IndirectBuffer, TriangleBuffer};

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct CapacityUniform {
    max_triangles: u32,
    _pad: [u32; 3],
}

/// Writes `{min(count, capacity) * 3, 1, 0, 0}` into the indirect buffer
/// without a host round trip
pub struct IndirectArgsPipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    indirect: IndirectBuffer,
}

impl IndirectArgsPipeline {
    /// Bound to `triangles` for its whole lifetime
    pub fn new(device: &wgpu::Device, source: &str, triangles: &TriangleBuffer) -> Self {
        use wgpu::util::DeviceExt;

        let shader = shader_module(device, "indirect_args_shader", source);
        let indirect = IndirectBuffer::new(device);

        let capacity = CapacityUniform {
            max_triangles: triangles.max_triangles(),
            _pad: [0; 3],
        };
        let capacity_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("indirect_args_capacity"),
            contents: bytemuck::bytes_of(&capacity),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("indirect_args_layout"),
            entries: &[
                buffer_entry(
                    0,
                    wgpu::ShaderStages::COMPUTE,
                    wgpu::BufferBindingType::Storage { read_only: true },
                ),
                buffer_entry(
                    1,
                    wgpu::ShaderStages::COMPUTE,
                    wgpu::BufferBindingType::Storage { read_only: false },
                ),
                buffer_entry(2, wgpu::ShaderStages::COMPUTE, wgpu::BufferBindingType::Uniform),
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("indirect_args_bg"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: triangles.counter_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: indirect.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: capacity_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline = compute_pipeline(device, "indirect_args_pipeline", &bind_group_layout, &shader);

        Self {
            pipeline,
            bind_group,
            indirect,
        }
    }

    /// Record the single-invocation finalisation pass; must follow extraction
    pub fn dispatch(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("indirect_args_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(1, 1, 1);
    }

    pub fn indirect(&self) -> &IndirectBuffer {
        &self.indirect
    }
}
