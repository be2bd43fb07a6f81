//! Indirect draw-argument buffer

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::triangle_buffer::VERTICES_PER_TRIANGLE;

/// Arguments of a non-indexed indirect draw (layout fixed by the graphics API)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct IndirectDrawArgs {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

impl IndirectDrawArgs {
    /// Record every frame starts from: no vertices, one instance
    pub const EMPTY: Self = Self {
        vertex_count: 0,
        instance_count: 1,
        first_vertex: 0,
        first_instance: 0,
    };

    pub fn triangle_count(&self) -> u32 {
        self.vertex_count / VERTICES_PER_TRIANGLE
    }
}

impl Default for IndirectDrawArgs {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// GPU buffer holding one [`IndirectDrawArgs`] record
pub struct IndirectBuffer {
    buffer: wgpu::Buffer,
}

impl IndirectBuffer {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("indirect_draw_args"),
            contents: bytemuck::bytes_of(&IndirectDrawArgs::EMPTY),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::INDIRECT
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
        });
        Self { buffer }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}
