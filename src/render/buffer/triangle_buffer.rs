//! Append-only triangle buffer with a separate live counter.
//!
//! The triangulation kernel reserves a triangle slot with `atomicAdd` on the
//! counter and writes three vertices at `slot * 3`. The backing store has a
//! fixed capacity; its logical length is only known once the counter is
//! read, so nothing here ever assumes allocated size equals live length.

use bytemuck::{Pod, Zeroable};

/// Vertices emitted per triangle. No index buffer is used.
pub const VERTICES_PER_TRIANGLE: u32 = 3;

/// One emitted surface vertex (must match `SurfaceVertex` in the shaders).
/// WGSL vec3 has 16-byte alignment, so each field carries a padding float.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SurfaceVertex {
    /// Position in unit-cube space, centered on the origin
    pub position: [f32; 3],
    pub _pad0: f32,
    /// Outward unit normal
    pub normal: [f32; 3],
    pub _pad1: f32,
    /// Linear RGB
    pub color: [f32; 3],
    pub _pad2: f32,
}

impl SurfaceVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            position,
            _pad0: 0.0,
            normal,
            _pad1: 0.0,
            color,
            _pad2: 0.0,
        }
    }
}

/// Size of one vertex record in bytes
pub const VERTEX_STRIDE: u64 = std::mem::size_of::<SurfaceVertex>() as u64;

/// Largest vertex count a single storage binding on `device` can hold
pub fn device_vertex_capacity(device: &wgpu::Device) -> u32 {
    let limits = device.limits();
    let bytes = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
    (bytes / VERTEX_STRIDE).min(u32::MAX as u64) as u32
}

/// Round a requested vertex capacity down to whole triangles and to what
/// the device can bind.
pub fn effective_capacity(requested: u32, device_limit: u32) -> u32 {
    let capped = requested.min(device_limit);
    let capped = capped - capped % VERTICES_PER_TRIANGLE;
    capped.max(VERTICES_PER_TRIANGLE)
}

/// Fixed-capacity vertex arena plus its triangle counter
pub struct TriangleBuffer {
    vertex_buffer: wgpu::Buffer,
    counter_buffer: wgpu::Buffer,
    max_vertices: u32,
}

impl TriangleBuffer {
    /// Allocate room for `max_vertex_count` vertices (rounded to whole triangles)
    pub fn new(device: &wgpu::Device, max_vertex_count: u32) -> Self {
        let device_limit = device_vertex_capacity(device);
        let max_vertices = effective_capacity(max_vertex_count, device_limit);
        if max_vertices != max_vertex_count {
            log::warn!(
                "Triangle buffer capacity {} adjusted to {} (device limit {})",
                max_vertex_count, max_vertices, device_limit
            );
        }

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("triangle_buffer"),
            size: max_vertices as u64 * VERTEX_STRIDE,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        // Counter buffer (single u32, counts triangles)
        let counter_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("triangle_counter"),
            size: std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        log::info!(
            "Triangle buffer: {} vertices ({}MB)",
            max_vertices,
            max_vertices as u64 * VERTEX_STRIDE / 1024 / 1024
        );

        Self {
            vertex_buffer,
            counter_buffer,
            max_vertices,
        }
    }

    /// Record a counter reset; must precede every extraction dispatch
    pub fn reset(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.clear_buffer(&self.counter_buffer, 0, None);
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub fn counter_buffer(&self) -> &wgpu::Buffer {
        &self.counter_buffer
    }

    pub fn max_vertices(&self) -> u32 {
        self.max_vertices
    }

    pub fn max_triangles(&self) -> u32 {
        self.max_vertices / VERTICES_PER_TRIANGLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        // Three vec3 + pad pairs, matching the WGSL struct
        assert_eq!(std::mem::size_of::<SurfaceVertex>(), 48);
        assert_eq!(VERTEX_STRIDE, 48);
    }

    #[test]
    fn test_vertex_fields_at_shader_offsets() {
        let v = SurfaceVertex::new([1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&v));
        assert_eq!(&floats[0..3], &[1.0, 2.0, 3.0]);
        assert_eq!(&floats[4..7], &[4.0, 5.0, 6.0]);
        assert_eq!(&floats[8..11], &[7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_effective_capacity_whole_triangles() {
        assert_eq!(effective_capacity(10, u32::MAX), 9);
        assert_eq!(effective_capacity(1_000_000, 600), 600);
        assert_eq!(effective_capacity(1_000_000, 601), 600);
        // Never below one triangle
        assert_eq!(effective_capacity(0, u32::MAX), 3);
    }
}
