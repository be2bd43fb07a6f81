//! GPU buffer management

pub mod camera_buffer;
pub mod indirect_buffer;
pub mod triangle_buffer;

pub use camera_buffer::{CameraBuffer, CameraUniform};
pub use indirect_buffer::{IndirectBuffer, IndirectDrawArgs};
pub use triangle_buffer::{SurfaceVertex, TriangleBuffer, VERTEX_STRIDE, VERTICES_PER_TRIANGLE};
