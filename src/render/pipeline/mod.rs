//! Compute and render pipelines

pub mod density;
pub mod extract;
pub mod indirect;
pub mod kernels;
pub mod surface;

pub use density::{DensityParams, DensityPipeline};
pub use extract::{ExtractParams, SurfaceExtractor};
pub use indirect::IndirectArgsPipeline;
pub use kernels::KernelSources;
pub use surface::{create_depth_texture, DrawCommand, RenderParams, SurfaceRenderer, DEPTH_FORMAT};
