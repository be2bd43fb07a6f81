//! Rendering system and GPU interfaces

pub mod buffer;
pub mod context;
pub mod pipeline;
pub mod readback;
pub mod texture;
