//! GPU textures

pub mod volume;

pub use volume::{GpuVolume, GpuVolumeAllocator, VolumeAllocator, VolumeField, VOLUME_FORMAT};
