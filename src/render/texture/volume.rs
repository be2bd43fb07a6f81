//! Density volume texture and resolution tracking.
//!
//! The field is a cubic `R32Float` 3D texture written by the density kernel
//! and read by the triangulation kernel. [`VolumeField::ensure`] is the
//! resolution watcher: it reallocates only when the requested edge length
//! differs from the live allocation, releasing the old texture first so at
//! most one volume exists at any time.

use crate::generator::config::WORKGROUP_SIZE;

/// Texel format of the density field
pub const VOLUME_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;

/// Creates and destroys volume storage
pub trait VolumeAllocator {
    type Volume;

    fn allocate(&mut self, resolution: u32) -> Self::Volume;
    fn release(&mut self, volume: Self::Volume);
}

/// GPU-resident density volume
pub struct GpuVolume {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    resolution: u32,
}

impl GpuVolume {
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Size of the allocation in bytes
    pub fn byte_size(&self) -> u64 {
        let r = self.resolution as u64;
        r * r * r * std::mem::size_of::<f32>() as u64
    }
}

/// Allocates volumes as random-write 3D textures on a device
pub struct GpuVolumeAllocator {
    device: wgpu::Device,
}

impl GpuVolumeAllocator {
    pub fn new(device: &wgpu::Device) -> Self {
        Self { device: device.clone() }
    }
}

impl VolumeAllocator for GpuVolumeAllocator {
    type Volume = GpuVolume;

    fn allocate(&mut self, resolution: u32) -> GpuVolume {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("density_volume"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: resolution,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: VOLUME_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("density_volume_view"),
            dimension: Some(wgpu::TextureViewDimension::D3),
            ..Default::default()
        });

        let volume = GpuVolume { texture, view, resolution };
        log::info!("Allocated {}^3 density volume ({}MB)",
            resolution, volume.byte_size() / 1024 / 1024);
        volume
    }

    fn release(&mut self, volume: GpuVolume) {
        log::debug!("Releasing {}^3 density volume", volume.resolution);
        volume.texture.destroy();
    }
}

/// Owns the single live density volume and reallocates it on resolution change
pub struct VolumeField<A: VolumeAllocator> {
    allocator: A,
    current: Option<(u32, A::Volume)>,
    /// Bumped on every allocation so bind groups know when to rebuild
    generation: u64,
}

impl<A: VolumeAllocator> VolumeField<A> {
    pub fn new(allocator: A) -> Self {
        Self {
            allocator,
            current: None,
            generation: 0,
        }
    }

    /// Make sure the live volume has `resolution` voxels per edge.
    ///
    /// Returns true when a new volume was allocated.
    pub fn ensure(&mut self, resolution: u32) -> bool {
        if matches!(self.current, Some((r, _)) if r == resolution) {
            return false;
        }

        if let Some((old_resolution, old)) = self.current.take() {
            log::info!("Resolution changed {} -> {}", old_resolution, resolution);
            self.allocator.release(old);
        }

        if resolution % WORKGROUP_SIZE != 0 {
            log::warn!(
                "Resolution {} is not a multiple of {}; edge workgroups run partially idle",
                resolution, WORKGROUP_SIZE
            );
        }

        let volume = self.allocator.allocate(resolution);
        self.current = Some((resolution, volume));
        self.generation += 1;
        true
    }

    /// Live volume, if one has been allocated
    pub fn volume(&self) -> Option<&A::Volume> {
        self.current.as_ref().map(|(_, v)| v)
    }

    /// Edge length of the live volume
    pub fn resolution(&self) -> Option<u32> {
        self.current.as_ref().map(|(r, _)| *r)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Release the live volume, if any
    pub fn release(&mut self) {
        if let Some((_, volume)) = self.current.take() {
            self.allocator.release(volume);
        }
    }
}

impl<A: VolumeAllocator> Drop for VolumeField<A> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Debug)]
    pub struct AllocationLog {
        pub allocations: Vec<u32>,
        pub releases: Vec<u32>,
        pub live: u32,
        pub max_live: u32,
    }

    /// Records allocations instead of touching a device
    pub struct CountingAllocator {
        pub log: Rc<RefCell<AllocationLog>>,
    }

    impl VolumeAllocator for CountingAllocator {
        type Volume = u32;

        fn allocate(&mut self, resolution: u32) -> u32 {
            let mut log = self.log.borrow_mut();
            log.allocations.push(resolution);
            log.live += 1;
            log.max_live = log.max_live.max(log.live);
            resolution
        }

        fn release(&mut self, volume: u32) {
            let mut log = self.log.borrow_mut();
            log.releases.push(volume);
            log.live -= 1;
        }
    }

    fn field() -> (VolumeField<CountingAllocator>, Rc<RefCell<AllocationLog>>) {
        let log = Rc::new(RefCell::new(AllocationLog::default()));
        (VolumeField::new(CountingAllocator { log: log.clone() }), log)
    }

    #[test]
    fn test_same_resolution_allocates_once() {
        let (mut field, log) = field();
        assert!(field.ensure(64));
        assert!(!field.ensure(64));
        assert!(!field.ensure(64));

        assert_eq!(log.borrow().allocations, vec![64]);
        assert!(log.borrow().releases.is_empty());
        assert_eq!(field.generation(), 1);
        assert_eq!(field.resolution(), Some(64));
    }

    #[test]
    fn test_each_change_reallocates_without_overlap() {
        let (mut field, log) = field();
        let resolutions = [32, 64, 100, 64, 8];
        for &r in &resolutions {
            assert!(field.ensure(r));
            assert_eq!(field.volume(), Some(&r));
        }
        drop(field);

        let log = log.borrow();
        assert_eq!(log.allocations, resolutions.to_vec());
        assert_eq!(log.releases, resolutions.to_vec());
        assert_eq!(log.max_live, 1);
        assert_eq!(log.live, 0);
    }

    #[test]
    fn test_release_then_ensure() {
        let (mut field, log) = field();
        field.ensure(16);
        field.release();
        assert!(field.volume().is_none());
        assert!(field.ensure(16));

        assert_eq!(log.borrow().allocations, vec![16, 16]);
        assert_eq!(log.borrow().releases, vec![16]);
        assert_eq!(field.generation(), 2);
    }
}
