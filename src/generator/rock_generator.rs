//! Per-frame orchestration of the rock pipeline.
//!
//! Order within a frame: resolution watch, density, extraction, indirect
//! argument finalisation, then the caller's draw. All of it is recorded on
//! one encoder, so the queue's own ordering is the only synchronisation.
//! Nothing here reads back to the host except [`RockGenerator::read_back`]
//! and [`RockGenerator::bake`].

use super::config::{RockConfig, ISO_THRESHOLD};
use crate::bake::{AssetStore, BakedAsset, MeshBaker};
use crate::core::camera::Camera;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::render::buffer::{IndirectDrawArgs, SurfaceVertex};
use crate::render::pipeline::{
    DensityPipeline, DrawCommand, IndirectArgsPipeline, KernelSources, SurfaceExtractor,
    SurfaceRenderer,
};
use crate::render::readback::read_buffer;
use crate::render::texture::{GpuVolumeAllocator, VolumeField};

/// Host copy of the last extraction
#[derive(Clone, Debug)]
pub struct TriangleSnapshot {
    /// Indirect arguments as the last draw saw them
    pub args: IndirectDrawArgs,
    /// Triangles the kernel tried to emit, including any past capacity
    pub emitted_triangles: u32,
    pub vertices: Vec<SurfaceVertex>,
    /// Display scale of the frame the snapshot came from
    pub scale: f32,
}

impl TriangleSnapshot {
    pub fn triangle_count(&self) -> u32 {
        self.args.triangle_count()
    }

    /// True when the surface needed more room than the buffer has
    pub fn overflowed(&self) -> bool {
        self.emitted_triangles > self.triangle_count()
    }
}

/// Buffers that only exist once the first frame ran
struct SurfaceStages {
    extractor: SurfaceExtractor,
    indirect: IndirectArgsPipeline,
    renderer: SurfaceRenderer,
}

/// Procedural rock pipeline bound to one device
pub struct RockGenerator {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,
    kernels: KernelSources,
    volume: VolumeField<GpuVolumeAllocator>,
    density: DensityPipeline,
    stages: Option<SurfaceStages>,
    last_config: Option<RockConfig>,
    frame: u64,
}

impl RockGenerator {
    /// `color_format` is the format of the target the surface is drawn into
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        kernels: KernelSources,
    ) -> Self {
        let density = DensityPipeline::new(device, &kernels.density);
        Self {
            device: device.clone(),
            queue: queue.clone(),
            color_format,
            kernels,
            volume: VolumeField::new(GpuVolumeAllocator::new(device)),
            density,
            stages: None,
            last_config: None,
            frame: 0,
        }
    }

    /// Record one frame of generation into `encoder` and return the draw
    /// for the caller's render pass.
    ///
    /// The triangle buffer is created on the first call with
    /// `config.max_vertex_count`; later changes to that value are ignored.
    pub fn tick(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        config: &RockConfig,
        camera: &Camera,
    ) -> Result<DrawCommand<'_>> {
        config.validate()?;
        let field = &config.field;

        if self.stages.is_none() {
            self.stages = Some(self.create_stages(config.max_vertex_count));
        }

        self.volume.ensure(field.resolution);
        let generation = self.volume.generation();
        let volume = self
            .volume
            .volume()
            .ok_or_else(|| Error::Gpu("density volume missing after allocation".into()))?;
        let stages = self
            .stages
            .as_mut()
            .ok_or_else(|| Error::Gpu("surface stages missing after creation".into()))?;

        self.density.prepare(&self.device, &self.queue, field, volume, generation);
        stages.extractor.prepare(&self.device, &self.queue, volume, generation, ISO_THRESHOLD);
        stages.renderer.update(&self.queue, camera, field.scale, config.render);

        let workgroups = field.workgroups_per_axis();
        self.density.dispatch(encoder, workgroups);
        stages.extractor.extract(encoder, workgroups);
        stages.indirect.dispatch(encoder);

        if self.last_config.as_ref() != Some(config) {
            self.last_config = Some(config.clone());
        }
        self.frame += 1;
        log::trace!("Frame {} recorded at resolution {}", self.frame, field.resolution);

        let stages = &*stages;
        Ok(stages.renderer.draw_command(stages.indirect.indirect()))
    }

    fn create_stages(&self, max_vertex_count: u32) -> SurfaceStages {
        let extractor = SurfaceExtractor::new(&self.device, &self.kernels.triangulate, max_vertex_count);
        let indirect = IndirectArgsPipeline::new(&self.device, &self.kernels.indirect_args, extractor.triangles());
        let renderer = SurfaceRenderer::new(
            &self.device,
            &self.kernels.surface,
            self.color_format,
            extractor.triangles(),
        );
        SurfaceStages {
            extractor,
            indirect,
            renderer,
        }
    }

    /// Blocking copy of the last extraction to the host.
    ///
    /// Only meaningful after the encoder passed to the last [`tick`](Self::tick)
    /// was submitted. Returns `None` before the first frame.
    pub fn read_back(&self) -> Result<Option<TriangleSnapshot>> {
        let (Some(stages), Some(config)) = (&self.stages, &self.last_config) else {
            return Ok(None);
        };
        let triangles = stages.extractor.triangles();

        let args = read_buffer::<IndirectDrawArgs>(
            &self.device,
            &self.queue,
            stages.indirect.indirect().buffer(),
            0,
            1,
        )?
        .first()
        .copied()
        .unwrap_or_default();

        let emitted_triangles = read_buffer::<u32>(&self.device, &self.queue, triangles.counter_buffer(), 0, 1)?
            .first()
            .copied()
            .unwrap_or(0);
        if emitted_triangles > triangles.max_triangles() {
            log::warn!(
                "Surface needed {} triangles but the buffer holds {}; the bake is truncated",
                emitted_triangles,
                triangles.max_triangles()
            );
        }

        let vertex_count = args.vertex_count.min(triangles.max_vertices()) as usize;
        let vertices = read_buffer::<SurfaceVertex>(&self.device, &self.queue, triangles.vertex_buffer(), 0, vertex_count)?;

        Ok(Some(TriangleSnapshot {
            args,
            emitted_triangles,
            vertices,
            scale: config.field.scale,
        }))
    }

    /// Read the last frame back and persist it through `baker` into `store`.
    ///
    /// The baker's own [`BakeSettings`](super::config::BakeSettings) decide
    /// UVs and material; `RockConfig::bake` is not consulted here. A no-op
    /// returning `None` if no frame has run yet.
    pub fn bake(&self, baker: &mut MeshBaker, store: &mut dyn AssetStore) -> Result<Option<BakedAsset>> {
        let Some(snapshot) = self.read_back()? else {
            log::info!("Bake requested before the first frame; nothing to do");
            return Ok(None);
        };

        log::info!("Baking {} triangles", snapshot.triangle_count());
        baker.bake(&snapshot.vertices, snapshot.scale, store).map(Some)
    }

    /// Edge length of the live density volume
    pub fn resolution(&self) -> Option<u32> {
        self.volume.resolution()
    }

    /// Triangle capacity, once the buffers exist
    pub fn max_triangles(&self) -> Option<u32> {
        self.stages.as_ref().map(|s| s.extractor.triangles().max_triangles())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bake::{MemoryAssetStore, SequentialIds};
    use crate::generator::config::BakeSettings;
    use crate::render::context::GpuContext;
    use crate::render::pipeline::create_depth_texture;

    const EMPTY_DENSITY: &str = r#"
struct DensityParams {
    resolution: u32,
    steps: u32,
    smoothness: f32,
    seed: f32,
    displacement_scale: f32,
    displacement_spread: f32,
    _pad0: f32,
    _pad1: f32,
}

@group(0) @binding(0) var<uniform> params: DensityParams;
@group(0) @binding(1) var volume: texture_storage_3d<r32float, write>;

@compute @workgroup_size(8, 8, 8)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    if (any(id >= vec3<u32>(params.resolution))) {
        return;
    }
    textureStore(volume, vec3<i32>(id), vec4<f32>(0.0));
}
"#;

    fn gpu() -> GpuContext {
        pollster::block_on(GpuContext::headless()).expect("Failed to find adapter")
    }

    fn small_config(resolution: u32, seed: f32) -> RockConfig {
        let mut config = RockConfig::default();
        config.field.resolution = resolution;
        config.field.seed = seed;
        config.max_vertex_count = 600_000;
        config
    }

    fn run_frame(ctx: &GpuContext, generator: &mut RockGenerator, config: &RockConfig) -> TriangleSnapshot {
        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("test_frame"),
        });
        generator.tick(&mut encoder, config, &Camera::default()).unwrap();
        ctx.queue.submit([encoder.finish()]);
        generator.read_back().unwrap().unwrap()
    }

    fn baker() -> MeshBaker {
        MeshBaker::new(Box::new(SequentialIds::new("test")), BakeSettings::default())
    }

    #[test]
    fn test_generator_builds_every_pipeline() {
        let ctx = gpu();
        let mut generator = RockGenerator::new(&ctx.device, &ctx.queue, ctx.format(), KernelSources::default());
        assert!(generator.max_triangles().is_none());

        let snapshot = run_frame(&ctx, &mut generator, &small_config(16, 880.0));
        assert_eq!(generator.max_triangles(), Some(200_000));
        assert_eq!(snapshot.args.instance_count, 1);
    }

    #[test]
    fn test_bake_before_first_frame_is_noop() {
        let ctx = gpu();
        let generator = RockGenerator::new(&ctx.device, &ctx.queue, ctx.format(), KernelSources::default());
        let mut store = MemoryAssetStore::default();

        assert!(generator.read_back().unwrap().is_none());
        assert!(generator.bake(&mut baker(), &mut store).unwrap().is_none());
        assert!(store.assets.is_empty());
    }

    #[test]
    fn test_extraction_is_deterministic_and_whole() {
        let ctx = gpu();
        let config = small_config(32, 880.0);

        let mut first = RockGenerator::new(&ctx.device, &ctx.queue, ctx.format(), KernelSources::default());
        let mut second = RockGenerator::new(&ctx.device, &ctx.queue, ctx.format(), KernelSources::default());
        let a = run_frame(&ctx, &mut first, &config);
        let b = run_frame(&ctx, &mut second, &config);

        assert!(a.triangle_count() > 0);
        assert_eq!(a.vertices.len() % 3, 0);
        assert_eq!(a.vertices.len() as u32, a.args.vertex_count);
        assert_eq!(a.args.instance_count, 1);
        assert_eq!(a.args.vertex_count, a.emitted_triangles * 3);
        assert!(!a.overflowed());

        // Slot order depends on scheduling, so compare as sorted sets
        let key = |v: &SurfaceVertex| v.position.map(f32::to_bits);
        let mut pa: Vec<_> = a.vertices.iter().map(key).collect();
        let mut pb: Vec<_> = b.vertices.iter().map(key).collect();
        pa.sort_unstable();
        pb.sort_unstable();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_resolution_change_reallocates() {
        let ctx = gpu();
        let mut generator = RockGenerator::new(&ctx.device, &ctx.queue, ctx.format(), KernelSources::default());

        run_frame(&ctx, &mut generator, &small_config(16, 1.0));
        assert_eq!(generator.resolution(), Some(16));
        let snapshot = run_frame(&ctx, &mut generator, &small_config(24, 1.0));
        assert_eq!(generator.resolution(), Some(24));
        assert_eq!(snapshot.vertices.len() % 3, 0);
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let ctx = gpu();
        let mut generator = RockGenerator::new(&ctx.device, &ctx.queue, ctx.format(), KernelSources::default());
        let mut config = small_config(32, 3.0);
        config.max_vertex_count = 30;

        let snapshot = run_frame(&ctx, &mut generator, &config);
        assert_eq!(generator.max_triangles(), Some(10));
        assert_eq!(snapshot.args.vertex_count, 30);
        assert_eq!(snapshot.vertices.len(), 30);
        assert!(snapshot.overflowed());
    }

    #[test]
    fn test_capacity_holds_across_resolution_and_smoothness() {
        let ctx = gpu();
        let mut tight = RockGenerator::new(&ctx.device, &ctx.queue, ctx.format(), KernelSources::default());
        let mut roomy = RockGenerator::new(&ctx.device, &ctx.queue, ctx.format(), KernelSources::default());

        for resolution in [8, 20, 40, 64, 72] {
            for smoothness in [0.01, 0.1, 0.2] {
                let mut config = small_config(resolution, 5.0);
                config.field.smoothness = smoothness;
                let mut tight_config = config.clone();
                tight_config.max_vertex_count = 600;

                let clipped = run_frame(&ctx, &mut tight, &tight_config);
                let capacity = tight.max_triangles().unwrap();
                assert_eq!(capacity, 200);
                assert!(clipped.vertices.len() <= 600);
                assert_eq!(clipped.args.vertex_count, clipped.emitted_triangles.min(capacity) * 3);
                assert_eq!(clipped.overflowed(), clipped.emitted_triangles > capacity);

                let full = run_frame(&ctx, &mut roomy, &config);
                assert!(
                    !full.overflowed(),
                    "resolution {} smoothness {} emitted {} triangles",
                    resolution,
                    smoothness,
                    full.emitted_triangles
                );
                assert_eq!(full.args.vertex_count, full.emitted_triangles * 3);
                assert_eq!(full.vertices.len() as u32, full.args.vertex_count);
            }
        }
    }

    #[test]
    fn test_bake_uses_baker_settings() {
        let ctx = gpu();
        let mut generator = RockGenerator::new(&ctx.device, &ctx.queue, ctx.format(), KernelSources::default());
        let config = small_config(16, 2.0);
        assert!(!config.bake.per_triangle_uv);
        let snapshot = run_frame(&ctx, &mut generator, &config);

        let mut baker = MeshBaker::new(
            Box::new(SequentialIds::new("uv")),
            BakeSettings {
                per_triangle_uv: true,
                ..Default::default()
            },
        );
        let mut store = MemoryAssetStore::default();
        let asset = generator.bake(&mut baker, &mut store).unwrap().unwrap();

        assert!(baker.settings().per_triangle_uv);
        assert_eq!(asset.mesh.uvs.as_ref().map(Vec::len), Some(snapshot.vertices.len()));
    }

    #[test]
    fn test_empty_field_draws_and_bakes_nothing() {
        let ctx = gpu();
        let kernels = KernelSources {
            density: EMPTY_DENSITY.to_string(),
            ..KernelSources::default()
        };
        let mut generator = RockGenerator::new(&ctx.device, &ctx.queue, ctx.format(), kernels);
        let config = small_config(16, 0.0);

        let target = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test_target"),
            size: wgpu::Extent3d {
                width: 64,
                height: 64,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ctx.format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let (_depth, depth_view) = create_depth_texture(&ctx.device, 64, 64);

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("test_empty_frame"),
        });
        let draw = generator.tick(&mut encoder, &config, &Camera::default()).unwrap();
        draw.render(&mut encoder, &target_view, &depth_view, wgpu::Color::BLACK);
        ctx.queue.submit([encoder.finish()]);

        let snapshot = generator.read_back().unwrap().unwrap();
        assert_eq!(snapshot.args, IndirectDrawArgs::EMPTY);
        assert!(snapshot.vertices.is_empty());

        let mut store = MemoryAssetStore::default();
        let asset = generator.bake(&mut baker(), &mut store).unwrap().unwrap();
        assert_eq!(asset.mesh.vertex_count(), 0);
        assert_eq!(asset.mesh.triangle_count(), 0);
    }

    #[test]
    fn test_bakes_with_different_seeds_are_independent() {
        let ctx = gpu();
        let mut generator = RockGenerator::new(&ctx.device, &ctx.queue, ctx.format(), KernelSources::default());
        let mut baker = baker();
        let mut store = MemoryAssetStore::default();

        let first_snapshot = run_frame(&ctx, &mut generator, &small_config(24, 10.0));
        let first = generator.bake(&mut baker, &mut store).unwrap().unwrap();
        let second_snapshot = run_frame(&ctx, &mut generator, &small_config(24, 700.0));
        let second = generator.bake(&mut baker, &mut store).unwrap().unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.mesh.vertex_count(), first_snapshot.vertices.len());
        assert_eq!(second.mesh.vertex_count(), second_snapshot.vertices.len());
        assert_eq!(second.mesh.indices.len(), second_snapshot.vertices.len());
        assert_eq!(store.assets.len(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let ctx = gpu();
        let mut generator = RockGenerator::new(&ctx.device, &ctx.queue, ctx.format(), KernelSources::default());
        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        let config = small_config(4, 0.0);

        assert!(matches!(
            generator.tick(&mut encoder, &config, &Camera::default()),
            Err(Error::Config(_))
        ));
        assert!(generator.read_back().unwrap().is_none());
    }
}
