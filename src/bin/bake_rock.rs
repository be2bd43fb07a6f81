//! Generate one rock headlessly and bake it to disk
//!
//! Usage: cargo run --release --bin bake_rock -- [--config <path>] [--out <dir>] [--seed <n>] [--uv]

use std::path::{Path, PathBuf};

use rockforge::bake::{DirectoryAssetStore, MeshBaker, UuidIds};
use rockforge::core::{camera::Camera, logging};
use rockforge::generator::{RockConfig, RockGenerator};
use rockforge::render::context::GpuContext;
use rockforge::render::pipeline::KernelSources;

fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let arg = |name: &str| {
        args.iter()
            .position(|a| a == name)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };

    let mut config = match arg("--config") {
        Some(path) => RockConfig::load(Path::new(&path)).expect("Failed to load config"),
        None => RockConfig::default(),
    };
    if let Some(seed) = arg("--seed") {
        config.field.seed = seed.parse().expect("--seed must be a number");
    }
    if args.iter().any(|a| a == "--uv") {
        config.bake.per_triangle_uv = true;
    }
    let config = config.clamped();
    let out_dir = arg("--out").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("baked"));

    let gpu = pollster::block_on(GpuContext::headless()).expect("Failed to create GPU context");
    let mut generator = RockGenerator::new(&gpu.device, &gpu.queue, gpu.format(), KernelSources::default());

    let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("bake_frame"),
    });
    generator
        .tick(&mut encoder, &config, &Camera::default())
        .expect("Failed to record frame");
    gpu.queue.submit([encoder.finish()]);

    let mut store = DirectoryAssetStore::open(&out_dir).expect("Failed to open output directory");
    let mut baker = MeshBaker::new(Box::new(UuidIds), config.bake.clone());
    let asset = generator
        .bake(&mut baker, &mut store)
        .expect("Bake failed")
        .expect("No frame was recorded");

    println!(
        "Baked {}: {} vertices, {} triangles -> {}",
        asset.id,
        asset.mesh.vertex_count(),
        asset.mesh.triangle_count(),
        store.root().display()
    );
}
