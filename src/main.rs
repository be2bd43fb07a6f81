//! Rockforge preview - live view of the procedural rock
//!
//! Usage:
//!   cargo run --release -- [--config <path>] [--out <dir>] [--kernels <dir>]
//!
//! Controls:
//!   Left drag - Orbit
//!   Wheel - Zoom
//!   N - Toggle normal shading
//!   F - Toggle wireframe
//!   U - Toggle per-triangle UVs for bakes
//!   Up/Down - Resolution +/- 8
//!   [ / ] - Seed -/+ 1
//!   E - Bake the current rock into the output directory
//!   Escape - Exit

use std::path::{Path, PathBuf};
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use rockforge::bake::{DirectoryAssetStore, MeshBaker, UuidIds};
use rockforge::core::{camera::Camera, logging, Vec3};
use rockforge::generator::config::{RESOLUTION_RANGE, SEED_RANGE};
use rockforge::generator::{BakeSettings, RockConfig, RockGenerator};
use rockforge::render::context::GpuContext;
use rockforge::render::pipeline::{create_depth_texture, KernelSources};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.08,
    g: 0.09,
    b: 0.11,
    a: 1.0,
};
const RESOLUTION_STEP: u32 = 8;
const ORBIT_SENSITIVITY: f32 = 0.005;
const DISTANCE_RANGE: (f32, f32) = (1.0, 30.0);

/// Orbit camera parameters around the origin
struct Orbit {
    yaw: f32,
    pitch: f32,
    distance: f32,
}

impl Orbit {
    fn apply(&self, camera: &mut Camera) {
        camera.orbit(Vec3::ZERO, self.yaw, self.pitch, self.distance);
    }
}

/// Everything that needs a device
struct ViewerState {
    generator: RockGenerator,
    baker: MeshBaker,
    store: Option<DirectoryAssetStore>,
    camera: Camera,
    orbit: Orbit,
    depth: (wgpu::Texture, wgpu::TextureView),
    dragging: bool,
    bake_requested: bool,
}

impl ViewerState {
    fn new(gpu: &GpuContext, config: &RockConfig, kernels: KernelSources, width: u32, height: u32) -> Self {
        let generator = RockGenerator::new(&gpu.device, &gpu.queue, gpu.format(), kernels);
        let baker = MeshBaker::new(Box::new(UuidIds), config.bake.clone());

        let orbit = Orbit {
            yaw: 0.6,
            pitch: 0.35,
            distance: config.field.scale * 2.0,
        };
        let mut camera = Camera::new(Vec3::ZERO, 45.0, width as f32 / height.max(1) as f32);
        orbit.apply(&mut camera);

        Self {
            generator,
            baker,
            store: None,
            camera,
            orbit,
            depth: create_depth_texture(&gpu.device, width, height),
            dragging: false,
            bake_requested: false,
        }
    }

    fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth = create_depth_texture(device, width, height);
        self.camera.set_aspect(width as f32, height as f32);
    }

    /// Bake with the current UV and material settings from `config`
    fn bake(&mut self, out_dir: &Path, config: &BakeSettings) {
        if self.store.is_none() {
            match DirectoryAssetStore::open(out_dir) {
                Ok(store) => self.store = Some(store),
                Err(e) => {
                    log::error!("Cannot open asset store {:?}: {}", out_dir, e);
                    return;
                }
            }
        }
        let Some(store) = self.store.as_mut() else { return };
        if self.baker.settings() != config {
            self.baker.set_settings(config.clone());
        }

        match self.generator.bake(&mut self.baker, &mut *store) {
            Ok(Some(asset)) => log::info!(
                "Exported {} ({} triangles) to {:?}",
                asset.id,
                asset.mesh.triangle_count(),
                store.root()
            ),
            Ok(None) => log::info!("Nothing to export yet"),
            Err(e) => log::error!("Export failed: {}", e),
        }
    }
}

struct App {
    config: RockConfig,
    kernels: KernelSources,
    out_dir: PathBuf,
    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    state: Option<ViewerState>,
    width: u32,
    height: u32,
}

impl App {
    fn new(config: RockConfig, kernels: KernelSources, out_dir: PathBuf) -> Self {
        Self {
            config,
            kernels,
            out_dir,
            window: None,
            gpu: None,
            state: None,
            width: 1280,
            height: 720,
        }
    }

    fn update_title(&self) {
        if let Some(ref window) = self.window {
            let field = &self.config.field;
            window.set_title(&format!(
                "Rockforge - resolution {} seed {} {}{}{}",
                field.resolution,
                field.seed,
                if self.config.render.show_normals { "[normals]" } else { "" },
                if self.config.render.wireframe { "[wire]" } else { "" },
                if self.config.bake.per_triangle_uv { "[uv]" } else { "" },
            ));
        }
    }

    fn handle_key(&mut self, key: KeyCode, event_loop: &ActiveEventLoop) {
        let field = &mut self.config.field;
        match key {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::KeyN => self.config.render.show_normals = !self.config.render.show_normals,
            KeyCode::KeyF => self.config.render.wireframe = !self.config.render.wireframe,
            KeyCode::KeyU => {
                self.config.bake.per_triangle_uv = !self.config.bake.per_triangle_uv;
            }
            KeyCode::ArrowUp => {
                field.resolution = (field.resolution + RESOLUTION_STEP).min(*RESOLUTION_RANGE.end());
            }
            KeyCode::ArrowDown => {
                field.resolution = field
                    .resolution
                    .saturating_sub(RESOLUTION_STEP)
                    .max(*RESOLUTION_RANGE.start());
            }
            KeyCode::BracketLeft => field.seed = (field.seed - 1.0).max(*SEED_RANGE.start()),
            KeyCode::BracketRight => field.seed = (field.seed + 1.0).min(*SEED_RANGE.end()),
            KeyCode::KeyE => {
                if let Some(ref mut state) = self.state {
                    state.bake_requested = true;
                }
            }
            _ => return,
        }
        self.update_title();
    }

    fn render_frame(&mut self) {
        let Some(ref mut gpu) = self.gpu else { return };
        let Some(ref mut state) = self.state else { return };

        let frame = match gpu.get_current_texture() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Surface unavailable, reconfiguring: {}", e);
                gpu.resize(self.width, self.height);
                return;
            }
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });
        match state.generator.tick(&mut encoder, &self.config, &state.camera) {
            Ok(draw) => draw.render(&mut encoder, &view, &state.depth.1, CLEAR_COLOR),
            Err(e) => log::error!("Frame skipped: {}", e),
        }
        gpu.queue.submit([encoder.finish()]);
        frame.present();

        if state.bake_requested {
            state.bake_requested = false;
            state.bake(&self.out_dir, &self.config.bake);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let window = event_loop.create_window(Window::default_attributes()
            .with_title("Rockforge")
            .with_inner_size(PhysicalSize::new(self.width, self.height)))
            .expect("Failed to create window");
        let window = Arc::new(window);
        self.window = Some(window.clone());

        let gpu = pollster::block_on(GpuContext::new(window))
            .expect("Failed to create GPU context");
        let state = ViewerState::new(&gpu, &self.config, self.kernels.clone(), self.width, self.height);
        self.gpu = Some(gpu);
        self.state = Some(state);
        self.update_title();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.width = size.width.max(1);
                self.height = size.height.max(1);
                if let (Some(gpu), Some(state)) = (self.gpu.as_mut(), self.state.as_mut()) {
                    gpu.resize(self.width, self.height);
                    state.resize(&gpu.device, self.width, self.height);
                }
            }
            WindowEvent::MouseInput { state: button_state, button: MouseButton::Left, .. } => {
                if let Some(ref mut state) = self.state {
                    state.dragging = button_state == ElementState::Pressed;
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 40.0,
                };
                if let Some(ref mut state) = self.state {
                    state.orbit.distance = (state.orbit.distance * (1.0 - lines * 0.1))
                        .clamp(DISTANCE_RANGE.0, DISTANCE_RANGE.1);
                    state.orbit.apply(&mut state.camera);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed() && !event.repeat {
                    if let PhysicalKey::Code(key) = event.physical_key {
                        self.handle_key(key, event_loop);
                    }
                }
            }
            WindowEvent::RedrawRequested => self.render_frame(),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        let Some(ref mut state) = self.state else { return };
        if let DeviceEvent::MouseMotion { delta } = event {
            if state.dragging {
                state.orbit.yaw -= delta.0 as f32 * ORBIT_SENSITIVITY;
                state.orbit.pitch = (state.orbit.pitch + delta.1 as f32 * ORBIT_SENSITIVITY).clamp(-1.5, 1.5);
                state.orbit.apply(&mut state.camera);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    logging::init();
    log::info!("Rockforge starting...");

    let args: Vec<String> = std::env::args().collect();
    let arg = |name: &str| {
        args.iter()
            .position(|a| a == name)
            .and_then(|i| args.get(i + 1))
            .map(PathBuf::from)
    };

    let config = match arg("--config") {
        Some(path) => RockConfig::load(&path)
            .map(|c| c.clamped())
            .unwrap_or_else(|e| {
                log::error!("Failed to load {:?}: {}; using defaults", path, e);
                RockConfig::default()
            }),
        None => RockConfig::default(),
    };
    let kernels = match arg("--kernels") {
        Some(dir) => KernelSources::from_dir(&dir).expect("Failed to read kernel directory"),
        None => KernelSources::default(),
    };
    let out_dir = arg("--out").unwrap_or_else(|| PathBuf::from("baked"));

    let event_loop = EventLoop::new().expect("Failed to create event loop");
    let mut app = App::new(config, kernels, out_dir);

    event_loop.run_app(&mut app).expect("Event loop error");
}
