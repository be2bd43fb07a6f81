//! Indirect surface render pipeline

use bytemuck::{Pod, Zeroable};

use super::kernels::{buffer_entry, shader_module};
use crate::core::camera::Camera;
use crate::generator::config::RenderFlags;
use crate::render::buffer::{CameraBuffer, IndirectBuffer, TriangleBuffer};

/// Depth format used by the surface pass
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Render parameters (must match `RenderParams` in surface.wgsl)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct RenderParams {
    pub scale: f32,
    pub show_normals: u32,
    pub wireframe: u32,
    pub _pad: u32,
}

impl RenderParams {
    pub fn new(scale: f32, flags: RenderFlags) -> Self {
        Self {
            scale,
            show_normals: flags.show_normals as u32,
            wireframe: flags.wireframe as u32,
            _pad: 0,
        }
    }
}

/// Draws the triangle buffer with an indirect, non-indexed draw
pub struct SurfaceRenderer {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    camera: CameraBuffer,
    params_buffer: wgpu::Buffer,
}

impl SurfaceRenderer {
    pub fn new(
        device: &wgpu::Device,
        source: &str,
        color_format: wgpu::TextureFormat,
        triangles: &TriangleBuffer,
    ) -> Self {
        let shader = shader_module(device, "surface_shader", source);
        let camera = CameraBuffer::new(device);

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("surface_params"),
            size: std::mem::size_of::<RenderParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let visible = wgpu::ShaderStages::VERTEX_FRAGMENT;
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("surface_layout"),
            entries: &[
                buffer_entry(0, visible, wgpu::BufferBindingType::Uniform),
                buffer_entry(1, visible, wgpu::BufferBindingType::Uniform),
                buffer_entry(
                    2,
                    wgpu::ShaderStages::VERTEX,
                    wgpu::BufferBindingType::Storage { read_only: true },
                ),
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("surface_bg"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: triangles.vertex_buffer().as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("surface_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("surface_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[], // Vertices are pulled from storage
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        log::info!("Surface pipeline created ({:?})", color_format);

        Self {
            pipeline,
            bind_group,
            camera,
            params_buffer,
        }
    }

    /// Upload camera, scale and render-mode flags for the next draw
    pub fn update(&self, queue: &wgpu::Queue, camera: &Camera, scale: f32, flags: RenderFlags) {
        self.camera.update(queue, camera);
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&RenderParams::new(scale, flags)));
    }

    /// Draw command reading its vertex count from `indirect`
    pub fn draw_command<'a>(&'a self, indirect: &'a IndirectBuffer) -> DrawCommand<'a> {
        DrawCommand {
            pipeline: &self.pipeline,
            bind_group: &self.bind_group,
            indirect: indirect.buffer(),
        }
    }
}

/// Everything needed to record the surface draw into a caller-owned pass
#[derive(Clone, Copy)]
pub struct DrawCommand<'a> {
    pipeline: &'a wgpu::RenderPipeline,
    bind_group: &'a wgpu::BindGroup,
    indirect: &'a wgpu::Buffer,
}

impl DrawCommand<'_> {
    /// Record the draw. The pass needs a [`DEPTH_FORMAT`] depth attachment.
    pub fn encode(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(self.pipeline);
        pass.set_bind_group(0, self.bind_group, &[]);
        pass.draw_indirect(self.indirect, 0);
    }

    /// Clear `target` and `depth`, then draw
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        clear: wgpu::Color,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("surface_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        self.encode(&mut pass);
    }
}

/// Depth target for the surface pass
pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("surface_depth"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
