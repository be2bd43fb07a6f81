//! WGSL sources for the generator kernels and the surface shader

use std::path::Path;

use crate::core::types::Result;

pub const DENSITY_FILE: &str = "density.wgsl";
pub const TRIANGULATE_FILE: &str = "triangulate.wgsl";
pub const INDIRECT_ARGS_FILE: &str = "indirect_args.wgsl";
pub const SURFACE_FILE: &str = "surface.wgsl";

/// Shader source text for every pipeline the generator builds.
///
/// The defaults are the kernels shipped in `shaders/`. Any of them can be
/// replaced with [`KernelSources::from_dir`] as long as the replacement keeps
/// the same bindings and entry points.
#[derive(Clone, Debug)]
pub struct KernelSources {
    pub density: String,
    pub triangulate: String,
    pub indirect_args: String,
    pub surface: String,
}

impl Default for KernelSources {
    fn default() -> Self {
        Self {
            density: include_str!("../../../shaders/density.wgsl").to_string(),
            triangulate: include_str!("../../../shaders/triangulate.wgsl").to_string(),
            indirect_args: include_str!("../../../shaders/indirect_args.wgsl").to_string(),
            surface: include_str!("../../../shaders/surface.wgsl").to_string(),
        }
    }
}

impl KernelSources {
    /// Built-in sources, overridden by whichever of the four files exist in `dir`
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut sources = Self::default();

        for (file, slot) in [
            (DENSITY_FILE, &mut sources.density),
            (TRIANGULATE_FILE, &mut sources.triangulate),
            (INDIRECT_ARGS_FILE, &mut sources.indirect_args),
            (SURFACE_FILE, &mut sources.surface),
        ] {
            let path = dir.join(file);
            if path.is_file() {
                *slot = std::fs::read_to_string(&path)?;
                log::info!("Using kernel override {:?}", path);
            }
        }

        Ok(sources)
    }
}

/// Compile one WGSL module
pub(crate) fn shader_module(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

/// Layout entry for a buffer binding visible to `visibility`
pub(crate) fn buffer_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    ty: wgpu::BufferBindingType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Single bind group, `main` entry point compute pipeline
pub(crate) fn compute_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    module: &wgpu::ShaderModule,
) -> wgpu::ComputePipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        immediate_size: 0,
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        module,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sources_have_entry_points() {
        let sources = KernelSources::default();
        assert!(sources.density.contains("fn main"));
        assert!(sources.triangulate.contains("fn main"));
        assert!(sources.indirect_args.contains("fn main"));
        assert!(sources.surface.contains("fn vs_main"));
        assert!(sources.surface.contains("fn fs_main"));
    }

    #[test]
    fn test_from_dir_overrides_present_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DENSITY_FILE), "// custom density").unwrap();

        let sources = KernelSources::from_dir(dir.path()).unwrap();
        assert_eq!(sources.density, "// custom density");
        assert_eq!(sources.triangulate, KernelSources::default().triangulate);
    }

    #[test]
    fn test_from_missing_dir_keeps_defaults() {
        let sources = KernelSources::from_dir("/nonexistent/rockforge/kernels").unwrap();
        assert_eq!(sources.surface, KernelSources::default().surface);
    }
}
