//! Rock generator configuration.
//!
//! Everything the operator can tweak between frames lives here. Ranges
//! match the inspector sliders of the preview tool; values outside them
//! are rejected by [`RockConfig::validate`] or pulled back in by
//! [`RockConfig::clamped`].

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;

/// Threads per workgroup along each axis of the field kernels
pub const WORKGROUP_SIZE: u32 = 8;

/// Iso-surface threshold handed to the triangulation kernel
pub const ISO_THRESHOLD: f32 = 0.5;

pub const RESOLUTION_RANGE: RangeInclusive<u32> = 8..=512;
pub const SCALE_RANGE: RangeInclusive<f32> = 0.1..=5.0;
pub const STEPS_RANGE: RangeInclusive<u32> = 8..=72;
pub const SMOOTHNESS_RANGE: RangeInclusive<f32> = 0.01..=0.2;
pub const SEED_RANGE: RangeInclusive<f32> = 0.0..=1000.0;
pub const DISPLACEMENT_SCALE_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const DISPLACEMENT_SPREAD_RANGE: RangeInclusive<f32> = 1.0..=10.0;

/// Default triangle-buffer capacity in vertices (48 bytes each, ~480MB).
/// A smooth rock at resolution 512 emits about 8M vertices. Devices that
/// cannot bind this much get the largest buffer they can.
pub const DEFAULT_MAX_VERTEX_COUNT: u32 = 10 * 1024 * 1024;

/// Parameters of the density field and its display scale
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldParameters {
    /// Edge length of the cubic field in voxels
    pub resolution: u32,
    /// Display scale applied to the unit-cube surface
    pub scale: f32,
    /// Number of cutting planes that shape the rock
    pub steps: u32,
    /// Blend radius between neighbouring cuts
    pub smoothness: f32,
    pub seed: f32,
    /// Amplitude of the noise displacement
    pub displacement_scale: f32,
    /// Frequency of the noise displacement
    pub displacement_spread: f32,
}

impl Default for FieldParameters {
    fn default() -> Self {
        Self {
            resolution: 100,
            scale: 2.5,
            steps: 20,
            smoothness: 0.05,
            seed: 880.0,
            displacement_scale: 0.15,
            displacement_spread: 10.0,
        }
    }
}

impl FieldParameters {
    /// Workgroups per axis needed to cover `resolution` voxels
    pub fn workgroups_per_axis(&self) -> u32 {
        self.resolution.div_ceil(WORKGROUP_SIZE)
    }
}

/// Render-mode switches for the live preview
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderFlags {
    pub show_normals: bool,
    pub wireframe: bool,
}

impl Default for RenderFlags {
    fn default() -> Self {
        Self {
            show_normals: true,
            wireframe: false,
        }
    }
}

/// Settings used when baking the surface into assets
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeSettings {
    /// Project cube UVs per triangle
    pub per_triangle_uv: bool,
    /// Shader name recorded on the baked material
    pub surface_shader: String,
    /// Texture bound to the baked material
    pub surface_texture: PathBuf,
}

impl Default for BakeSettings {
    fn default() -> Self {
        Self {
            per_triangle_uv: false,
            surface_shader: "rockforge/surface".to_string(),
            surface_texture: PathBuf::from("textures/rock_surface.png"),
        }
    }
}

/// Full generator configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RockConfig {
    pub field: FieldParameters,
    pub render: RenderFlags,
    pub bake: BakeSettings,
    /// Triangle-buffer capacity in vertices. Only read at pipeline creation.
    pub max_vertex_count: u32,
}

impl Default for RockConfig {
    fn default() -> Self {
        Self {
            field: FieldParameters::default(),
            render: RenderFlags::default(),
            bake: BakeSettings::default(),
            max_vertex_count: DEFAULT_MAX_VERTEX_COUNT,
        }
    }
}

fn check<T: PartialOrd + std::fmt::Display + Copy>(
    name: &str,
    value: T,
    range: &RangeInclusive<T>,
) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} = {} is outside {}..={}",
            name, value, range.start(), range.end()
        )))
    }
}

fn clamp_logged<T: PartialOrd + std::fmt::Display + Copy>(
    name: &str,
    value: T,
    range: &RangeInclusive<T>,
) -> T {
    let clamped = if value < *range.start() {
        *range.start()
    } else if value > *range.end() {
        *range.end()
    } else {
        return value;
    };
    log::warn!("{} = {} clamped to {}", name, value, clamped);
    clamped
}

impl RockConfig {
    /// Check every parameter against its range
    pub fn validate(&self) -> Result<()> {
        let f = &self.field;
        check("resolution", f.resolution, &RESOLUTION_RANGE)?;
        check("scale", f.scale, &SCALE_RANGE)?;
        check("steps", f.steps, &STEPS_RANGE)?;
        check("smoothness", f.smoothness, &SMOOTHNESS_RANGE)?;
        check("seed", f.seed, &SEED_RANGE)?;
        check("displacement_scale", f.displacement_scale, &DISPLACEMENT_SCALE_RANGE)?;
        check("displacement_spread", f.displacement_spread, &DISPLACEMENT_SPREAD_RANGE)?;
        if self.max_vertex_count < 3 {
            return Err(Error::Config("max_vertex_count must hold at least one triangle".into()));
        }
        Ok(())
    }

    /// Copy of this config with every parameter forced into range
    pub fn clamped(&self) -> Self {
        let f = &self.field;
        Self {
            field: FieldParameters {
                resolution: clamp_logged("resolution", f.resolution, &RESOLUTION_RANGE),
                scale: clamp_logged("scale", f.scale, &SCALE_RANGE),
                steps: clamp_logged("steps", f.steps, &STEPS_RANGE),
                smoothness: clamp_logged("smoothness", f.smoothness, &SMOOTHNESS_RANGE),
                seed: clamp_logged("seed", f.seed, &SEED_RANGE),
                displacement_scale: clamp_logged(
                    "displacement_scale",
                    f.displacement_scale,
                    &DISPLACEMENT_SCALE_RANGE,
                ),
                displacement_spread: clamp_logged(
                    "displacement_spread",
                    f.displacement_spread,
                    &DISPLACEMENT_SPREAD_RANGE,
                ),
            },
            render: self.render,
            bake: self.bake.clone(),
            max_vertex_count: self.max_vertex_count.max(3),
        }
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}
