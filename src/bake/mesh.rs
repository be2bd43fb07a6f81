//! Host-side mesh built from a triangle-buffer snapshot.
//!
//! Vertices are never shared: triangle `i` owns vertices `3i..3i+3` and the
//! index list is the identity sequence.

use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::render::buffer::{SurfaceVertex, VERTICES_PER_TRIANGLE};

/// Axis-aligned bounds of the mesh positions
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Bounds {
    pub const EMPTY: Self = Self {
        min: [0.0; 3],
        max: [0.0; 3],
    };

    pub fn from_points(points: &[[f32; 3]]) -> Self {
        let Some(first) = points.first() else {
            return Self::EMPTY;
        };
        let (min, max) = points.iter().fold(
            (Vec3::from(*first), Vec3::from(*first)),
            |(min, max), p| (min.min(Vec3::from(*p)), max.max(Vec3::from(*p))),
        );
        Self {
            min: min.to_array(),
            max: max.to_array(),
        }
    }
}

/// Flat, identity-indexed triangle mesh
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BakedMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// RGBA, alpha always 1
    pub colors: Vec<[f32; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uvs: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
    pub bounds: Bounds,
}

impl BakedMesh {
    /// Expand a vertex stream into parallel arrays, scaling positions by `scale`.
    ///
    /// A trailing partial triangle is dropped.
    pub fn from_vertices(name: impl Into<String>, vertices: &[SurfaceVertex], scale: f32, per_triangle_uv: bool) -> Self {
        let whole = vertices.len() - vertices.len() % VERTICES_PER_TRIANGLE as usize;
        if whole != vertices.len() {
            log::warn!("Dropping {} vertices of a partial triangle", vertices.len() - whole);
        }
        let vertices = &vertices[..whole];

        let positions: Vec<[f32; 3]> = vertices
            .iter()
            .map(|v| (Vec3::from(v.position) * scale).to_array())
            .collect();
        let normals = vertices.iter().map(|v| v.normal).collect();
        let colors = vertices
            .iter()
            .map(|v| [v.color[0], v.color[1], v.color[2], 1.0])
            .collect();
        let uvs = per_triangle_uv.then(|| project_uvs(&positions, scale));
        let indices = (0..whole as u32).collect();
        let bounds = Bounds::from_points(&positions);

        Self {
            name: name.into(),
            positions,
            normals,
            colors,
            uvs,
            indices,
            bounds,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / VERTICES_PER_TRIANGLE as usize
    }
}

/// Axis a triangle is projected along
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectionAxis {
    X,
    Y,
    Z,
}

impl ProjectionAxis {
    /// Largest component of `|normal|`; ties resolve to X, then Y
    pub fn dominant(normal: Vec3) -> Self {
        let n = normal.abs();
        if n.x >= n.y && n.x >= n.z {
            Self::X
        } else if n.y >= n.z {
            Self::Y
        } else {
            Self::Z
        }
    }

    /// The two coordinates left after dropping this axis
    pub fn project(self, p: Vec3) -> [f32; 2] {
        match self {
            Self::X => [p.y, p.z],
            Self::Y => [p.x, p.z],
            Self::Z => [p.x, p.y],
        }
    }
}

/// Cube-project one triangle. Positions are in display scale; UVs land in
/// `[0, 1]` for points inside the unit cube.
pub fn project_triangle(triangle: [Vec3; 3], scale: f32) -> [[f32; 2]; 3] {
    let [a, b, c] = triangle;
    let axis = ProjectionAxis::dominant((b - a).cross(c - a));
    triangle.map(|p| axis.project(p / scale + Vec3::splat(0.5)))
}

/// Per-vertex UVs for a flat triangle stream
pub fn project_uvs(positions: &[[f32; 3]], scale: f32) -> Vec<[f32; 2]> {
    positions
        .par_chunks_exact(VERTICES_PER_TRIANGLE as usize)
        .flat_map_iter(|tri| {
            project_triangle([Vec3::from(tri[0]), Vec3::from(tri[1]), Vec3::from(tri[2])], scale)
        })
        .collect()
}
