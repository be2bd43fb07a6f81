//! Material and display-entity records written next to a baked mesh

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Surface material binding one fixed texture
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub name: String,
    pub shader: String,
    pub surface_texture: PathBuf,
}

/// Placeable entity referencing a mesh and a material by id
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayEntity {
    pub name: String,
    pub mesh: String,
    pub material: String,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl DisplayEntity {
    /// Entity at the origin with identity transform
    pub fn new(name: impl Into<String>, mesh: impl Into<String>, material: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mesh: mesh.into(),
            material: material.into(),
            position: [0.0; 3],
            rotation: glam::Quat::IDENTITY.to_array(),
            scale: [1.0; 3],
        }
    }
}
