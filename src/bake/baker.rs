//! Bake a triangle-stream snapshot into a mesh, material and entity

use super::identity::IdGenerator;
use super::material::{DisplayEntity, MaterialRecord};
use super::mesh::BakedMesh;
use super::store::AssetStore;
use crate::core::types::Result;
use crate::generator::config::BakeSettings;
use crate::render::buffer::SurfaceVertex;

/// One bake result; shares nothing with the GPU buffers it came from
#[derive(Clone, Debug, PartialEq)]
pub struct BakedAsset {
    pub id: String,
    pub mesh: BakedMesh,
    pub material: MaterialRecord,
    pub entity: DisplayEntity,
}

/// Turns vertex snapshots into persisted assets under fresh ids
pub struct MeshBaker {
    ids: Box<dyn IdGenerator>,
    settings: BakeSettings,
}

impl MeshBaker {
    pub fn new(ids: Box<dyn IdGenerator>, settings: BakeSettings) -> Self {
        Self { ids, settings }
    }

    pub fn settings(&self) -> &BakeSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: BakeSettings) {
        self.settings = settings;
    }

    /// Build an asset from `vertices`, drawn at display `scale`
    pub fn build(&mut self, vertices: &[SurfaceVertex], scale: f32) -> BakedAsset {
        let id = self.ids.next_id();
        let mesh = BakedMesh::from_vertices(id.clone(), vertices, scale, self.settings.per_triangle_uv);
        let material = MaterialRecord {
            name: id.clone(),
            shader: self.settings.surface_shader.clone(),
            surface_texture: self.settings.surface_texture.clone(),
        };
        let entity = DisplayEntity::new(id.clone(), id.clone(), id.clone());

        BakedAsset {
            id,
            mesh,
            material,
            entity,
        }
    }

    /// Build and hand the asset to `store`
    pub fn bake(
        &mut self,
        vertices: &[SurfaceVertex],
        scale: f32,
        store: &mut dyn AssetStore,
    ) -> Result<BakedAsset> {
        let asset = self.build(vertices, scale);
        store.store(&asset)?;
        log::info!(
            "Baked {}: {} vertices, {} triangles",
            asset.id,
            asset.mesh.vertex_count(),
            asset.mesh.triangle_count()
        );
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bake::identity::SequentialIds;
    use crate::bake::store::MemoryAssetStore;

    fn triangle(offset: f32) -> Vec<SurfaceVertex> {
        [[0.0, 0.0, 0.0], [0.25, 0.0, 0.0], [0.0, 0.25, 0.0]]
            .iter()
            .map(|p| SurfaceVertex::new([p[0] + offset, p[1], p[2]], [0.0, 0.0, 1.0], [0.5; 3]))
            .collect()
    }

    fn baker(per_triangle_uv: bool) -> MeshBaker {
        MeshBaker::new(
            Box::new(SequentialIds::new("rock")),
            BakeSettings {
                per_triangle_uv,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_round_trip_counts() {
        let mut vertices = triangle(0.0);
        vertices.extend(triangle(0.1));
        vertices.extend(triangle(0.2));
        let mut store = MemoryAssetStore::default();

        let asset = baker(false).bake(&vertices, 2.5, &mut store).unwrap();
        assert_eq!(asset.mesh.vertex_count(), 9);
        assert_eq!(asset.mesh.triangle_count(), 3);
        assert_eq!(asset.mesh.indices, (0..9).collect::<Vec<u32>>());
        assert_eq!(asset.mesh.normals.len(), 9);
        assert_eq!(asset.mesh.colors.len(), 9);
        assert_eq!(store.assets.len(), 1);
    }

    #[test]
    fn test_records_share_the_id() {
        let asset = baker(false).build(&triangle(0.0), 1.0);
        assert_eq!(asset.id, "rock0000");
        assert_eq!(asset.mesh.name, asset.id);
        assert_eq!(asset.material.name, asset.id);
        assert_eq!(asset.entity.mesh, asset.id);
        assert_eq!(asset.entity.material, asset.id);
        assert_eq!(asset.material.surface_texture, BakeSettings::default().surface_texture);
    }

    #[test]
    fn test_empty_bake() {
        let mut store = MemoryAssetStore::default();
        let asset = baker(true).bake(&[], 2.5, &mut store).unwrap();
        assert_eq!(asset.mesh.vertex_count(), 0);
        assert_eq!(asset.mesh.triangle_count(), 0);
        assert_eq!(store.assets.len(), 1);
    }

    #[test]
    fn test_successive_bakes_are_independent() {
        let mut baker = baker(true);
        let mut store = MemoryAssetStore::default();

        let mut first_stream = triangle(0.0);
        first_stream.extend(triangle(0.3));
        let first = baker.bake(&first_stream, 1.0, &mut store).unwrap();
        let second = baker.bake(&triangle(0.1), 1.0, &mut store).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.mesh.vertex_count(), 6);
        assert_eq!(second.mesh.vertex_count(), 3);
        assert_eq!(second.mesh.positions[0], [0.1, 0.0, 0.0]);
        assert_eq!(second.mesh.uvs.as_ref().map(Vec::len), Some(3));
        assert_eq!(store.assets[0], first);
    }
}
